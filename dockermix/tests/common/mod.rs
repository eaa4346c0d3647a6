#![allow(dead_code)]

use anyhow::{anyhow, Result};
use log::{Level, Log, Metadata, Record};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use dockermix::{
    models::{BuildTag, ContainerId, ImageId},
    services::{ContainerEngine, CreateContainer},
    Environment, Journal, MixConfig,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Build(String),
    Tag(String, String),
    Create(CreateContainer),
    Start(String),
    Stop(String),
    RemoveContainer(String),
    RemoveImage(String),
    Port(String, u16),
}

type FailurePredicate = Box<dyn Fn(&Call) -> bool + Send>;

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    failures: Vec<FailurePredicate>,
    images: HashSet<String>,
    next_image: usize,
    next_container: usize,
    port_offset: u32,
}

/// Records every call and hands out predictable ids: `sha256:image-<n>` for
/// builds and `container-<n>` for creates. Like a real engine it only knows
/// the images it built or tagged, and removing any other reference reports
/// that nothing was there.
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Arc<FakeEngine> {
        Arc::new(FakeEngine {
            state: Mutex::new(FakeState {
                port_offset: 30000,
                ..Default::default()
            }),
        })
    }

    /// Calls matching `predicate` fail (after being recorded).
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&Call) -> bool + Send + 'static,
    {
        self.state.lock().unwrap().failures.push(Box::new(predicate));
    }

    /// Makes `reference` known, as if it had been built by an earlier run.
    pub fn add_image(&self, reference: &str) {
        self.state.lock().unwrap().images.insert(reference.to_owned());
    }

    pub fn has_image(&self, reference: &str) -> bool {
        self.state.lock().unwrap().images.contains(reference)
    }

    /// Public ports are reported as `declared + offset`.
    pub fn set_port_offset(&self, offset: u32) {
        self.state.lock().unwrap().port_offset = offset;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count<F: Fn(&Call) -> bool>(&self, predicate: F) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let fails = state.failures.iter().any(|predicate| predicate(&call));
        let description = format!("{:?}", call);
        state.calls.push(call);

        if fails {
            Err(anyhow!("injected failure for {}", description))
        } else {
            Ok(())
        }
    }
}

impl ContainerEngine for FakeEngine {
    fn build_image(&self, script: &str) -> Result<ImageId> {
        self.record(Call::Build(script.to_owned()))?;
        let mut state = self.state.lock().unwrap();
        state.next_image += 1;
        let id = format!("sha256:image-{}", state.next_image);
        state.images.insert(id.clone());
        Ok(ImageId(id))
    }

    fn tag_image(&self, image: &ImageId, tag: &BuildTag) -> Result<()> {
        self.record(Call::Tag(image.0.clone(), tag.0.clone()))?;
        self.state.lock().unwrap().images.insert(tag.0.clone());
        Ok(())
    }

    fn create_container(&self, spec: CreateContainer) -> Result<ContainerId> {
        self.record(Call::Create(spec))?;
        let mut state = self.state.lock().unwrap();
        state.next_container += 1;
        Ok(ContainerId(format!("container-{}", state.next_container)))
    }

    fn start_container(&self, id: &ContainerId) -> Result<()> {
        self.record(Call::Start(id.0.clone()))
    }

    fn stop_container(&self, id: &ContainerId) -> Result<()> {
        self.record(Call::Stop(id.0.clone()))
    }

    fn remove_container(&self, id: &ContainerId) -> Result<()> {
        self.record(Call::RemoveContainer(id.0.clone()))
    }

    fn remove_image(&self, reference: &str) -> Result<bool> {
        self.record(Call::RemoveImage(reference.to_owned()))?;
        Ok(self.state.lock().unwrap().images.remove(reference))
    }

    fn public_port(&self, id: &ContainerId, port: u16) -> Result<String> {
        self.record(Call::Port(id.0.clone(), port))?;
        let offset = self.state.lock().unwrap().port_offset;
        Ok((u32::from(port) + offset).to_string())
    }
}

/// Keeps every record at info level or above.
#[derive(Default)]
pub struct CaptureLog {
    records: Mutex<Vec<(Level, String)>>,
}

impl CaptureLog {
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.records.lock().unwrap().clone()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }
}

impl Log for CaptureLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record<'_>) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

pub fn build_tag(name: &str) -> String {
    format!("{}-{}", name, std::process::id())
}

pub fn config(yaml: &str) -> MixConfig {
    MixConfig::parse("dockermix.yml", yaml).unwrap()
}

pub fn environment(engine: &Arc<FakeEngine>, yaml: &str) -> Environment {
    Environment::with_config(engine.clone(), Journal::discard(), config(yaml))
}
