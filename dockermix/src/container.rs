use anyhow::Context;
use indexmap::IndexMap;
use std::sync::Arc;

use crate::{
    error::{Error, Result},
    journal::Journal,
    models::{
        BuildTag, ContainerId, ContainerName, ContainerState, ImageId, ImageSource,
        DEFAULT_BASE_IMAGE, DEFAULT_COMMAND,
    },
    services::{ContainerEngine, CreateContainer},
};

/// Identity and configuration of one managed container.
///
/// Base image and command are `None` for records reattached from a
/// snapshot, which does not carry them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerRecord {
    name: ContainerName,
    build_tag: BuildTag,
    base_image: Option<String>,
    ports: Vec<u16>,
    command: Option<Vec<String>>,
    state: ContainerState,
}

impl ContainerRecord {
    /// A fresh, unbuilt record with the default base image, command and a
    /// build tag derived from the current process id.
    pub fn new(name: ContainerName) -> ContainerRecord {
        let build_tag = BuildTag::for_current_process(&name);

        ContainerRecord {
            name,
            build_tag,
            base_image: Some(DEFAULT_BASE_IMAGE.to_owned()),
            ports: Vec::new(),
            command: Some(vec![DEFAULT_COMMAND.to_owned()]),
            state: ContainerState::Unbuilt,
        }
    }

    /// A record for a container that is already running, e.g. one read back
    /// from a snapshot.
    pub fn reattached(
        name: ContainerName,
        build_tag: BuildTag,
        image_id: ImageId,
        container_id: ContainerId,
        ports: Vec<u16>,
    ) -> ContainerRecord {
        ContainerRecord {
            name,
            build_tag,
            base_image: None,
            ports,
            command: None,
            state: ContainerState::Running {
                image: image_id,
                container_id,
            },
        }
    }

    pub fn with_build_tag(mut self, build_tag: BuildTag) -> ContainerRecord {
        self.build_tag = build_tag;
        self
    }

    pub fn with_base_image<S: Into<String>>(mut self, base_image: S) -> ContainerRecord {
        self.base_image = Some(base_image.into());
        self
    }

    pub fn with_ports(mut self, ports: Vec<u16>) -> ContainerRecord {
        self.ports = ports;
        self
    }

    pub fn with_command(mut self, command: Vec<String>) -> ContainerRecord {
        self.command = Some(command);
        self
    }

    pub fn name(&self) -> &ContainerName {
        &self.name
    }

    pub fn build_tag(&self) -> &BuildTag {
        &self.build_tag
    }

    pub fn base_image(&self) -> Option<&str> {
        self.base_image.as_deref()
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn command(&self) -> Option<&[String]> {
        self.command.as_deref()
    }

    pub fn state(&self) -> &ContainerState {
        &self.state
    }

    pub fn image_id(&self) -> Option<&ImageId> {
        self.state.image()
    }

    pub fn container_id(&self) -> Option<&ContainerId> {
        self.state.container_id()
    }
}

/// Drives one container through build, start and teardown on the engine.
pub struct ContainerHandle {
    record: ContainerRecord,
    engine: Arc<dyn ContainerEngine>,
    journal: Journal,
}

impl ContainerHandle {
    pub fn new(
        record: ContainerRecord,
        engine: Arc<dyn ContainerEngine>,
        journal: Journal,
    ) -> ContainerHandle {
        ContainerHandle {
            record,
            engine,
            journal,
        }
    }

    pub fn record(&self) -> &ContainerRecord {
        &self.record
    }

    pub fn name(&self) -> &ContainerName {
        self.record.name()
    }

    pub fn build_tag(&self) -> &BuildTag {
        self.record.build_tag()
    }

    pub fn ports(&self) -> &[u16] {
        self.record.ports()
    }

    pub fn state(&self) -> &ContainerState {
        self.record.state()
    }

    pub fn image_id(&self) -> Option<&ImageId> {
        self.record.image_id()
    }

    pub fn container_id(&self) -> Option<&ContainerId> {
        self.record.container_id()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.record.state, ContainerState::Running { .. })
    }

    /// Produces the image, then starts a container from it.
    pub fn build(&mut self, source: ImageSource) -> Result<()> {
        if self.record.state != ContainerState::Unbuilt {
            return Err(self.invalid_state("build"));
        }

        let image = match source {
            ImageSource::FromBuildScript { content } => {
                let id = self
                    .engine
                    .build_image(&content)
                    .and_then(|id| {
                        self.engine
                            .tag_image(&id, &self.record.build_tag)
                            .with_context(|| format!("failed to tag image {}", id))?;
                        Ok(id)
                    })
                    .map_err(|source| Error::EngineBuild {
                        name: self.record.name.clone(),
                        tag: self.record.build_tag.clone(),
                        source,
                    })?;

                self.journal.info(format_args!(
                    "container {} registered with tag {}",
                    self.record.name, self.record.build_tag
                ));

                id
            }
            ImageSource::FromBaseImage { name } => {
                self.journal.debug(format_args!(
                    "container {} uses base image {} as-is",
                    self.record.name, name
                ));

                ImageId(name)
            }
        };

        self.record.state = ContainerState::Built { image };
        self.start()
    }

    /// Creates a detached container from the built image and starts it.
    pub fn start(&mut self) -> Result<()> {
        let image = match &self.record.state {
            ContainerState::Built { image } => image.clone(),
            _ => return Err(self.invalid_state("start")),
        };

        let start_error = |source: anyhow::Error| Error::EngineStart {
            name: self.record.name.clone(),
            source,
        };

        let container_id = self
            .engine
            .create_container(CreateContainer {
                image: image.clone(),
                command: self.record.command.clone().unwrap_or_default(),
                ports: self.record.ports.clone(),
                hostname: self.record.build_tag.clone(),
            })
            .map_err(start_error)?;

        self.engine
            .start_container(&container_id)
            .with_context(|| format!("container {} was created but did not start", container_id))
            .map_err(start_error)?;

        self.journal.info(format_args!(
            "container {} started as {}",
            self.record.build_tag, container_id
        ));

        self.record.state = ContainerState::Running {
            image,
            container_id,
        };

        Ok(())
    }

    /// Stops and removes the container, then removes the image tag.
    ///
    /// Every step is attempted even when an earlier one fails. Failures are
    /// logged and returned together; the handle ends up destroyed either way.
    /// A tag the engine does not know, as for containers run from a plain
    /// base image, counts as removed.
    pub fn destroy(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.record.state, ContainerState::Destroyed);

        let container_id = match state {
            ContainerState::Unbuilt | ContainerState::Destroyed => return Ok(()),
            ContainerState::Built { .. } => None,
            ContainerState::Running { container_id, .. } => Some(container_id),
        };

        self.journal
            .info(format_args!("destroying container {}", self.record.name));

        let mut failures = Vec::new();

        if let Some(container_id) = container_id {
            if let Err(err) = self.engine.stop_container(&container_id) {
                failures.push(format!("stop {}: {:#}", container_id, err));
            }

            if let Err(err) = self.engine.remove_container(&container_id) {
                failures.push(format!("remove container {}: {:#}", container_id, err));
            }
        }

        match self.engine.remove_image(&self.record.build_tag.0) {
            Ok(true) => {}
            Ok(false) => self.journal.debug(format_args!(
                "no image tagged {}, nothing to remove",
                self.record.build_tag
            )),
            Err(err) => failures.push(format!("remove image {}: {:#}", self.record.build_tag, err)),
        }

        if failures.is_empty() {
            return Ok(());
        }

        for failure in failures.iter() {
            self.journal.warn(format_args!(
                "teardown of container {}: {}",
                self.record.name, failure
            ));
        }

        Err(Error::EngineTeardown {
            name: self.record.name.clone(),
            failures,
        })
    }

    /// Declared port to the host port the engine currently publishes it on.
    pub fn public_ports(&self) -> Result<IndexMap<u16, String>> {
        let container_id = match self.record.container_id() {
            Some(container_id) => container_id,
            None => return Err(self.invalid_state("query ports of")),
        };

        let mut ports = IndexMap::new();
        for port in self.record.ports.iter().copied() {
            let public_port = self
                .engine
                .public_port(container_id, port)
                .map_err(|source| Error::PortLookup {
                    name: self.record.name.clone(),
                    port,
                    source,
                })?;
            ports.insert(port, public_port);
        }

        Ok(ports)
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            name: self.record.name.clone(),
            operation,
            state: self.record.state.label(),
        }
    }
}
