use indexmap::IndexMap;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::NamedTempFile;

use crate::{
    container::{ContainerHandle, ContainerRecord},
    error::{Error, Result},
    frontends::MixConfig,
    journal::Journal,
    models::{BuildTag, ContainerId, ContainerName, ContainerState, ImageId, ImageSource},
    services::ContainerEngine,
    snapshot::{Snapshot, SnapshotEntry},
};

/// Outcome of [`Environment::destroy`]. Teardown never stops early, so the
/// report lists every container either way.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub destroyed: Vec<ContainerName>,
    pub failed: Vec<(ContainerName, Error)>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn has_failed(&self, name: &ContainerName) -> bool {
        self.failed.iter().any(|(failed, _)| failed == name)
    }
}

/// A named group of containers, built from a [`MixConfig`] or reattached
/// from a [`Snapshot`].
pub struct Environment {
    engine: Arc<dyn ContainerEngine>,
    journal: Journal,
    config: Option<MixConfig>,
    containers: IndexMap<ContainerName, ContainerHandle>,
}

impl Environment {
    pub fn new(engine: Arc<dyn ContainerEngine>, journal: Journal) -> Environment {
        Environment {
            engine,
            journal,
            config: None,
            containers: IndexMap::new(),
        }
    }

    pub fn with_config(
        engine: Arc<dyn ContainerEngine>,
        journal: Journal,
        config: MixConfig,
    ) -> Environment {
        let mut environment = Environment::new(engine, journal);
        environment.config = Some(config);
        environment
    }

    pub fn from_snapshot(
        engine: Arc<dyn ContainerEngine>,
        journal: Journal,
        snapshot: Snapshot,
    ) -> Environment {
        let mut environment = Environment::new(engine, journal);
        environment.load(snapshot);
        environment
    }

    /// Builds and starts every configured container in declaration order.
    ///
    /// The first failure is returned as-is. Containers built before it stay
    /// registered, so the caller can still [`destroy`](Self::destroy) them;
    /// the failing container and the ones after it are never registered.
    pub fn build(&mut self) -> Result<()> {
        let config = self.config.as_ref().ok_or(Error::MissingConfig)?;

        let live = self
            .containers
            .values()
            .any(|handle| *handle.state() != ContainerState::Destroyed);
        if live {
            return Err(Error::AlreadyBuilt);
        }

        self.containers.clear();

        for definition in config.containers.iter() {
            self.journal.info(format_args!(
                "building container {} using base {}",
                definition.name, definition.base
            ));

            let record = ContainerRecord::new(definition.name.clone())
                .with_base_image(definition.base.clone())
                .with_ports(definition.ports.clone())
                .with_command(definition.command.clone());

            let mut handle = ContainerHandle::new(record, self.engine.clone(), self.journal.clone());
            handle.build(ImageSource::resolve(
                definition.dockerfile.clone(),
                &definition.base,
            ))?;

            self.containers.insert(definition.name.clone(), handle);
        }

        Ok(())
    }

    /// Tears down every container. A failure in one container is logged and
    /// reported but never keeps the others from being torn down.
    pub fn destroy(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        for (name, handle) in self.containers.iter_mut() {
            match handle.destroy() {
                Ok(()) => report.destroyed.push(name.clone()),
                Err(err) => report.failed.push((name.clone(), err)),
            }
        }

        if report.is_clean() {
            self.journal.info(format_args!(
                "destroyed {} containers",
                report.destroyed.len()
            ));
        } else {
            self.journal.warn(format_args!(
                "destroyed {} containers, {} with errors",
                report.destroyed.len() + report.failed.len(),
                report.failed.len()
            ));
        }

        report
    }

    /// Replaces the managed containers with handles to the live containers
    /// named in `snapshot`. Nothing is built or started.
    pub fn load(&mut self, snapshot: Snapshot) {
        let mut containers = IndexMap::new();

        for (name, entry) in snapshot.containers {
            let name = ContainerName(name);
            let record = ContainerRecord::reattached(
                name.clone(),
                BuildTag(entry.build_tag),
                ImageId(entry.image_id),
                ContainerId(entry.container_id),
                entry.ports.keys().copied().collect(),
            );

            self.journal
                .debug(format_args!("reattached container {}", name));

            containers.insert(
                name,
                ContainerHandle::new(record, self.engine.clone(), self.journal.clone()),
            );
        }

        self.containers = containers;
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.journal
            .info(format_args!("loading environment from {}", path.display()));

        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: PathBuf::from(path),
            source,
        })?;

        self.load(Snapshot::parse(&text)?);
        Ok(())
    }

    /// Identifiers of every container plus, for containers that publish
    /// ports, the public ports the engine currently assigns.
    pub fn dump(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::default();

        for (name, handle) in self.containers.iter() {
            let (image, container_id) = match handle.state() {
                ContainerState::Running {
                    image,
                    container_id,
                } => (image, container_id),
                state => {
                    return Err(Error::InvalidState {
                        name: name.clone(),
                        operation: "dump",
                        state: state.label(),
                    })
                }
            };

            let ports = if handle.ports().is_empty() {
                IndexMap::new()
            } else {
                handle.public_ports()?
            };

            snapshot.containers.insert(
                name.0.clone(),
                SnapshotEntry {
                    image_id: image.0.clone(),
                    container_id: container_id.0.clone(),
                    build_tag: handle.build_tag().0.clone(),
                    ports,
                },
            );
        }

        Ok(snapshot)
    }

    /// Writes [`dump`](Self::dump) to `path`. The file is replaced
    /// atomically, so an interrupted save leaves the old state intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.journal
            .info(format_args!("saving environment state to {}", path.display()));

        let yaml = self.dump()?.to_yaml()?;

        let io_error = |source: std::io::Error| Error::Io {
            path: PathBuf::from(path),
            source,
        };

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(directory).map_err(io_error)?;
        file.write_all(yaml.as_bytes()).map_err(io_error)?;
        file.persist(path).map_err(|err| io_error(err.error))?;

        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ContainerHandle> {
        self.containers
            .get(name)
            .ok_or_else(|| Error::NotFound(ContainerName::from(name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &ContainerName> {
        self.containers.keys()
    }

    pub fn handles(&self) -> impl Iterator<Item = &ContainerHandle> {
        self.containers.values()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
