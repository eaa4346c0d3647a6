use std::path::PathBuf;
use thiserror::Error;

use crate::models::{BuildTag, ContainerName};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build image {tag} for container {name}: {source}")]
    EngineBuild {
        name: ContainerName,
        tag: BuildTag,
        source: anyhow::Error,
    },

    #[error("failed to start container {name}: {source}")]
    EngineStart {
        name: ContainerName,
        source: anyhow::Error,
    },

    #[error("teardown of container {name} was incomplete: {}", .failures.join("; "))]
    EngineTeardown {
        name: ContainerName,
        failures: Vec<String>,
    },

    #[error("failed to look up the public port for {port} of container {name}: {source}")]
    PortLookup {
        name: ContainerName,
        port: u16,
        source: anyhow::Error,
    },

    #[error("invalid configuration in {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("no container named {0}")]
    NotFound(ContainerName),

    #[error("invalid snapshot: {0}")]
    SnapshotParse(String),

    #[error("cannot {operation} container {name} while it is {state}")]
    InvalidState {
        name: ContainerName,
        operation: &'static str,
        state: &'static str,
    },

    #[error("the environment has no container definitions to build")]
    MissingConfig,

    #[error("the environment is already built, destroy it first")]
    AlreadyBuilt,

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
