//! Declarative lifecycle management for groups of containers.
//!
//! An [`Environment`] builds every container described by a [`MixConfig`],
//! records their live identifiers in a [`Snapshot`] and can later reattach to
//! the same containers from that snapshot to tear them down.

pub mod backends;
pub mod base_image;
pub mod container;
pub mod environment;
pub mod error;
pub mod frontends;
pub mod journal;
pub mod models;
pub mod services;
pub mod snapshot;

pub use base_image::BaseImageBuilder;
pub use container::{ContainerHandle, ContainerRecord};
pub use environment::{Environment, TeardownReport};
pub use error::{Error, Result};
pub use frontends::{ContainerDefinition, MixConfig, MixFileFrontend};
pub use journal::Journal;
pub use snapshot::{Snapshot, SnapshotEntry};
