use anyhow::Result;
use std::path::Path;

use crate::{
    frontends::MixConfig,
    models::{BuildTag, ContainerId, ImageId},
};

pub trait ComposerFrontend {
    fn config(&mut self, config_path: &Path) -> crate::error::Result<MixConfig>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateContainer {
    pub image: ImageId,
    pub command: Vec<String>,
    pub ports: Vec<u16>,
    pub hostname: BuildTag,
}

/// Operations the environment needs from a container engine. Every call
/// blocks until the engine answers.
pub trait ContainerEngine {
    fn build_image(&self, script: &str) -> Result<ImageId>;

    fn tag_image(&self, image: &ImageId, tag: &BuildTag) -> Result<()>;

    /// Creates a detached container without starting it.
    fn create_container(&self, spec: CreateContainer) -> Result<ContainerId>;

    fn start_container(&self, id: &ContainerId) -> Result<()>;

    fn stop_container(&self, id: &ContainerId) -> Result<()>;

    fn remove_container(&self, id: &ContainerId) -> Result<()>;

    /// Removes an image by tag or id. Returns `false` if no image had that
    /// reference, which is not an error.
    fn remove_image(&self, reference: &str) -> Result<bool>;

    /// The host port that `port` of the container is currently published on.
    fn public_port(&self, id: &ContainerId, port: u16) -> Result<String>;
}
