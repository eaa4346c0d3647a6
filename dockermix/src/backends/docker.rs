use anyhow::Result;
use docker_cli::{Client, CreateOptions};

use crate::{
    models::{BuildTag, ContainerId, ImageId},
    services::{ContainerEngine, CreateContainer},
};

pub struct DockerBackend {
    client: Client,
}

impl DockerBackend {
    /// `program` is the engine binary, usually `docker` or `podman`.
    pub fn new<P: Into<String>>(program: P) -> DockerBackend {
        DockerBackend {
            client: Client::new(program),
        }
    }
}

impl ContainerEngine for DockerBackend {
    fn build_image(&self, script: &str) -> Result<ImageId> {
        let id = self.client.build(script)?;
        Ok(ImageId(id))
    }

    fn tag_image(&self, image: &ImageId, tag: &BuildTag) -> Result<()> {
        self.client.tag(&image.0, &tag.0)?;
        Ok(())
    }

    fn create_container(&self, spec: CreateContainer) -> Result<ContainerId> {
        let options = CreateOptions {
            image: &spec.image.0,
            command: &spec.command,
            ports: &spec.ports,
            hostname: &spec.hostname.0,
        };

        let id = self.client.create(&options)?;
        Ok(ContainerId(id))
    }

    fn start_container(&self, id: &ContainerId) -> Result<()> {
        self.client.start(&id.0)?;
        Ok(())
    }

    fn stop_container(&self, id: &ContainerId) -> Result<()> {
        self.client.stop(&id.0)?;
        Ok(())
    }

    fn remove_container(&self, id: &ContainerId) -> Result<()> {
        self.client.remove_container(&id.0)?;
        Ok(())
    }

    fn remove_image(&self, reference: &str) -> Result<bool> {
        let removed = self.client.remove_image(reference)?;
        Ok(removed)
    }

    fn public_port(&self, id: &ContainerId, port: u16) -> Result<String> {
        let host_port = self.client.port(&id.0, port)?;
        Ok(host_port)
    }
}
