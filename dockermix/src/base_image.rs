use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::{Error, Result},
    journal::Journal,
    models::{BuildTag, ContainerName, ImageId},
    services::ContainerEngine,
};

/// File extension of template build scripts inside a template directory.
pub const TEMPLATE_EXTENSION: &str = "docker";

/// Builds a reusable image from a named template and tags it with the
/// template's name, so environments can use it as a `base`.
pub struct BaseImageBuilder {
    name: String,
    script: String,
    engine: Arc<dyn ContainerEngine>,
    journal: Journal,
}

impl BaseImageBuilder {
    pub fn new<N, S>(engine: Arc<dyn ContainerEngine>, journal: Journal, name: N, script: S) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        BaseImageBuilder {
            name: name.into(),
            script: script.into(),
            engine,
            journal,
        }
    }

    /// Reads the build script from `<templates>/<name>.docker`.
    pub fn from_templates<P: AsRef<Path>>(
        engine: Arc<dyn ContainerEngine>,
        journal: Journal,
        templates: P,
        name: &str,
    ) -> Result<Self> {
        let path = template_path(templates.as_ref(), name);
        let script = fs::read_to_string(&path).map_err(|source| Error::Io { path, source })?;

        Ok(BaseImageBuilder::new(engine, journal, name, script))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self) -> Result<ImageId> {
        self.journal.info(format_args!(
            "building base image {}, this may take a while",
            self.name
        ));

        let tag = BuildTag(self.name.clone());
        let build_error = |source: anyhow::Error| Error::EngineBuild {
            name: ContainerName(self.name.clone()),
            tag: tag.clone(),
            source,
        };

        let image_id = self.engine.build_image(&self.script).map_err(build_error)?;
        self.engine.tag_image(&image_id, &tag).map_err(build_error)?;

        self.journal
            .info(format_args!("base image registered with tag {}", self.name));

        Ok(image_id)
    }

    pub fn destroy(&self) -> Result<()> {
        self.journal
            .info(format_args!("removing base image {}", self.name));

        let removed = self
            .engine
            .remove_image(&self.name)
            .map_err(|err| Error::EngineTeardown {
                name: ContainerName(self.name.clone()),
                failures: vec![format!("remove image {}: {:#}", self.name, err)],
            })?;

        if !removed {
            self.journal
                .warn(format_args!("no base image tagged {}", self.name));
        }

        Ok(())
    }
}

pub fn template_path(templates: &Path, name: &str) -> PathBuf {
    templates.join(format!("{}.{}", name, TEMPLATE_EXTENSION))
}
