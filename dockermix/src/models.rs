use std::{borrow::Borrow, fmt};

pub const DEFAULT_BASE_IMAGE: &str = "ubuntu";
pub const DEFAULT_COMMAND: &str = "/bin/true";

#[derive(Clone, Debug, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct ContainerName(pub String);

#[derive(Clone, Debug, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct BuildTag(pub String);

#[derive(Clone, Debug, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct ImageId(pub String);

#[derive(Clone, Debug, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct ContainerId(pub String);

impl Borrow<str> for ContainerName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl BuildTag {
    /// `<name>-<pid>`, so environments built by different processes on the
    /// same host never share tags.
    pub fn for_process(name: &ContainerName, pid: u32) -> BuildTag {
        BuildTag(format!("{}-{}", name.0, pid))
    }

    pub fn for_current_process(name: &ContainerName) -> BuildTag {
        BuildTag::for_process(name, std::process::id())
    }
}

macro_rules! display_inner {
    ($($ty:ident),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $ty {
                fn from(value: &str) -> Self {
                    $ty(value.to_owned())
                }
            }
        )*
    };
}

display_inner!(ContainerName, BuildTag, ImageId, ContainerId);

/// Where a container's image comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    FromBaseImage { name: String },
    FromBuildScript { content: String },
}

impl ImageSource {
    /// A build script wins over the base image when both are known.
    pub fn resolve(build_script: Option<String>, base_image: &str) -> ImageSource {
        match build_script {
            Some(content) => ImageSource::FromBuildScript { content },
            None => ImageSource::FromBaseImage {
                name: base_image.to_owned(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerState {
    Unbuilt,
    Built {
        image: ImageId,
    },
    Running {
        image: ImageId,
        container_id: ContainerId,
    },
    Destroyed,
}

impl ContainerState {
    pub fn label(&self) -> &'static str {
        match self {
            ContainerState::Unbuilt => "unbuilt",
            ContainerState::Built { .. } => "built",
            ContainerState::Running { .. } => "running",
            ContainerState::Destroyed => "destroyed",
        }
    }

    pub fn image(&self) -> Option<&ImageId> {
        match self {
            ContainerState::Built { image } | ContainerState::Running { image, .. } => Some(image),
            _ => None,
        }
    }

    pub fn container_id(&self) -> Option<&ContainerId> {
        match self {
            ContainerState::Running { container_id, .. } => Some(container_id),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_build_tags_differ_between_processes() {
        let name = ContainerName::from("web");
        let first = BuildTag::for_process(&name, 100);
        let second = BuildTag::for_process(&name, 101);

        assert_eq!(first.0, "web-100");
        assert_ne!(first, second);
    }

    #[test]
    fn build_script_takes_precedence_over_base_image() {
        assert_eq!(
            ImageSource::resolve(Some("FROM ubuntu\n".into()), "debian"),
            ImageSource::FromBuildScript {
                content: "FROM ubuntu\n".into()
            }
        );
        assert_eq!(
            ImageSource::resolve(None, "debian"),
            ImageSource::FromBaseImage {
                name: "debian".into()
            }
        );
    }
}
