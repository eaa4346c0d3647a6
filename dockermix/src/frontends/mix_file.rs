use indexmap::IndexMap;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    models::{ContainerName, DEFAULT_COMMAND},
    services::ComposerFrontend,
};

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MixFile {
    containers: IndexMap<String, Service>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Service {
    base: String,

    #[serde(default)]
    ports: Vec<u16>,

    dockerfile: Option<String>,

    command: Option<CommandLine>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum CommandLine {
    Shell(String),
    Exec(Vec<String>),
}

impl CommandLine {
    fn into_args(self) -> Vec<String> {
        match self {
            CommandLine::Shell(line) => line.split_whitespace().map(String::from).collect(),
            CommandLine::Exec(args) => args,
        }
    }
}

/// One validated entry of the `containers` mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerDefinition {
    pub name: ContainerName,
    pub base: String,
    pub ports: Vec<u16>,
    pub dockerfile: Option<String>,
    pub command: Vec<String>,
}

/// Container definitions in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MixConfig {
    pub containers: Vec<ContainerDefinition>,
}

impl MixConfig {
    /// Parses and validates a config document. `path` is only used to give
    /// errors some context.
    pub fn parse<P: AsRef<Path>>(path: P, text: &str) -> Result<MixConfig> {
        let path = path.as_ref();
        let invalid = |message: String| Error::ConfigParse {
            path: path.to_owned(),
            message,
        };

        let file: MixFile = serde_yaml::from_str(text).map_err(|err| invalid(err.to_string()))?;

        if file.containers.is_empty() {
            return Err(invalid("containers: at least one container must be defined".into()));
        }

        let mut config = MixConfig::default();

        for (name, service) in file.containers {
            if !is_valid_name(&name) {
                return Err(invalid(format!(
                    "containers.{}: names may only use lowercase letters, digits, '.', '_' and '-', and must start with a letter or digit",
                    name
                )));
            }

            if service.base.trim().is_empty() {
                return Err(invalid(format!("containers.{}.base: must not be empty", name)));
            }

            if service.ports.contains(&0) {
                return Err(invalid(format!("containers.{}.ports: 0 is not a valid port", name)));
            }

            if let Some(dockerfile) = &service.dockerfile {
                if dockerfile.trim().is_empty() {
                    return Err(invalid(format!(
                        "containers.{}.dockerfile: must not be blank",
                        name
                    )));
                }
            }

            let command = match service.command {
                Some(command) => command.into_args(),
                None => vec![DEFAULT_COMMAND.to_owned()],
            };

            if command.is_empty() {
                return Err(invalid(format!("containers.{}.command: must not be empty", name)));
            }

            config.containers.push(ContainerDefinition {
                name: ContainerName(name),
                base: service.base,
                ports: service.ports,
                dockerfile: service.dockerfile,
                command,
            });
        }

        Ok(config)
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first.is_ascii_digit() => (),
        _ => return false,
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_' || c == '-')
}

pub struct MixFileFrontend;

impl MixFileFrontend {
    pub fn new() -> MixFileFrontend {
        MixFileFrontend
    }
}

impl ComposerFrontend for MixFileFrontend {
    fn config(&mut self, config_path: &Path) -> Result<MixConfig> {
        let text = fs::read_to_string(config_path).map_err(|source| Error::Io {
            path: PathBuf::from(config_path),
            source,
        })?;

        MixConfig::parse(config_path, &text)
    }
}
