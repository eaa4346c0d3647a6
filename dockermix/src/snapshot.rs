use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Live identifiers of a built environment, keyed by container name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub containers: IndexMap<String, SnapshotEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotEntry {
    pub image_id: String,
    pub container_id: String,
    pub build_tag: String,

    /// Declared port to public port at the time of the dump.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub ports: IndexMap<u16, String>,
}

impl Snapshot {
    pub fn parse(text: &str) -> Result<Snapshot> {
        let snapshot: Snapshot =
            serde_yaml::from_str(text).map_err(|err| Error::SnapshotParse(err.to_string()))?;

        for (name, entry) in snapshot.containers.iter() {
            let fields = [
                ("image_id", &entry.image_id),
                ("container_id", &entry.container_id),
                ("build_tag", &entry.build_tag),
            ];

            for (field, value) in fields.iter() {
                if value.trim().is_empty() {
                    return Err(Error::SnapshotParse(format!(
                        "containers.{}.{}: must not be empty",
                        name, field
                    )));
                }
            }
        }

        Ok(snapshot)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|err| Error::SnapshotParse(err.to_string()))
    }
}
