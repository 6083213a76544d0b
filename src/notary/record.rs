//! The value stored for a notarized artifact.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::log::NotaryLog;

/// Version of the record layout, stored as `sbom_api_ver`.
pub const PROTOCOL_VERSION: &str = "0.2";

/// Top-level record fields that caller metadata can't replace.
pub const RECORD_FIELDS: [&str; 5] = ["Name", "Kind", "Size", "Hash", "Signer"];

/// What was notarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    File,
    Git,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::File => "file",
            ArtifactKind::Git => "git",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger value of a notarized artifact.
///
/// Serialized with PascalCase field names in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotarizationRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Kind")]
    pub kind: ArtifactKind,
    /// human-readable size, e.g. `1.20 MB`
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Hash")]
    pub hash: String,
    #[serde(rename = "Signer")]
    pub signer: String,
    #[serde(rename = "Metadata")]
    pub metadata: Map<String, Value>,
}

/// Metadata present on every record.
pub fn default_metadata() -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("sbom_api_ver".to_string(), Value::from(PROTOCOL_VERSION));
    metadata
}

/// Layer caller metadata over `base`; the caller wins on conflicts.
///
/// Keys that share a name with a top-level record field stay inside the
/// metadata map and are reported through `log`.
pub fn merge_metadata(
    mut base: Map<String, Value>,
    user: Option<&Map<String, Value>>,
    log: &dyn NotaryLog,
) -> Map<String, Value> {
    let Some(user) = user else {
        return base;
    };

    for (key, value) in user {
        if RECORD_FIELDS.contains(&key.as_str()) {
            log.warn(&format!(
                "metadata key \"{}\" has the name of a record field; it is kept under Metadata only",
                key
            ));
        }
        base.insert(key.clone(), value.clone());
    }
    base
}
