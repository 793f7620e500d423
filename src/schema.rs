//! Desired-state manifest (`cfgsync.toml`)
//!
//! One table per kind, one sub-table per entity label:
//!
//! ```toml
//! [configuration.extractor]
//! component_id = "keboola.ex-http"
//! name = "Extractor"
//! configuration = '{"parameters": {"baseUrl": "https://example.com"}}'
//!
//! [[configuration.extractor.rows]]
//! name = "users"
//! configuration_row = '{"endpoint": "users"}'
//!
//! [branch.feature]
//! name = "feature"
//! ```
//!
//! Attributes the remote computes become unknown when omitted; required and
//! plain optional attributes stay unset.

use declarative::Field;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::resource::{
    BranchMetadata, Configuration, ConfigurationRow, DevBranch, Encryption, Kind, Scheduler,
    Snapshot,
};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("Could not read manifest {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid label '{label}' for {kind}: use letters, digits, '-' and '_'")]
    InvalidLabel { kind: Kind, label: String },
}

// ============================================================================
// Manifest Schema
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub configuration: BTreeMap<String, ConfigurationEntry>,
    pub encryption: BTreeMap<String, EncryptionEntry>,
    pub branch: BTreeMap<String, BranchEntry>,
    pub branch_metadata: BTreeMap<String, BranchMetadataEntry>,
    pub scheduler: BTreeMap<String, SchedulerEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigurationEntry {
    pub component_id: Option<String>,
    pub name: Option<String>,
    pub configuration_id: Option<String>,
    pub branch_id: Option<i64>,
    pub description: Option<String>,
    pub change_description: Option<String>,
    pub is_disabled: Option<bool>,
    /// Payload as JSON text
    pub configuration: Option<String>,
    pub rows: Option<Vec<RowEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RowEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub change_description: Option<String>,
    pub is_disabled: Option<bool>,
    pub state: Option<String>,
    pub configuration_row: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncryptionEntry {
    pub component_id: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BranchEntry {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BranchMetadataEntry {
    pub branch_id: Option<i64>,
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerEntry {
    pub config_id: Option<String>,
    pub configuration_version: Option<String>,
}

// ============================================================================
// Snapshot Conversion
// ============================================================================

/// Computed attribute: omitted means "the remote decides"
fn computed<T>(value: Option<T>) -> Field<T> {
    Field::from(value).or_unknown()
}

impl ConfigurationEntry {
    fn to_snapshot(&self) -> Configuration {
        Configuration {
            id: Field::Unknown,
            branch_id: computed(self.branch_id),
            component_id: self.component_id.clone().into(),
            configuration_id: computed(self.configuration_id.clone()),
            name: self.name.clone().into(),
            description: computed(self.description.clone()),
            change_description: computed(self.change_description.clone()),
            is_deleted: Field::Unknown,
            created: Field::Unknown,
            version: Field::Unknown,
            is_disabled: computed(self.is_disabled),
            configuration: computed(self.configuration.clone()),
            rows: computed(
                self.rows
                    .as_ref()
                    .map(|rows| rows.iter().map(RowEntry::to_row).collect()),
            ),
        }
    }
}

impl RowEntry {
    fn to_row(&self) -> ConfigurationRow {
        ConfigurationRow {
            id: computed(self.id.clone()),
            name: self.name.clone().into(),
            description: computed(self.description.clone()),
            change_description: computed(self.change_description.clone()),
            is_disabled: computed(self.is_disabled),
            version: Field::Unknown,
            state: computed(self.state.clone()),
            configuration_row: computed(self.configuration_row.clone()),
        }
    }
}

impl EncryptionEntry {
    fn to_snapshot(&self) -> Encryption {
        Encryption {
            id: Field::Unknown,
            component_id: self.component_id.clone().into(),
            value: computed(self.value.clone()),
            encrypted_value: Field::Unknown,
        }
    }
}

impl BranchEntry {
    fn to_snapshot(&self) -> DevBranch {
        DevBranch {
            id: Field::Unknown,
            name: self.name.clone().into(),
            description: computed(self.description.clone()),
            is_default: Field::Unknown,
        }
    }
}

impl BranchMetadataEntry {
    fn to_snapshot(&self) -> BranchMetadata {
        BranchMetadata {
            id: Field::Unknown,
            branch_id: self.branch_id.into(),
            key: self.key.clone().into(),
            value: self.value.clone().into(),
        }
    }
}

impl SchedulerEntry {
    fn to_snapshot(&self) -> Scheduler {
        Scheduler {
            id: Field::Unknown,
            config_id: self.config_id.clone().into(),
            configuration_version: computed(self.configuration_version.clone()),
        }
    }
}

// ============================================================================
// Manifest Implementation
// ============================================================================

/// Build the address of an entity
pub fn address(kind: Kind, label: &str) -> String {
    format!("{kind}.{label}")
}

fn valid_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse manifest text; `path` only labels errors
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        manifest.check_labels()?;
        log::debug!(
            "Loaded manifest {} with {} entities",
            path.display(),
            manifest.len()
        );
        Ok(manifest)
    }

    fn check_labels(&self) -> Result<(), ManifestError> {
        let labels = [
            (Kind::Configuration, self.configuration.keys().collect::<Vec<_>>()),
            (Kind::Encryption, self.encryption.keys().collect()),
            (Kind::Branch, self.branch.keys().collect()),
            (Kind::BranchMetadata, self.branch_metadata.keys().collect()),
            (Kind::Scheduler, self.scheduler.keys().collect()),
        ];
        for (kind, keys) in labels {
            if let Some(label) = keys.into_iter().find(|label| !valid_label(label)) {
                return Err(ManifestError::InvalidLabel {
                    kind,
                    label: label.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.configuration.len()
            + self.encryption.len()
            + self.branch.len()
            + self.branch_metadata.len()
            + self.scheduler.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Desired snapshots by address
    pub fn snapshots(&self) -> BTreeMap<String, Snapshot> {
        let mut out = BTreeMap::new();
        for (label, entry) in &self.configuration {
            out.insert(
                address(Kind::Configuration, label),
                Snapshot::Configuration(entry.to_snapshot()),
            );
        }
        for (label, entry) in &self.encryption {
            out.insert(
                address(Kind::Encryption, label),
                Snapshot::Encryption(entry.to_snapshot()),
            );
        }
        for (label, entry) in &self.branch {
            out.insert(
                address(Kind::Branch, label),
                Snapshot::Branch(entry.to_snapshot()),
            );
        }
        for (label, entry) in &self.branch_metadata {
            out.insert(
                address(Kind::BranchMetadata, label),
                Snapshot::BranchMetadata(entry.to_snapshot()),
            );
        }
        for (label, entry) in &self.scheduler {
            out.insert(
                address(Kind::Scheduler, label),
                Snapshot::Scheduler(entry.to_snapshot()),
            );
        }
        out
    }
}

// ============================================================================
// Tests
// ============================================================================
