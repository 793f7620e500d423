//! Persisted snapshots of every managed entity
//!
//! The state file is a JSON document keyed by address (`kind.label`). Each
//! entry carries the snapshot the last lifecycle call returned.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::Persist;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resource::Snapshot;

/// Current state file format
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,

    /// Last time the state was written
    pub last_updated: DateTime<Utc>,

    /// Snapshots by address
    #[serde(default)]
    pub entities: BTreeMap<String, Snapshot>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            entities: BTreeMap::new(),
        }
    }
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    /// Load state from `path`, or an empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using empty state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this cfgsync understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} entities from {}",
            state.entities.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to `path`, touching `last_updated`
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.version = STATE_VERSION;
        self.last_updated = Utc::now();
        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        // Write next to the target, then rename over it
        let tmp = temp_path(path);
        fs::write(&tmp, content + "\n")
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&Snapshot> {
        self.entities.get(address)
    }

    /// Apply what a lifecycle call asked for
    ///
    /// Returns whether the state changed.
    pub fn apply(&mut self, address: &str, persist: Persist<Snapshot>) -> bool {
        match persist {
            Persist::Write(snapshot) => {
                self.entities.insert(address.to_string(), snapshot);
                true
            }
            Persist::Remove => self.entities.remove(address).is_some(),
            Persist::Keep => false,
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Configuration, ConfigurationRow, DevBranch};
    use declarative::Field;
    use tempfile::TempDir;

    fn configuration() -> Snapshot {
        Snapshot::Configuration(Configuration {
            id: Field::Known("1/keboola.ex-http/9".into()),
            branch_id: Field::Known(1),
            component_id: Field::Known("keboola.ex-http".into()),
            configuration_id: Field::Known("9".into()),
            name: Field::Known("Extractor".into()),
            configuration: Field::Known(r#"{"z":1,"a":2}"#.into()),
            rows: Field::Known(vec![ConfigurationRow {
                id: Field::Known("10".into()),
                name: Field::Known("First".into()),
                ..ConfigurationRow::default()
            }]),
            ..Configuration::default()
        })
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::load(&dir.path().join("state.json")).unwrap();
        assert!(state.entities.is_empty());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = StateFile::default();
        state.apply("configuration.extractor", Persist::Write(configuration()));
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        assert_eq!(loaded.entities, state.entities);
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn test_absent_fields_load_as_unset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = StateFile::default();
        state.apply(
            "branch.feature",
            Persist::Write(Snapshot::Branch(DevBranch {
                id: Field::Unknown,
                name: Field::Known("feature".into()),
                ..DevBranch::default()
            })),
        );
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        match loaded.get("branch.feature") {
            Some(Snapshot::Branch(branch)) => {
                assert!(branch.id.is_unset());
                assert_eq!(branch.name.as_str(), "feature");
            }
            other => panic!("unexpected snapshot: {other:?}"),
        }
    }

    #[test]
    fn test_apply_persist() {
        let mut state = StateFile::default();

        assert!(state.apply("configuration.extractor", Persist::Write(configuration())));
        assert!(!state.apply("configuration.extractor", Persist::Keep));
        assert!(state.get("configuration.extractor").is_some());

        assert!(state.apply("configuration.extractor", Persist::Remove));
        assert!(!state.apply("configuration.extractor", Persist::Remove));
        assert!(state.entities.is_empty());
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"version": 99, "last_updated": "2024-01-01T00:00:00Z", "entities": {}}"#,
        )
        .unwrap();

        assert!(StateFile::load(&path).is_err());
    }

    #[test]
    fn test_payload_order_survives() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = StateFile::default();
        state.apply("configuration.extractor", Persist::Write(configuration()));
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        match loaded.get("configuration.extractor") {
            Some(Snapshot::Configuration(config)) => {
                assert_eq!(config.configuration.as_str(), r#"{"z":1,"a":2}"#);
            }
            other => panic!("unexpected snapshot: {other:?}"),
        }
    }
}
