//! In-process [`StorageApi`] used by lifecycle and command tests

use super::{Branch, Config, ConfigKey, ConfigRow, MetadataEntry, Schedule, StorageApi};
use declarative::{RemoteError, RemoteResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_BRANCH: i64 = 1;

#[derive(Debug)]
struct StoredConfig {
    config: Config,
    rows: Vec<ConfigRow>,
}

#[derive(Debug)]
struct MemoryState {
    next_id: i64,
    configs: HashMap<ConfigKey, StoredConfig>,
    branches: BTreeMap<i64, Branch>,
    metadata: Vec<MetadataEntry>,
    schedules: BTreeMap<String, Schedule>,
    calls: Vec<String>,
    failing: Option<&'static str>,
}

impl Default for MemoryState {
    fn default() -> Self {
        let main = Branch {
            id: Some(DEFAULT_BRANCH),
            name: "Main".to_string(),
            description: String::new(),
            is_default: true,
        };
        Self {
            next_id: 100,
            configs: HashMap::new(),
            branches: BTreeMap::from([(DEFAULT_BRANCH, main)]),
            metadata: Vec::new(),
            schedules: BTreeMap::new(),
            calls: Vec::new(),
            failing: None,
        }
    }
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn config(&mut self, key: &ConfigKey) -> RemoteResult<&mut StoredConfig> {
        self.configs
            .get_mut(key)
            .ok_or_else(|| not_found(format!("configuration {} not found", key.compound_id())))
    }
}

/// Remote stand-in keeping every record in memory
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the operations called so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Make the next call to `op` fail with a server error
    pub fn fail_next(&self, op: &'static str) {
        self.lock().failing = Some(op);
    }

    /// Remote rows of a configuration, in remote order
    pub fn rows(&self, key: &ConfigKey) -> Vec<ConfigRow> {
        self.lock()
            .configs
            .get(key)
            .map(|stored| stored.rows.clone())
            .unwrap_or_default()
    }

    /// Change a configuration behind the client's back
    pub fn edit_config(&self, key: &ConfigKey, edit: impl FnOnce(&mut Config)) {
        if let Some(stored) = self.lock().configs.get_mut(key) {
            edit(&mut stored.config);
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory storage lock poisoned")
    }

    fn record(&self, op: &'static str) -> RemoteResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.calls.push(op.to_string());

        if state.failing == Some(op) {
            state.failing = None;
            return Err(RemoteError::Status {
                status: 500,
                message: format!("injected {op} failure"),
            });
        }
        Ok(state)
    }
}

fn not_found(message: String) -> RemoteError {
    RemoteError::Status {
        status: 404,
        message,
    }
}

impl StorageApi for MemoryStorage {
    fn default_branch(&self) -> RemoteResult<Branch> {
        let state = self.record("default_branch")?;
        state
            .branches
            .values()
            .find(|b| b.is_default)
            .cloned()
            .ok_or_else(|| RemoteError::Protocol("project has no default branch".into()))
    }

    fn create_config(&self, config: &Config) -> RemoteResult<Config> {
        let mut state = self.record("create_config")?;
        let branch_id = config
            .branch_id
            .ok_or_else(|| RemoteError::Protocol("configuration branch is not resolved".into()))?;
        if !state.branches.contains_key(&branch_id) {
            return Err(not_found(format!("branch {branch_id} not found")));
        }

        let id = match &config.id {
            Some(id) => id.clone(),
            None => state.next_id().to_string(),
        };
        let created = Config {
            branch_id: Some(branch_id),
            id: Some(id.clone()),
            version: 1,
            created: "2024-01-01T00:00:00+0000".to_string(),
            is_deleted: false,
            ..config.clone()
        };

        let key = ConfigKey {
            branch_id,
            component_id: config.component_id.clone(),
            id,
        };
        if state.configs.contains_key(&key) {
            return Err(RemoteError::Status {
                status: 400,
                message: format!("configuration {} already exists", key.compound_id()),
            });
        }
        state.configs.insert(
            key,
            StoredConfig {
                config: created.clone(),
                rows: Vec::new(),
            },
        );
        Ok(created)
    }

    fn get_config(&self, key: &ConfigKey) -> RemoteResult<Config> {
        let mut state = self.record("get_config")?;
        Ok(state.config(key)?.config.clone())
    }

    fn update_config(&self, key: &ConfigKey, config: &Config) -> RemoteResult<Config> {
        let mut state = self.record("update_config")?;
        let stored = &mut state.config(key)?.config;

        stored.name.clone_from(&config.name);
        stored.description.clone_from(&config.description);
        stored.change_description.clone_from(&config.change_description);
        stored.is_disabled = config.is_disabled;
        stored.content.clone_from(&config.content);
        stored.version += 1;
        Ok(stored.clone())
    }

    fn delete_config(&self, key: &ConfigKey) -> RemoteResult<()> {
        let mut state = self.record("delete_config")?;
        state
            .configs
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("configuration {} not found", key.compound_id())))
    }

    fn list_rows(&self, key: &ConfigKey) -> RemoteResult<Vec<ConfigRow>> {
        let mut state = self.record("list_rows")?;
        Ok(state.config(key)?.rows.clone())
    }

    fn create_row(&self, key: &ConfigKey, row: &ConfigRow) -> RemoteResult<ConfigRow> {
        let mut state = self.record("create_row")?;
        let id = state.next_id().to_string();
        let created = ConfigRow {
            id: Some(id),
            version: 1,
            ..row.clone()
        };
        state.config(key)?.rows.push(created.clone());
        Ok(created)
    }

    fn update_row(&self, key: &ConfigKey, row: &ConfigRow) -> RemoteResult<ConfigRow> {
        let mut state = self.record("update_row")?;
        let stored = state.config(key)?;
        let existing = stored
            .rows
            .iter_mut()
            .find(|r| r.id == row.id)
            .ok_or_else(|| not_found(format!("row {:?} not found", row.id)))?;

        let version = existing.version + 1;
        *existing = ConfigRow {
            version,
            ..row.clone()
        };
        Ok(existing.clone())
    }

    fn delete_row(&self, key: &ConfigKey, row_id: &str) -> RemoteResult<()> {
        let mut state = self.record("delete_row")?;
        let stored = state.config(key)?;
        let before = stored.rows.len();
        stored.rows.retain(|r| r.id.as_deref() != Some(row_id));
        if stored.rows.len() == before {
            return Err(not_found(format!("row {row_id} not found")));
        }
        Ok(())
    }

    fn set_rows_sort_order(&self, key: &ConfigKey, order: &[String]) -> RemoteResult<()> {
        let mut state = self.record("set_rows_sort_order")?;
        let stored = state.config(key)?;
        stored.rows.sort_by_key(|row| {
            order
                .iter()
                .position(|id| Some(id.as_str()) == row.id.as_deref())
                .unwrap_or(usize::MAX)
        });
        Ok(())
    }

    fn create_branch(&self, branch: &Branch) -> RemoteResult<Branch> {
        let mut state = self.record("create_branch")?;
        let id = state.next_id();
        let created = Branch {
            id: Some(id),
            is_default: false,
            ..branch.clone()
        };
        state.branches.insert(id, created.clone());
        Ok(created)
    }

    fn get_branch(&self, id: i64) -> RemoteResult<Branch> {
        let state = self.record("get_branch")?;
        state
            .branches
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(format!("branch {id} not found")))
    }

    fn update_branch(&self, id: i64, branch: &Branch) -> RemoteResult<Branch> {
        let mut state = self.record("update_branch")?;
        let stored = state
            .branches
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("branch {id} not found")))?;
        stored.name.clone_from(&branch.name);
        stored.description.clone_from(&branch.description);
        Ok(stored.clone())
    }

    fn delete_branch(&self, id: i64) -> RemoteResult<()> {
        let mut state = self.record("delete_branch")?;
        if state.branches.get(&id).is_some_and(|b| b.is_default) {
            return Err(RemoteError::Status {
                status: 400,
                message: "the default branch cannot be deleted".into(),
            });
        }
        state
            .branches
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("branch {id} not found")))
    }

    fn append_branch_metadata(
        &self,
        branch_id: i64,
        key: &str,
        value: &str,
    ) -> RemoteResult<Vec<MetadataEntry>> {
        let mut state = self.record("append_branch_metadata")?;
        let existing = state
            .metadata
            .iter_mut()
            .find(|m| m.branch_id == branch_id && m.key == key);

        match existing {
            Some(entry) => value.clone_into(&mut entry.value),
            None => {
                let id = state.next_id().to_string();
                state.metadata.push(MetadataEntry {
                    branch_id,
                    id,
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }

        Ok(state
            .metadata
            .iter()
            .filter(|m| m.branch_id == branch_id)
            .cloned()
            .collect())
    }

    fn list_branch_metadata(&self, branch_id: i64) -> RemoteResult<Vec<MetadataEntry>> {
        let state = self.record("list_branch_metadata")?;
        Ok(state
            .metadata
            .iter()
            .filter(|m| m.branch_id == branch_id)
            .cloned()
            .collect())
    }

    fn delete_branch_metadata(&self, branch_id: i64, metadata_id: &str) -> RemoteResult<()> {
        let mut state = self.record("delete_branch_metadata")?;
        let before = state.metadata.len();
        state
            .metadata
            .retain(|m| !(m.branch_id == branch_id && m.id == metadata_id));
        if state.metadata.len() == before {
            return Err(not_found(format!("metadata {metadata_id} not found")));
        }
        Ok(())
    }

    fn encrypt(&self, component_id: &str, value: &str) -> RemoteResult<String> {
        let _state = self.record("encrypt")?;
        let reversed: String = value.chars().rev().collect();
        Ok(format!("KBC::ProjectSecure::{component_id}::{reversed}"))
    }

    fn activate_schedule(
        &self,
        config_id: &str,
        configuration_version: &str,
    ) -> RemoteResult<Schedule> {
        let mut state = self.record("activate_schedule")?;
        let id = state.next_id().to_string();
        let schedule = Schedule {
            id: Some(id.clone()),
            config_id: config_id.to_string(),
            configuration_version: configuration_version.to_string(),
        };
        state.schedules.insert(id, schedule.clone());
        Ok(schedule)
    }

    fn get_schedule(&self, id: &str) -> RemoteResult<Schedule> {
        let state = self.record("get_schedule")?;
        state
            .schedules
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(format!("schedule {id} not found")))
    }

    fn delete_schedule(&self, id: &str) -> RemoteResult<()> {
        let mut state = self.record("delete_schedule")?;
        state
            .schedules
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("schedule {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_follow_sort_order() {
        let storage = MemoryStorage::new();
        let config = storage
            .create_config(&Config {
                branch_id: Some(DEFAULT_BRANCH),
                component_id: "keboola.ex-http".into(),
                ..Config::default()
            })
            .unwrap();
        let key = config.key().unwrap();

        let first = storage.create_row(&key, &ConfigRow { name: "First".into(), ..ConfigRow::default() }).unwrap();
        let second = storage.create_row(&key, &ConfigRow { name: "Second".into(), ..ConfigRow::default() }).unwrap();

        storage
            .set_rows_sort_order(&key, &[second.id.clone().unwrap(), first.id.clone().unwrap()])
            .unwrap();

        let names: Vec<String> = storage.rows(&key).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[test]
    fn test_metadata_append_overwrites_key() {
        let storage = MemoryStorage::new();
        storage.append_branch_metadata(DEFAULT_BRANCH, "owner", "a").unwrap();
        let entries = storage.append_branch_metadata(DEFAULT_BRANCH, "owner", "b").unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, "b");
    }

    #[test]
    fn test_fail_next_is_one_shot() {
        let storage = MemoryStorage::new();
        storage.fail_next("default_branch");

        assert!(storage.default_branch().is_err());
        assert_eq!(storage.default_branch().unwrap().id, Some(DEFAULT_BRANCH));
    }
}
