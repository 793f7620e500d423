//! Component configuration with ordered rows

mod mapper;
mod rows;

use crate::remote::{Api, Config, ConfigKey};
use declarative::{EntityKind, Field, NestedCollection, RemoteResult, TranslationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use mapper::ConfigurationMapper;
pub use rows::RowCollection;

/// Audit comment injected when a configuration or row is created
pub const CREATED_BY: &str = "Created by cfgsync";
/// Audit comment injected on every later write
pub const UPDATED_BY: &str = "Updated by cfgsync";

/// Local snapshot of one component configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Compound id `{branch}/{component}/{config}`
    pub id: Field<String>,
    pub branch_id: Field<i64>,
    pub component_id: Field<String>,
    pub configuration_id: Field<String>,
    pub name: Field<String>,
    pub description: Field<String>,
    pub change_description: Field<String>,
    pub is_deleted: Field<bool>,
    pub created: Field<String>,
    pub version: Field<i64>,
    pub is_disabled: Field<bool>,
    /// Payload text
    pub configuration: Field<String>,
    pub rows: Field<Vec<ConfigurationRow>>,
}

/// One configuration row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationRow {
    pub id: Field<String>,
    pub name: Field<String>,
    pub description: Field<String>,
    pub change_description: Field<String>,
    pub is_disabled: Field<bool>,
    pub version: Field<i64>,
    /// Row state payload text
    pub state: Field<String>,
    /// Row payload text
    pub configuration_row: Field<String>,
}

/// Remote key of a configuration whose identifiers are all known
pub fn config_key(config: &Configuration) -> Result<ConfigKey, TranslationError> {
    let branch_id = config
        .branch_id
        .as_known()
        .copied()
        .ok_or(TranslationError::MissingIdentifier("branch_id"))?;
    let component_id = config
        .component_id
        .as_known()
        .cloned()
        .ok_or(TranslationError::MissingIdentifier("component_id"))?;
    let id = config
        .configuration_id
        .as_known()
        .cloned()
        .ok_or(TranslationError::MissingIdentifier("configuration_id"))?;

    Ok(ConfigKey {
        branch_id,
        component_id,
        id,
    })
}

impl Configuration {
    /// Fill attributes left to the remote from the persisted snapshot
    ///
    /// Rows without an id take the id of the persisted row with the same
    /// name. Audit comments are never inherited so every write stamps its own.
    pub fn inherit_computed(&mut self, persisted: &Self) {
        self.id.inherit(&persisted.id);
        self.branch_id.inherit(&persisted.branch_id);
        self.configuration_id.inherit(&persisted.configuration_id);
        self.description.inherit(&persisted.description);
        self.is_disabled.inherit(&persisted.is_disabled);
        self.is_deleted.inherit(&persisted.is_deleted);
        self.created.inherit(&persisted.created);
        self.version.inherit(&persisted.version);
        self.configuration.inherit(&persisted.configuration);

        match (&mut self.rows, &persisted.rows) {
            (Field::Known(rows), Field::Known(previous)) => adopt_rows(rows, previous),
            (rows, previous) => rows.inherit(previous),
        }
    }
}

fn adopt_rows(rows: &mut [ConfigurationRow], previous: &[ConfigurationRow]) {
    let mut claimed: HashSet<String> = rows
        .iter()
        .filter_map(|row| row.id.as_known().cloned())
        .collect();

    for row in rows.iter_mut() {
        if row.id.is_absent()
            && let Some(name) = row.name.as_known()
            && let Some(id) = previous
                .iter()
                .filter(|p| p.name.as_known() == Some(name))
                .filter_map(|p| p.id.as_known())
                .find(|id| !claimed.contains(*id))
        {
            claimed.insert(id.clone());
            row.id = Field::Known(id.clone());
        }

        let Some(prior) = previous
            .iter()
            .find(|p| p.id.is_known() && p.id == row.id)
        else {
            continue;
        };
        row.description.inherit(&prior.description);
        row.is_disabled.inherit(&prior.is_disabled);
        row.version.inherit(&prior.version);
        row.state.inherit(&prior.state);
        row.configuration_row.inherit(&prior.configuration_row);
    }
}

/// The `configuration` entity kind
#[derive(Debug, Default)]
pub struct ConfigurationKind {
    mapper: ConfigurationMapper,
    rows: RowCollection,
}

impl ConfigurationKind {
    /// `pretty` stores payloads in the tab-indented display encoding
    pub fn new(pretty: bool) -> Self {
        Self {
            mapper: ConfigurationMapper::new(pretty),
            rows: RowCollection::new(pretty),
        }
    }
}

impl EntityKind for ConfigurationKind {
    type Mapper = ConfigurationMapper;
    type Client = Api;

    fn name(&self) -> &'static str {
        "configuration"
    }

    fn mapper(&self) -> &ConfigurationMapper {
        &self.mapper
    }

    fn nested(&self) -> Option<&dyn NestedCollection<Configuration, Api>> {
        Some(&self.rows)
    }

    fn create(&self, client: &Api, mut request: Config) -> RemoteResult<Config> {
        if request.branch_id.is_none() {
            let branch = client.default_branch()?;
            log::debug!("Resolved default branch {:?}", branch.id);
            request.branch_id = branch.id;
        }
        client.create_config(&request)
    }

    fn read(&self, client: &Api, persisted: &Configuration) -> RemoteResult<Config> {
        client.get_config(&config_key(persisted)?)
    }

    fn update(
        &self,
        client: &Api,
        persisted: &Configuration,
        request: Config,
    ) -> RemoteResult<Config> {
        client.update_config(&config_key(persisted)?, &request)
    }

    fn delete(&self, client: &Api, persisted: &Configuration) -> RemoteResult<()> {
        match client.delete_config(&config_key(persisted)?) {
            Err(err) if err.is_not_found() => {
                log::warn!(
                    "Configuration {} is already gone",
                    persisted.id.as_str()
                );
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::{DEFAULT_BRANCH, MemoryStorage};
    use declarative::{Lifecycle, Outcome, Persist};

    fn row(name: &str) -> ConfigurationRow {
        ConfigurationRow {
            name: Field::Known(name.to_string()),
            configuration_row: Field::Known(format!(r#"{{"row":"{name}"}}"#)),
            ..ConfigurationRow::default()
        }
    }

    fn desired(rows: Vec<ConfigurationRow>) -> Configuration {
        Configuration {
            component_id: Field::Known("keboola.ex-http".to_string()),
            name: Field::Known("Extractor".to_string()),
            configuration: Field::Known(r#"{"parameters":{"z":1,"a":2}}"#.to_string()),
            rows: Field::Known(rows),
            ..Configuration::default()
        }
    }

    fn stored(outcome: &Outcome<Configuration>) -> &Configuration {
        outcome.snapshot().expect("outcome should persist a snapshot")
    }

    fn names(config: &Configuration) -> Vec<&str> {
        config
            .rows
            .as_known()
            .map(|rows| rows.iter().map(|r| r.name.as_str()).collect())
            .unwrap_or_default()
    }

    fn row_ids(config: &Configuration) -> Vec<String> {
        config
            .rows
            .as_known()
            .map(|rows| rows.iter().map(|r| r.id.as_str().to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_inherit_computed_adopts_rows_by_name() {
        let persisted = Configuration {
            id: Field::Known("1/keboola.ex-http/9".into()),
            configuration_id: Field::Known("9".into()),
            configuration: Field::Known("{}".into()),
            change_description: Field::Known(CREATED_BY.into()),
            rows: Field::Known(vec![
                ConfigurationRow {
                    id: Field::Known("10".into()),
                    ..row("First")
                },
                ConfigurationRow {
                    id: Field::Known("11".into()),
                    ..row("Second")
                },
            ]),
            ..desired(vec![])
        };

        let mut first = row("First");
        first.id = Field::Unknown;
        first.configuration_row = Field::Unknown;
        let mut third = row("Third");
        third.id = Field::Unknown;

        let mut manifest = Configuration {
            id: Field::Unknown,
            configuration_id: Field::Unknown,
            configuration: Field::Unknown,
            change_description: Field::Unknown,
            ..desired(vec![third, first])
        };
        manifest.inherit_computed(&persisted);

        assert_eq!(manifest.id.as_str(), "1/keboola.ex-http/9");
        assert_eq!(manifest.configuration.as_str(), "{}");
        assert!(manifest.change_description.is_unknown());

        let rows = manifest.rows.value();
        assert!(rows[0].id.is_unknown());
        assert_eq!(rows[1].id.as_str(), "10");
        assert_eq!(rows[1].configuration_row.as_str(), r#"{"row":"First"}"#);
    }

    #[test]
    fn test_create_resolves_default_branch() {
        let storage = MemoryStorage::new();
        let client: &Api = &storage;
        let kind = ConfigurationKind::default();

        let outcome = Lifecycle::new(&kind, client).create(&desired(vec![]));
        assert!(outcome.is_success(), "{:?}", outcome.diagnostics);

        let created = stored(&outcome);
        assert_eq!(created.branch_id, Field::Known(DEFAULT_BRANCH));
        let key = config_key(created).unwrap();
        assert_eq!(created.id.as_str(), key.compound_id());
        assert_eq!(created.change_description.as_str(), CREATED_BY);
        assert_eq!(created.version, Field::Known(1));
        assert_eq!(
            created.configuration.as_str(),
            r#"{"parameters":{"z":1,"a":2}}"#
        );
    }

    #[test]
    fn test_row_lifecycle_keeps_user_order() {
        let storage = MemoryStorage::new();
        let client: &Api = &storage;
        let kind = ConfigurationKind::default();
        let engine = Lifecycle::new(&kind, client);

        // Create with two rows
        let outcome = engine.create(&desired(vec![row("First"), row("Second")]));
        assert!(outcome.is_success(), "{:?}", outcome.diagnostics);
        let created = stored(&outcome).clone();
        assert_eq!(names(&created), vec!["First", "Second"]);
        let ids = row_ids(&created);
        assert!(ids.iter().all(|id| !id.is_empty()));

        // Reorder, renaming the second row
        let mut reordered = created.clone();
        let mut rows = created.rows.value();
        rows.swap(0, 1);
        rows[0].name = Field::Known("Second-updated".to_string());
        reordered.rows = Field::Known(rows);

        let outcome = engine.update(&created, &reordered);
        assert!(outcome.is_success(), "{:?}", outcome.diagnostics);
        let updated = stored(&outcome).clone();
        assert_eq!(names(&updated), vec!["Second-updated", "First"]);
        assert_eq!(row_ids(&updated), vec![ids[1].clone(), ids[0].clone()]);
        assert_eq!(updated.change_description.as_str(), UPDATED_BY);

        let key = config_key(&updated).unwrap();
        let remote: Vec<String> = storage.rows(&key).into_iter().map(|r| r.name).collect();
        assert_eq!(remote, vec!["Second-updated", "First"]);

        // Drop the first row; no sort order is sent
        let mut shrunk = updated.clone();
        shrunk.rows = Field::Known(vec![updated.rows.value()[1].clone()]);
        let calls_before = storage.calls().len();

        let outcome = engine.update(&updated, &shrunk);
        assert!(outcome.is_success(), "{:?}", outcome.diagnostics);
        assert_eq!(names(stored(&outcome)), vec!["First"]);
        assert!(
            !storage.calls()[calls_before..].contains(&"set_rows_sort_order".to_string())
        );
        assert_eq!(storage.rows(&key).len(), 1);
    }

    #[test]
    fn test_immutable_component_aborts_without_calls() {
        let storage = MemoryStorage::new();
        let client: &Api = &storage;
        let kind = ConfigurationKind::default();
        let engine = Lifecycle::new(&kind, client);

        let created = stored(&engine.create(&desired(vec![]))).clone();
        let calls_before = storage.calls().len();

        let mut changed = created.clone();
        changed.component_id = Field::Known("keboola.wr-db".to_string());
        let outcome = engine.update(&created, &changed);

        assert_eq!(outcome.persist, Persist::Keep);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics.has_error());
        assert_eq!(storage.calls().len(), calls_before);
    }

    #[test]
    fn test_malformed_payload_aborts() {
        let storage = MemoryStorage::new();
        let client: &Api = &storage;
        let kind = ConfigurationKind::default();

        let mut bad = desired(vec![]);
        bad.configuration = Field::Known("{not json".to_string());
        let outcome = Lifecycle::new(&kind, client).create(&bad);

        assert_eq!(outcome.persist, Persist::Keep);
        assert!(outcome.diagnostics.has_error());
        assert!(storage.calls().is_empty());
    }

    #[test]
    fn test_read_reports_remote_change() {
        let storage = MemoryStorage::new();
        let client: &Api = &storage;
        let kind = ConfigurationKind::default();
        let engine = Lifecycle::new(&kind, client);

        let created = stored(&engine.create(&desired(vec![row("Only")]))).clone();
        let key = config_key(&created).unwrap();
        storage.edit_config(&key, |config| {
            config.content = content::decode(r#"{"parameters":{"changed":true}}"#).unwrap();
        });

        let outcome = engine.read(&created);
        assert!(outcome.is_success());
        assert_eq!(outcome.diagnostics.warnings().count(), 1);

        let refreshed = stored(&outcome);
        assert_eq!(
            refreshed.configuration.as_str(),
            r#"{"parameters":{"changed":true}}"#
        );
        assert_eq!(names(refreshed), vec!["Only"]);
    }

    #[test]
    fn test_rows_failure_keeps_parent() {
        let storage = MemoryStorage::new();
        let client: &Api = &storage;
        let kind = ConfigurationKind::default();
        storage.fail_next("create_row");

        let outcome = Lifecycle::new(&kind, client).create(&desired(vec![row("First")]));

        assert_eq!(outcome.diagnostics.errors().count(), 1);
        let created = stored(&outcome);
        assert!(config_key(created).is_ok());
        assert!(created.rows.is_unset());
    }

    #[test]
    fn test_delete_removes_remote() {
        let storage = MemoryStorage::new();
        let client: &Api = &storage;
        let kind = ConfigurationKind::default();
        let engine = Lifecycle::new(&kind, client);

        let created = stored(&engine.create(&desired(vec![]))).clone();
        let outcome = engine.delete(&created);

        assert_eq!(outcome.persist, Persist::Remove);
        let key = config_key(&created).unwrap();
        assert!(client.get_config(&key).unwrap_err().is_not_found());
    }

    #[test]
    fn test_config_key_requires_identifiers() {
        let config = Configuration {
            branch_id: Field::Known(1),
            component_id: Field::Known("keboola.ex-http".to_string()),
            ..Configuration::default()
        };
        assert_eq!(
            config_key(&config),
            Err(TranslationError::MissingIdentifier("configuration_id"))
        );
    }
}
