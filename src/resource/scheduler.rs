//! Schedules activated for a configuration
//!
//! The scheduler service has no update call; activating again replaces the
//! schedule for the configuration.

use crate::remote::{Api, Schedule};
use declarative::{
    Diagnostics, EntityKind, EntityMapper, Field, RemoteResult, TranslationError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scheduler {
    pub id: Field<String>,
    pub config_id: Field<String>,
    pub configuration_version: Field<String>,
}

fn schedule_id(scheduler: &Scheduler) -> Result<&str, TranslationError> {
    scheduler
        .id
        .as_known()
        .map(String::as_str)
        .ok_or(TranslationError::MissingIdentifier("id"))
}

#[derive(Debug, Default)]
pub struct SchedulerMapper;

impl EntityMapper for SchedulerMapper {
    type Local = Scheduler;
    type Remote = Schedule;

    fn hydrate(&self, remote: &Schedule, local: &mut Scheduler) -> Diagnostics {
        local.id = remote.id.clone().into();
        local.config_id = Field::Known(remote.config_id.clone());
        local.configuration_version = Field::Known(remote.configuration_version.clone());
        Diagnostics::new()
    }

    fn materialize(
        &self,
        persisted: &Scheduler,
        desired: &Scheduler,
    ) -> Result<Schedule, TranslationError> {
        Ok(Schedule {
            id: persisted.id.as_known().cloned(),
            config_id: desired.config_id.value(),
            configuration_version: desired.configuration_version.value(),
        })
    }

    fn validate(&self, _persisted: Option<&Scheduler>, desired: &mut Scheduler) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        if desired.config_id.is_blank() {
            diagnostics.add_error("Error validating scheduler", "Config ID is required");
        }
        diagnostics
    }
}

#[derive(Debug, Default)]
pub struct SchedulerKind {
    mapper: SchedulerMapper,
}

impl EntityKind for SchedulerKind {
    type Mapper = SchedulerMapper;
    type Client = Api;

    fn name(&self) -> &'static str {
        "scheduler"
    }

    fn mapper(&self) -> &SchedulerMapper {
        &self.mapper
    }

    fn create(&self, client: &Api, request: Schedule) -> RemoteResult<Schedule> {
        client.activate_schedule(&request.config_id, &request.configuration_version)
    }

    fn read(&self, client: &Api, persisted: &Scheduler) -> RemoteResult<Schedule> {
        client.get_schedule(schedule_id(persisted)?)
    }

    fn update(
        &self,
        client: &Api,
        _persisted: &Scheduler,
        request: Schedule,
    ) -> RemoteResult<Schedule> {
        client.activate_schedule(&request.config_id, &request.configuration_version)
    }

    fn delete(&self, client: &Api, persisted: &Scheduler) -> RemoteResult<()> {
        client.delete_schedule(schedule_id(persisted)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryStorage;
    use declarative::{Lifecycle, Persist};

    fn schedule(config_id: &str) -> Scheduler {
        Scheduler {
            id: Field::Unknown,
            config_id: Field::Known(config_id.to_string()),
            configuration_version: Field::Unknown,
        }
    }

    #[test]
    fn test_activate_and_delete() {
        let storage = MemoryStorage::new();
        let client: &Api = &storage;
        let kind = SchedulerKind::default();
        let engine = Lifecycle::new(&kind, client);

        let created = engine.create(&schedule("321")).snapshot().unwrap().clone();
        assert!(created.id.is_known());
        assert_eq!(created.config_id.as_str(), "321");
        assert_eq!(created.configuration_version, Field::Known(String::new()));

        let read = engine.read(&created);
        assert_eq!(read.snapshot(), Some(&created));

        assert_eq!(engine.delete(&created).persist, Persist::Remove);
        assert!(engine.read(&created).diagnostics.has_error());
    }

    #[test]
    fn test_config_id_required() {
        let storage = MemoryStorage::new();
        let client: &Api = &storage;
        let kind = SchedulerKind::default();

        let outcome = Lifecycle::new(&kind, client).create(&schedule(""));
        assert_eq!(outcome.persist, Persist::Keep);
        assert_eq!(outcome.diagnostics.errors().count(), 1);
    }
}
