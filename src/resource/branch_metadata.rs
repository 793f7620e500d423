//! Key/value metadata attached to a branch
//!
//! The remote appends metadata without returning the entry it wrote, so the
//! identifier is looked up by key afterwards.

use crate::remote::{Api, MetadataEntry};
use declarative::{
    Diagnostics, EntityKind, EntityMapper, Field, RemoteError, RemoteResult, TranslationError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchMetadata {
    pub id: Field<String>,
    pub branch_id: Field<i64>,
    pub key: Field<String>,
    pub value: Field<String>,
}

fn find_by_key(entries: Vec<MetadataEntry>, key: &str) -> RemoteResult<MetadataEntry> {
    // The last entry wins when the remote reports a key twice
    entries
        .into_iter()
        .rev()
        .find(|entry| entry.key == key)
        .ok_or_else(|| RemoteError::Protocol("failed to find metadata id".into()))
}

fn branch_of(metadata: &BranchMetadata) -> Result<i64, TranslationError> {
    metadata
        .branch_id
        .as_known()
        .copied()
        .ok_or(TranslationError::MissingIdentifier("branch_id"))
}

#[derive(Debug, Default)]
pub struct BranchMetadataMapper;

impl EntityMapper for BranchMetadataMapper {
    type Local = BranchMetadata;
    type Remote = MetadataEntry;

    fn hydrate(&self, remote: &MetadataEntry, local: &mut BranchMetadata) -> Diagnostics {
        local.id = Field::Known(remote.id.clone());
        local.branch_id = Field::Known(remote.branch_id);
        local.key = Field::Known(remote.key.clone());
        local.value = Field::Known(remote.value.clone());
        Diagnostics::new()
    }

    fn materialize(
        &self,
        persisted: &BranchMetadata,
        desired: &BranchMetadata,
    ) -> Result<MetadataEntry, TranslationError> {
        let branch_id = branch_of(desired).or_else(|_| branch_of(persisted))?;
        Ok(MetadataEntry {
            branch_id,
            id: persisted.id.value(),
            key: desired.key.value(),
            value: desired.value.value(),
        })
    }

    fn validate(
        &self,
        persisted: Option<&BranchMetadata>,
        desired: &mut BranchMetadata,
    ) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if desired.branch_id.is_absent() {
            diagnostics.add_error("Error validating metadata", "Branch ID is required");
        }
        if desired.key.is_blank() {
            diagnostics.add_error("Error validating metadata", "Key is required");
        }
        if desired.value.is_absent() {
            diagnostics.add_error("Error validating metadata", "Value is required");
        }

        if let Some(persisted) = persisted {
            if desired.key.is_known() && desired.key != persisted.key {
                diagnostics.add_error(
                    "Invalid key",
                    "Cannot change key after metadata is created",
                );
            }
            if desired.branch_id.is_known() && desired.branch_id != persisted.branch_id {
                diagnostics.add_error(
                    "Invalid branch_id",
                    "Cannot change branch_id after metadata is created",
                );
            }
        }

        diagnostics
    }
}

#[derive(Debug, Default)]
pub struct BranchMetadataKind {
    mapper: BranchMetadataMapper,
}

impl BranchMetadataKind {
    fn write(&self, client: &Api, request: &MetadataEntry) -> RemoteResult<MetadataEntry> {
        let entries =
            client.append_branch_metadata(request.branch_id, &request.key, &request.value)?;
        find_by_key(entries, &request.key)
    }
}

impl EntityKind for BranchMetadataKind {
    type Mapper = BranchMetadataMapper;
    type Client = Api;

    fn name(&self) -> &'static str {
        "branch_metadata"
    }

    fn mapper(&self) -> &BranchMetadataMapper {
        &self.mapper
    }

    fn create(&self, client: &Api, request: MetadataEntry) -> RemoteResult<MetadataEntry> {
        self.write(client, &request)
    }

    fn read(&self, client: &Api, persisted: &BranchMetadata) -> RemoteResult<MetadataEntry> {
        let entries = client.list_branch_metadata(branch_of(persisted)?)?;
        let id = persisted.id.as_str();

        if !id.is_empty()
            && let Some(entry) = entries.iter().find(|entry| entry.id == id)
        {
            return Ok(entry.clone());
        }
        find_by_key(entries, persisted.key.as_str()).map_err(|_| RemoteError::Status {
            status: 404,
            message: format!("metadata `{}` not found", persisted.key.as_str()),
        })
    }

    fn update(
        &self,
        client: &Api,
        _persisted: &BranchMetadata,
        request: MetadataEntry,
    ) -> RemoteResult<MetadataEntry> {
        self.write(client, &request)
    }

    fn delete(&self, client: &Api, persisted: &BranchMetadata) -> RemoteResult<()> {
        let id = persisted
            .id
            .as_known()
            .ok_or(TranslationError::MissingIdentifier("id"))?;
        client.delete_branch_metadata(branch_of(persisted)?, id)
    }
}
