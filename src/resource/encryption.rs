//! Encrypted values
//!
//! An encryption entity only exists locally: creating it asks the remote to
//! encrypt `value` for a component and stores the ciphertext. There is no
//! remote record to read or delete, so those operations answer with the
//! stateless sentinel. An update with an empty `value` does the same and
//! keeps the stored ciphertext.

use crate::remote::{Api, Secret};
use declarative::{
    Diagnostics, EntityKind, EntityMapper, Field, RemoteError, RemoteResult, TranslationError,
};
use serde::{Deserialize, Serialize};

/// Identifier of every encryption entity
pub const ENCRYPTION_ID: &str = "none";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Encryption {
    pub id: Field<String>,
    pub component_id: Field<String>,
    /// Plain text; write-only
    pub value: Field<String>,
    pub encrypted_value: Field<String>,
}

#[derive(Debug, Default)]
pub struct EncryptionMapper;

impl EntityMapper for EncryptionMapper {
    type Local = Encryption;
    type Remote = Secret;

    fn hydrate(&self, remote: &Secret, local: &mut Encryption) -> Diagnostics {
        local.id = Field::Known(ENCRYPTION_ID.to_string());
        local.component_id = Field::Known(remote.component_id.clone());
        local.encrypted_value = Field::Known(remote.encrypted.clone());
        Diagnostics::new()
    }

    fn materialize(
        &self,
        persisted: &Encryption,
        desired: &Encryption,
    ) -> Result<Secret, TranslationError> {
        let component_id = desired
            .component_id
            .clone()
            .or(persisted.component_id.clone())
            .into_known()
            .ok_or(TranslationError::MissingIdentifier("component_id"))?;

        Ok(Secret {
            component_id,
            value: desired.value.value(),
            encrypted: String::new(),
        })
    }

    fn validate(&self, persisted: Option<&Encryption>, desired: &mut Encryption) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if desired.component_id.is_blank() {
            diagnostics.add_error(
                "Error validating encryption",
                "Component ID is required",
            );
        }
        if persisted.is_none() {
            desired.id.resolve_unknown(|| ENCRYPTION_ID.to_string());
        }

        diagnostics
    }

    fn carry_forward(&self, persisted: &Encryption, desired: &mut Encryption) {
        desired.id = persisted.id.clone();
        desired.encrypted_value = persisted.encrypted_value.clone();
    }
}

#[derive(Debug, Default)]
pub struct EncryptionKind {
    mapper: EncryptionMapper,
}

impl EntityKind for EncryptionKind {
    type Mapper = EncryptionMapper;
    type Client = Api;

    fn name(&self) -> &'static str {
        "encryption"
    }

    fn mapper(&self) -> &EncryptionMapper {
        &self.mapper
    }

    fn create(&self, client: &Api, request: Secret) -> RemoteResult<Secret> {
        let encrypted = client.encrypt(&request.component_id, &request.value)?;
        Ok(Secret {
            encrypted,
            ..request
        })
    }

    fn read(&self, _client: &Api, _persisted: &Encryption) -> RemoteResult<Secret> {
        Err(RemoteError::Stateless)
    }

    fn update(
        &self,
        client: &Api,
        _persisted: &Encryption,
        request: Secret,
    ) -> RemoteResult<Secret> {
        if request.value.is_empty() {
            return Err(RemoteError::Stateless);
        }
        self.create(client, request)
    }

    fn delete(&self, _client: &Api, _persisted: &Encryption) -> RemoteResult<()> {
        Err(RemoteError::Stateless)
    }
}
