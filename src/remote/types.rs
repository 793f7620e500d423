//! Remote models returned by the Storage API family
//!
//! These are the canonical remote representations. They only become local
//! snapshots through an entity mapper.

use content::OrderedMap;

/// Identifies one component configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    pub branch_id: i64,
    pub component_id: String,
    pub id: String,
}

impl ConfigKey {
    /// Compound identifier `{branch}/{component}/{config}`
    pub fn compound_id(&self) -> String {
        format!("{}/{}/{}", self.branch_id, self.component_id, self.id)
    }
}

/// A component configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// `None` asks for the project's default branch
    pub branch_id: Option<i64>,
    pub component_id: String,
    /// `None` lets the remote assign an identifier
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub change_description: String,
    pub is_disabled: bool,
    pub is_deleted: bool,
    pub version: i64,
    pub created: String,
    pub content: OrderedMap,
}

impl Config {
    /// Key of a configuration whose branch and identifier are resolved
    pub fn key(&self) -> Option<ConfigKey> {
        Some(ConfigKey {
            branch_id: self.branch_id?,
            component_id: self.component_id.clone(),
            id: self.id.clone()?,
        })
    }
}

/// One row of a configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigRow {
    /// `None` while the row is pending creation
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub change_description: String,
    pub is_disabled: bool,
    pub version: i64,
    pub state: OrderedMap,
    pub content: OrderedMap,
}

/// A development branch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branch {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub is_default: bool,
}

/// One metadata entry attached to a branch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataEntry {
    pub branch_id: i64,
    /// Empty until the remote assigns one
    pub id: String,
    pub key: String,
    pub value: String,
}

/// A value to encrypt for a component, and its ciphertext once encrypted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secret {
    pub component_id: String,
    pub value: String,
    pub encrypted: String,
}

/// A schedule activated for a configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub id: Option<String>,
    pub config_id: String,
    pub configuration_version: String,
}
