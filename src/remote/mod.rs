//! Remote collaborator for entity lifecycles
//!
//! [`StorageApi`] lists every remote operation the entity kinds need.
//! [`http::HttpStorage`] talks to a Keboola stack; [`memory::MemoryStorage`]
//! keeps everything in process for tests.

pub mod http;
#[cfg(test)]
pub mod memory;
pub mod types;

use declarative::RemoteResult;

pub use types::{Branch, Config, ConfigKey, ConfigRow, MetadataEntry, Schedule, Secret};

/// Remote operations, one method per API call
pub trait StorageApi: Send + Sync {
    // ------------------------------------------------------------------------
    // Configurations
    // ------------------------------------------------------------------------

    /// The project's default branch
    fn default_branch(&self) -> RemoteResult<Branch>;

    /// Create a configuration; `config.branch_id` must be resolved
    fn create_config(&self, config: &Config) -> RemoteResult<Config>;

    fn get_config(&self, key: &ConfigKey) -> RemoteResult<Config>;

    fn update_config(&self, key: &ConfigKey, config: &Config) -> RemoteResult<Config>;

    fn delete_config(&self, key: &ConfigKey) -> RemoteResult<()>;

    // ------------------------------------------------------------------------
    // Configuration rows
    // ------------------------------------------------------------------------

    fn list_rows(&self, key: &ConfigKey) -> RemoteResult<Vec<ConfigRow>>;

    fn create_row(&self, key: &ConfigKey, row: &ConfigRow) -> RemoteResult<ConfigRow>;

    /// Update the row identified by `row.id`
    fn update_row(&self, key: &ConfigKey, row: &ConfigRow) -> RemoteResult<ConfigRow>;

    fn delete_row(&self, key: &ConfigKey, row_id: &str) -> RemoteResult<()>;

    fn set_rows_sort_order(&self, key: &ConfigKey, order: &[String]) -> RemoteResult<()>;

    // ------------------------------------------------------------------------
    // Branches
    // ------------------------------------------------------------------------

    fn create_branch(&self, branch: &Branch) -> RemoteResult<Branch>;

    fn get_branch(&self, id: i64) -> RemoteResult<Branch>;

    fn update_branch(&self, id: i64, branch: &Branch) -> RemoteResult<Branch>;

    fn delete_branch(&self, id: i64) -> RemoteResult<()>;

    /// Append (or overwrite) one key and return the branch's full metadata
    fn append_branch_metadata(
        &self,
        branch_id: i64,
        key: &str,
        value: &str,
    ) -> RemoteResult<Vec<MetadataEntry>>;

    fn list_branch_metadata(&self, branch_id: i64) -> RemoteResult<Vec<MetadataEntry>>;

    fn delete_branch_metadata(&self, branch_id: i64, metadata_id: &str) -> RemoteResult<()>;

    // ------------------------------------------------------------------------
    // Encryption and scheduling
    // ------------------------------------------------------------------------

    /// Encrypt `value` for `component_id`, returning the ciphertext
    fn encrypt(&self, component_id: &str, value: &str) -> RemoteResult<String>;

    fn activate_schedule(&self, config_id: &str, configuration_version: &str)
    -> RemoteResult<Schedule>;

    fn get_schedule(&self, id: &str) -> RemoteResult<Schedule>;

    fn delete_schedule(&self, id: &str) -> RemoteResult<()>;
}

/// Shared remote handle passed to every entity kind
pub type Api = dyn StorageApi;
