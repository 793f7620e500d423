//! Blocking HTTP client for a Keboola stack
//!
//! Storage calls go to `{host}/v2/storage/...` with the token in
//! `X-StorageApi-Token`. The encryption and scheduler services live on
//! sibling hosts derived from the `connection.` host, e.g.
//! `https://connection.keboola.com` -> `https://scheduler.keboola.com`.
//!
//! Dev-branch creation and deletion run as storage jobs; those calls wait
//! for the job to finish before returning.

use super::{Branch, Config, ConfigKey, ConfigRow, MetadataEntry, Schedule, StorageApi};
use content::OrderedMap;
use declarative::{RemoteError, RemoteResult};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use std::thread;
use std::time::Duration;

const TOKEN_HEADER: &str = "X-StorageApi-Token";

/// Delay between storage job status checks
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Give up on a storage job after this many checks
const JOB_POLL_ATTEMPTS: u32 = 240;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type HttpResult = Result<ureq::http::Response<ureq::Body>, ureq::Error>;

/// [`StorageApi`] over HTTP
pub struct HttpStorage {
    agent: ureq::Agent,
    host: String,
    token: String,
}

impl HttpStorage {
    pub fn new(host: &str, token: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            host: host.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/v2/storage/{path}", self.host)
    }

    fn service_url(&self, service: &str, path: &str) -> String {
        format!("{}/{path}", service_host(&self.host, service))
    }

    fn configs_url(&self, branch_id: i64, component_id: &str) -> String {
        self.storage_url(&format!(
            "branch/{branch_id}/components/{component_id}/configs"
        ))
    }

    fn config_url(&self, key: &ConfigKey) -> String {
        format!("{}/{}", self.configs_url(key.branch_id, &key.component_id), key.id)
    }

    // ========================================================================
    // Request helpers
    // ========================================================================

    fn get<T: DeserializeOwned>(&self, url: &str) -> RemoteResult<T> {
        log::debug!("GET {url}");
        read_json(
            self.agent
                .get(url)
                .header(TOKEN_HEADER, self.token.as_str())
                .call(),
        )
    }

    fn post_form<T: DeserializeOwned>(&self, url: &str, form: &[(&str, String)]) -> RemoteResult<T> {
        log::debug!("POST {url}");
        read_json(
            self.agent
                .post(url)
                .header(TOKEN_HEADER, self.token.as_str())
                .send_form(form.iter().map(|(k, v)| (*k, v.as_str()))),
        )
    }

    fn put_form<T: DeserializeOwned>(&self, url: &str, form: &[(&str, String)]) -> RemoteResult<T> {
        log::debug!("PUT {url}");
        read_json(
            self.agent
                .put(url)
                .header(TOKEN_HEADER, self.token.as_str())
                .send_form(form.iter().map(|(k, v)| (*k, v.as_str()))),
        )
    }

    fn delete(&self, url: &str) -> RemoteResult<()> {
        log::debug!("DELETE {url}");
        expect_success(
            self.agent
                .delete(url)
                .header(TOKEN_HEADER, self.token.as_str())
                .call(),
        )
    }

    /// Poll a storage job until it succeeds, returning its results
    fn wait_for_job(&self, mut job: ApiJob) -> RemoteResult<Value> {
        for _ in 0..JOB_POLL_ATTEMPTS {
            match job.status.as_str() {
                "success" => return Ok(job.results),
                "error" => {
                    let message = job.error.map(|e| e.message).unwrap_or_default();
                    return Err(RemoteError::Protocol(format!(
                        "storage job {} failed: {message}",
                        job.id
                    )));
                }
                status => {
                    log::trace!("Storage job {} is {status}", job.id);
                    thread::sleep(JOB_POLL_INTERVAL);
                    job = self.get(&self.storage_url(&format!("jobs/{}", job.id)))?;
                }
            }
        }

        Err(RemoteError::Protocol(format!(
            "storage job {} did not finish in time",
            job.id
        )))
    }

    fn project_id(&self) -> RemoteResult<i64> {
        let token: ApiToken = self.get(&self.storage_url("tokens/verify"))?;
        Ok(token.owner.id)
    }
}

impl StorageApi for HttpStorage {
    fn default_branch(&self) -> RemoteResult<Branch> {
        let branches: Vec<ApiBranch> = self.get(&self.storage_url("dev-branches"))?;
        branches
            .into_iter()
            .find(|b| b.is_default)
            .map(Branch::from)
            .ok_or_else(|| RemoteError::Protocol("project has no default branch".into()))
    }

    fn create_config(&self, config: &Config) -> RemoteResult<Config> {
        let branch_id = config
            .branch_id
            .ok_or_else(|| RemoteError::Protocol("configuration branch is not resolved".into()))?;

        let mut form = config_form(config);
        if let Some(id) = &config.id {
            form.push(("configurationId", id.clone()));
        }

        let created: ApiConfig =
            self.post_form(&self.configs_url(branch_id, &config.component_id), &form)?;
        created.into_config(branch_id, &config.component_id)
    }

    fn get_config(&self, key: &ConfigKey) -> RemoteResult<Config> {
        let config: ApiConfig = self.get(&self.config_url(key))?;
        config.into_config(key.branch_id, &key.component_id)
    }

    fn update_config(&self, key: &ConfigKey, config: &Config) -> RemoteResult<Config> {
        let updated: ApiConfig = self.put_form(&self.config_url(key), &config_form(config))?;
        updated.into_config(key.branch_id, &key.component_id)
    }

    fn delete_config(&self, key: &ConfigKey) -> RemoteResult<()> {
        self.delete(&self.config_url(key))
    }

    fn list_rows(&self, key: &ConfigKey) -> RemoteResult<Vec<ConfigRow>> {
        let rows: Vec<ApiRow> = self.get(&format!("{}/rows", self.config_url(key)))?;
        rows.into_iter().map(ConfigRow::try_from).collect()
    }

    fn create_row(&self, key: &ConfigKey, row: &ConfigRow) -> RemoteResult<ConfigRow> {
        let created: ApiRow =
            self.post_form(&format!("{}/rows", self.config_url(key)), &row_form(row))?;
        created.try_into()
    }

    fn update_row(&self, key: &ConfigKey, row: &ConfigRow) -> RemoteResult<ConfigRow> {
        let row_id = row
            .id
            .as_deref()
            .ok_or_else(|| RemoteError::Protocol("row update without an identifier".into()))?;
        let url = format!("{}/rows/{row_id}", self.config_url(key));
        let updated: ApiRow = self.put_form(&url, &row_form(row))?;
        updated.try_into()
    }

    fn delete_row(&self, key: &ConfigKey, row_id: &str) -> RemoteResult<()> {
        self.delete(&format!("{}/rows/{row_id}", self.config_url(key)))
    }

    fn set_rows_sort_order(&self, key: &ConfigKey, order: &[String]) -> RemoteResult<()> {
        let form: Vec<(&str, String)> = order
            .iter()
            .map(|id| ("rowsSortOrder[]", id.clone()))
            .collect();
        let _: Value = self.put_form(&self.config_url(key), &form)?;
        Ok(())
    }

    fn create_branch(&self, branch: &Branch) -> RemoteResult<Branch> {
        let form = [
            ("name", branch.name.clone()),
            ("description", branch.description.clone()),
        ];
        let job: ApiJob = self.post_form(&self.storage_url("dev-branches"), &form)?;
        let results = self.wait_for_job(job)?;

        serde_json::from_value::<ApiBranch>(results)
            .map(Branch::from)
            .map_err(|e| RemoteError::Protocol(format!("unexpected branch job result: {e}")))
    }

    fn get_branch(&self, id: i64) -> RemoteResult<Branch> {
        let branch: ApiBranch = self.get(&self.storage_url(&format!("dev-branches/{id}")))?;
        Ok(branch.into())
    }

    fn update_branch(&self, id: i64, branch: &Branch) -> RemoteResult<Branch> {
        let form = [
            ("name", branch.name.clone()),
            ("description", branch.description.clone()),
        ];
        let updated: ApiBranch =
            self.put_form(&self.storage_url(&format!("dev-branches/{id}")), &form)?;
        Ok(updated.into())
    }

    fn delete_branch(&self, id: i64) -> RemoteResult<()> {
        let url = self.storage_url(&format!("dev-branches/{id}"));
        log::debug!("DELETE {url}");
        let job: ApiJob = read_json(
            self.agent
                .delete(&url)
                .header(TOKEN_HEADER, self.token.as_str())
                .call(),
        )?;
        self.wait_for_job(job).map(|_| ())
    }

    fn append_branch_metadata(
        &self,
        branch_id: i64,
        key: &str,
        value: &str,
    ) -> RemoteResult<Vec<MetadataEntry>> {
        let form = [
            ("metadata[0][key]", key.to_string()),
            ("metadata[0][value]", value.to_string()),
        ];
        let entries: Vec<ApiMetadata> = self.post_form(
            &self.storage_url(&format!("branch/{branch_id}/metadata")),
            &form,
        )?;
        Ok(entries.into_iter().map(|m| m.into_entry(branch_id)).collect())
    }

    fn list_branch_metadata(&self, branch_id: i64) -> RemoteResult<Vec<MetadataEntry>> {
        let entries: Vec<ApiMetadata> =
            self.get(&self.storage_url(&format!("branch/{branch_id}/metadata")))?;
        Ok(entries.into_iter().map(|m| m.into_entry(branch_id)).collect())
    }

    fn delete_branch_metadata(&self, branch_id: i64, metadata_id: &str) -> RemoteResult<()> {
        self.delete(&self.storage_url(&format!(
            "branch/{branch_id}/metadata/{metadata_id}"
        )))
    }

    fn encrypt(&self, component_id: &str, value: &str) -> RemoteResult<String> {
        let project_id = self.project_id()?;
        let url = self.service_url("encryption", "encrypt");
        log::debug!("POST {url} (component {component_id})");

        let encrypted: Value = read_json(
            self.agent
                .post(&url)
                .query("componentId", component_id)
                .query("projectId", project_id.to_string())
                .send_json(json!({ "#value": value })),
        )?;

        encrypted
            .get("#value")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Protocol("encryption response has no `#value`".into()))
    }

    fn activate_schedule(
        &self,
        config_id: &str,
        configuration_version: &str,
    ) -> RemoteResult<Schedule> {
        let url = self.service_url("scheduler", "schedules");
        log::debug!("POST {url}");

        let mut body = json!({ "configurationId": config_id });
        if !configuration_version.is_empty() {
            body["configurationVersionId"] = json!(configuration_version);
        }

        let schedule: ApiSchedule = read_json(
            self.agent
                .post(&url)
                .header(TOKEN_HEADER, self.token.as_str())
                .send_json(&body),
        )?;
        Ok(schedule.into())
    }

    fn get_schedule(&self, id: &str) -> RemoteResult<Schedule> {
        let schedule: ApiSchedule = self.get(&self.service_url("scheduler", &format!("schedules/{id}")))?;
        Ok(schedule.into())
    }

    fn delete_schedule(&self, id: &str) -> RemoteResult<()> {
        self.delete(&self.service_url("scheduler", &format!("schedules/{id}")))
    }
}

/// Host of a sibling service (`encryption`, `scheduler`) on the same stack
///
/// Hosts without a `connection.` label are used as-is.
pub fn service_host(host: &str, service: &str) -> String {
    match host.split_once("://connection.") {
        Some((scheme, rest)) => format!("{scheme}://{service}.{rest}"),
        None => host.to_string(),
    }
}

// ============================================================================
// Response handling
// ============================================================================

fn read_json<T: DeserializeOwned>(result: HttpResult) -> RemoteResult<T> {
    let mut response = result.map_err(transport_error)?;
    check_status(&mut response)?;
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|e| RemoteError::Protocol(e.to_string()))
}

fn expect_success(result: HttpResult) -> RemoteResult<()> {
    let mut response = result.map_err(transport_error)?;
    check_status(&mut response)
}

fn check_status(response: &mut ureq::http::Response<ureq::Body>) -> RemoteResult<()> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(());
    }

    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(RemoteError::Status {
        status,
        message: error_message(&body),
    })
}

fn transport_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::StatusCode(status) => RemoteError::Status {
            status,
            message: format!("HTTP {status}"),
        },
        other => RemoteError::Transport(other.to_string()),
    }
}

/// Pull the human-readable message out of an error body
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.get("error")
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
    });

    match message {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "no response body".to_string(),
        None => body.trim().to_string(),
    }
}

// ============================================================================
// Wire models
// ============================================================================

fn config_form(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("name", config.name.clone()),
        ("description", config.description.clone()),
        ("changeDescription", config.change_description.clone()),
        ("isDisabled", config.is_disabled.to_string()),
        ("configuration", content::encode(&config.content)),
    ]
}

fn row_form(row: &ConfigRow) -> Vec<(&'static str, String)> {
    vec![
        ("name", row.name.clone()),
        ("description", row.description.clone()),
        ("changeDescription", row.change_description.clone()),
        ("isDisabled", row.is_disabled.to_string()),
        ("configuration", content::encode(&row.content)),
        ("state", content::encode(&row.state)),
    ]
}

/// Payload objects; the API sends an empty array for an empty object
fn payload(field: &str, value: Value) -> RemoteResult<OrderedMap> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(OrderedMap::new()),
        Value::Array(items) if items.is_empty() => Ok(OrderedMap::new()),
        other => Err(RemoteError::Protocol(format!(
            "expected an object for `{field}`, got {other}"
        ))),
    }
}

/// Identifiers arrive as strings or numbers depending on the endpoint
fn string_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number identifier, got {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiConfig {
    #[serde(deserialize_with = "string_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    change_description: String,
    #[serde(default)]
    is_disabled: bool,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default)]
    version: i64,
    #[serde(default)]
    created: String,
    #[serde(default)]
    configuration: Value,
}

impl ApiConfig {
    fn into_config(self, branch_id: i64, component_id: &str) -> RemoteResult<Config> {
        Ok(Config {
            branch_id: Some(branch_id),
            component_id: component_id.to_string(),
            id: Some(self.id),
            name: self.name,
            description: self.description,
            change_description: self.change_description,
            is_disabled: self.is_disabled,
            is_deleted: self.is_deleted,
            version: self.version,
            created: self.created,
            content: payload("configuration", self.configuration)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRow {
    #[serde(deserialize_with = "string_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    change_description: String,
    #[serde(default)]
    is_disabled: bool,
    #[serde(default)]
    version: i64,
    #[serde(default)]
    configuration: Value,
    #[serde(default)]
    state: Value,
}

impl TryFrom<ApiRow> for ConfigRow {
    type Error = RemoteError;

    fn try_from(row: ApiRow) -> RemoteResult<Self> {
        Ok(Self {
            id: Some(row.id),
            name: row.name,
            description: row.description,
            change_description: row.change_description,
            is_disabled: row.is_disabled,
            version: row.version,
            state: payload("state", row.state)?,
            content: payload("configuration", row.configuration)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiBranch {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    is_default: bool,
}

impl From<ApiBranch> for Branch {
    fn from(branch: ApiBranch) -> Self {
        Self {
            id: Some(branch.id),
            name: branch.name,
            description: branch.description,
            is_default: branch.is_default,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMetadata {
    #[serde(deserialize_with = "string_id")]
    id: String,
    key: String,
    #[serde(default)]
    value: String,
}

impl ApiMetadata {
    fn into_entry(self, branch_id: i64) -> MetadataEntry {
        MetadataEntry {
            branch_id,
            id: self.id,
            key: self.key,
            value: self.value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiJob {
    id: i64,
    status: String,
    #[serde(default)]
    results: Value,
    #[serde(default)]
    error: Option<ApiJobError>,
}

#[derive(Debug, Deserialize)]
struct ApiJobError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiToken {
    owner: ApiOwner,
}

#[derive(Debug, Deserialize)]
struct ApiOwner {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSchedule {
    #[serde(deserialize_with = "string_id")]
    id: String,
    #[serde(default)]
    configuration_id: String,
    #[serde(default)]
    configuration_version_id: String,
}

impl From<ApiSchedule> for Schedule {
    fn from(schedule: ApiSchedule) -> Self {
        Self {
            id: Some(schedule.id),
            config_id: schedule.configuration_id,
            configuration_version: schedule.configuration_version_id,
        }
    }
}
