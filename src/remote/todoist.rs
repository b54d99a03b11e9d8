//! Todoist Sync API client.
//!
//! - `fetch` performs a full sync (`sync_token=*`) of projects and items
//! - `create` queues an `item_add` command with a temp id
//! - `commit` sends every queued command in one request and checks each
//!   command's `sync_status`
//!
//! Queued commands may reference each other's temp ids; the service resolves
//! them within the batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::{MutationSink, RemoteError, RemoteState, RemoteStateSource};
use crate::models::{NewTask, Record, RecordId, RecordKind};

/// Default Sync API base URL
pub const DEFAULT_API_URL: &str = "https://api.todoist.com/sync/v9";

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("tplsync/", env!("CARGO_PKG_VERSION"));

/// Resource types requested by a full sync
const RESOURCE_TYPES: &str = r#"["projects","items"]"#;

const TIMEOUT: Duration = Duration::from_secs(30);

/// One queued write command.
#[derive(Debug, Clone, Serialize)]
struct SyncCommand {
    #[serde(rename = "type")]
    kind: &'static str,
    uuid: String,
    temp_id: String,
    args: NewTask,
}

/// Response body of the sync endpoint (only fields we care about).
#[derive(Debug, Default, Deserialize)]
struct SyncResponse {
    #[serde(default)]
    projects: Vec<Value>,
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    sync_status: HashMap<String, Value>,
}

/// Blocking client for one account.
pub struct SyncClient {
    base_url: String,
    token: String,
    agent: ureq::Agent,
    queue: Vec<SyncCommand>,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(TIMEOUT).build();
        Self {
            base_url: base_url.into(),
            token: token.into(),
            agent,
            queue: Vec::new(),
        }
    }

    /// Number of commands waiting for `commit`.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn sync_url(&self) -> String {
        format!("{}/sync", self.base_url.trim_end_matches('/'))
    }

    fn post_form(&self, form: &[(&str, &str)]) -> Result<SyncResponse, RemoteError> {
        let response = self
            .agent
            .post(&self.sync_url())
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("User-Agent", USER_AGENT)
            .send_form(form);

        match response {
            Ok(resp) => resp
                .into_json()
                .map_err(|e| RemoteError::Parse(e.to_string())),
            Err(ureq::Error::Status(401, _)) => Err(RemoteError::Unauthorized),
            Err(ureq::Error::Status(403, _)) => Err(RemoteError::Forbidden),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(RemoteError::Http(format!("HTTP {}: {}", code, body)))
            }
            Err(e) => Err(RemoteError::Transport(e.to_string())),
        }
    }
}

impl RemoteStateSource for SyncClient {
    fn fetch(&mut self) -> Result<RemoteState, RemoteError> {
        tracing::debug!(url = %self.sync_url(), "full sync");
        let response =
            self.post_form(&[("sync_token", "*"), ("resource_types", RESOURCE_TYPES)])?;
        Ok(into_state(response))
    }
}

impl MutationSink for SyncClient {
    fn create(&mut self, task: &NewTask) -> Result<Record, RemoteError> {
        if task.content.is_empty() {
            return Err(RemoteError::Rejected {
                command: "item_add".to_string(),
                reason: "task content is empty".to_string(),
            });
        }
        let temp_id = uuid::Uuid::new_v4().to_string();
        self.queue.push(SyncCommand {
            kind: "item_add",
            uuid: uuid::Uuid::new_v4().to_string(),
            temp_id: temp_id.clone(),
            args: task.clone(),
        });
        Ok(task.clone().into_record(RecordId::new(temp_id)))
    }

    fn commit(&mut self) -> Result<(), RemoteError> {
        if self.queue.is_empty() {
            return Ok(());
        }
        let commands = std::mem::take(&mut self.queue);
        let payload =
            serde_json::to_string(&commands).map_err(|e| RemoteError::Parse(e.to_string()))?;
        tracing::debug!(commands = commands.len(), "committing queued commands");
        let response = self.post_form(&[("commands", payload.as_str())])?;
        check_sync_status(&commands, &response.sync_status)
    }
}

fn into_state(response: SyncResponse) -> RemoteState {
    RemoteState {
        projects: response
            .projects
            .into_iter()
            .map(|v| Record::from_value(RecordKind::Project, v))
            .collect(),
        tasks: response
            .items
            .into_iter()
            .map(|v| Record::from_value(RecordKind::Task, v))
            .collect(),
    }
}

/// Every command must report `"ok"`; the first failure is returned.
fn check_sync_status(
    commands: &[SyncCommand],
    statuses: &HashMap<String, Value>,
) -> Result<(), RemoteError> {
    for command in commands {
        match statuses.get(&command.uuid) {
            Some(Value::String(s)) if s == "ok" => {}
            Some(other) => {
                let reason = other
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string());
                return Err(RemoteError::Rejected {
                    command: format!("{} {}", command.kind, command.uuid),
                    reason,
                });
            }
            None => {
                return Err(RemoteError::Rejected {
                    command: format!("{} {}", command.kind, command.uuid),
                    reason: "no status returned".to_string(),
                });
            }
        }
    }
    Ok(())
}
