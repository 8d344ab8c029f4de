//! sw_state and sw_update tool implementations.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;
use swcache_client::{OfflineWorker, UpdateCheck, WorkerState};

use super::json_result;

/// Output structure for sw_state tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwStateOutput {
    pub state: WorkerState,
    /// Whether the worker intercepts fetches.
    pub controlling: bool,
    pub origin: String,
    pub script_path: String,
    pub scope: String,
    pub static_store: String,
    pub runtime_store: String,
}

/// Output structure for sw_update tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwUpdateOutput {
    #[serde(flatten)]
    pub check: UpdateCheck,
    /// ISO8601 timestamp of the update check.
    pub checked_at: String,
}

/// Implementation of the sw_state tool.
pub fn state_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let config = worker.config();
    let output = SwStateOutput {
        state: worker.state(),
        controlling: worker.is_controlling(),
        origin: config.origin.to_string(),
        script_path: config.script_path.clone(),
        scope: config.scope.clone(),
        static_store: config.static_store.clone(),
        runtime_store: config.runtime_store.clone(),
    };

    json_result(&output)
}

/// Implementation of the sw_update tool.
pub async fn update_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let check = worker.update().await?;
    json_result(&SwUpdateOutput { check, checked_at: Utc::now().to_rfc3339() })
}
