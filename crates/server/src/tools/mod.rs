//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server. Each tool
//! drives the shared [`OfflineWorker`] and returns its result as pretty JSON.

pub mod cache;
pub mod fetch;
pub mod message;
pub mod worker;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_client::OfflineWorker;
use swcache_client::fetch::resolve;

use crate::error::ToolError;

pub use cache::{CacheDeleteParams, CacheKeysParams, CacheMatchParams};
pub use fetch::SwFetchParams;
pub use message::SwMessageParams;

/// Serialize tool output into a successful text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::OutputFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Resolve a tool-supplied URL against the application origin.
pub(crate) fn resolve_url(worker: &OfflineWorker, raw: &str) -> Result<String, McpError> {
    resolve(&worker.config().origin, raw)
        .map(|url| url.to_string())
        .map_err(|e| ToolError::InvalidInput(format!("{raw}: {e}")).into())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use rmcp::model::CallToolResult;
    use swcache_client::{OfflineWorker, WorkerConfig};
    use swcache_core::{AppConfig, CacheDb};

    pub(crate) use swcache_client::worker::testing::ScriptedNetwork;

    pub(crate) async fn worker(network: ScriptedNetwork) -> Arc<OfflineWorker> {
        let app = AppConfig { origin: "https://app.test".into(), ..Default::default() };
        let config = WorkerConfig::from_app(&app).unwrap();
        let db = CacheDb::open_in_memory().await.unwrap();
        Arc::new(OfflineWorker::new(config, db, Arc::new(network)))
    }

    /// Parse the JSON text content of a tool result.
    pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content.get("text").and_then(|v| v.as_str()).expect("text content");
        serde_json::from_str(text).unwrap()
    }
}
