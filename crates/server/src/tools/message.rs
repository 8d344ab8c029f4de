//! sw_message tool implementation.
//!
//! Posts a control message to the worker, as a controlled page would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{Message, OfflineWorker};

use super::json_result;

/// Input parameters for sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type: "SKIP_WAITING", "CLEAR_CACHE" or "CACHE_CURRENT_PAGE".
    /// Other types are accepted and ignored.
    #[serde(rename = "type")]
    pub kind: String,

    /// URLs to store, for CACHE_CURRENT_PAGE.
    #[serde(default)]
    pub urls: Option<Vec<String>>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &OfflineWorker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let mut value = serde_json::json!({ "type": params.kind });
    if let Some(urls) = params.urls {
        value["urls"] = serde_json::json!(urls);
    }

    let message = Message::parse(&value)?;
    let report = worker.handle_message(message).await?;

    json_result(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ScriptedNetwork, output_json, worker};
    use swcache_core::Response;

    #[tokio::test]
    async fn test_clear_cache() {
        let worker = worker(ScriptedNetwork::new()).await;
        worker.register().await.unwrap();

        let params = SwMessageParams { kind: "CLEAR_CACHE".into(), urls: None };
        let out = output_json(&message_impl(&worker, params).await.unwrap());

        assert_eq!(out["kind"], "cleared-cache");
        assert!(worker.db().store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_current_page() {
        let net = ScriptedNetwork::new();
        net.route("https://app.test/reports", Response::new(200, "<html></html>"));
        let worker = worker(net).await;
        worker.register().await.unwrap();

        let params = SwMessageParams { kind: "CACHE_CURRENT_PAGE".into(), urls: Some(vec!["/reports".into()]) };
        let out = output_json(&message_impl(&worker, params).await.unwrap());

        assert_eq!(out["kind"], "cached-page");
        assert_eq!(out["cached"][0], "https://app.test/reports");
    }

    #[tokio::test]
    async fn test_unknown_type_ignored() {
        let worker = worker(ScriptedNetwork::new()).await;
        let params = SwMessageParams { kind: "PING".into(), urls: None };
        let out = output_json(&message_impl(&worker, params).await.unwrap());
        assert_eq!(out["kind"], "ignored");
    }
}
