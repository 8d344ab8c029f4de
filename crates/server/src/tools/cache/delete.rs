//! cache_delete tool implementation.
//!
//! Removes one stored response, from a single store or from every store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::OfflineWorker;
use swcache_core::RequestKey;

use crate::tools::{json_result, resolve_url};

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method of the stored request (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Store to delete from; every store when omitted.
    #[serde(default)]
    pub store: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub url: String,
    /// Stores the entry was removed from.
    pub deleted_from: Vec<String>,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(worker: &OfflineWorker, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    let url = resolve_url(worker, &params.url)?;
    let key = RequestKey::new(&params.method, &url);
    let db = worker.db();

    let stores = match params.store {
        Some(store) => vec![store],
        None => db.store_names().await?,
    };

    let mut deleted_from = Vec::new();
    for store in stores {
        if db.delete_entry(&store, &key).await? {
            deleted_from.push(store);
        }
    }

    tracing::info!(url = %url, stores = deleted_from.len(), "deleted cache entry");
    json_result(&CacheDeleteOutput { url, deleted_from })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ScriptedNetwork, output_json, worker};
    use swcache_core::Response;

    fn params(url: &str, store: Option<&str>) -> CacheDeleteParams {
        CacheDeleteParams { url: url.into(), method: "GET".into(), store: store.map(str::to_string) }
    }

    #[tokio::test]
    async fn test_delete_from_every_store() {
        let net = ScriptedNetwork::new();
        net.route("https://app.test/", Response::new(200, "<html>shell</html>"));
        net.route("https://app.test/dashboard", Response::new(200, "<html>dashboard</html>"));
        let worker = worker(net).await;
        worker.register().await.unwrap();
        worker.handle_fetch(&swcache_core::Request::navigate("https://app.test/dashboard")).await;

        let out = output_json(&delete_impl(&worker, params("/", None)).await.unwrap());

        assert_eq!(out["url"], "https://app.test/");
        assert_eq!(out["deleted_from"], serde_json::json!(["soci-app-static-v5", "soci-app-runtime-v5"]));
        assert!(worker.db().match_any(&RequestKey::get("https://app.test/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_from_one_store() {
        let net = ScriptedNetwork::new();
        net.route("https://app.test/", Response::new(200, "<html>shell</html>"));
        let worker = worker(net).await;
        worker.register().await.unwrap();

        let out = output_json(&delete_impl(&worker, params("/", Some("soci-app-runtime-v5"))).await.unwrap());

        assert_eq!(out["deleted_from"], serde_json::json!([]));
        let key = RequestKey::get("https://app.test/");
        assert!(worker.db().match_entry("soci-app-static-v5", &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_rejects_foreign_scheme() {
        let worker = worker(ScriptedNetwork::new()).await;
        assert!(delete_impl(&worker, params("ftp://app.test/", None)).await.is_err());
    }
}
