//! cache_keys tool implementation.
//!
//! Lists the stores with their entry counts, or the entries of one store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::OfflineWorker;
use swcache_core::{EntrySummary, Error};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// List the entries of this store instead of the store summary.
    #[serde(default)]
    pub store: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum CacheKeysOutput {
    Stores { stores: Vec<StoreSummary> },
    Entries { store: String, entries: Vec<EntrySummary> },
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(worker: &OfflineWorker, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let db = worker.db();

    let output = match params.store {
        Some(store) => {
            if !db.has_store(&store).await? {
                return Err(Error::CacheMiss(format!("no store named {store}")).into());
            }
            let entries = db.entries(&store).await?;
            CacheKeysOutput::Entries { store, entries }
        }
        None => {
            let mut stores = Vec::new();
            for name in db.store_names().await? {
                let entries = db.entry_count(&name).await?;
                stores.push(StoreSummary { name, entries });
            }
            CacheKeysOutput::Stores { stores }
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ScriptedNetwork, output_json, worker};
    use swcache_core::Response;

    async fn seeded() -> std::sync::Arc<OfflineWorker> {
        let net = ScriptedNetwork::new();
        net.route("https://app.test/", Response::new(200, "<html>shell</html>"));
        net.route("https://app.test/index.html", Response::new(200, "<html>index</html>"));
        let worker = worker(net).await;
        worker.register().await.unwrap();
        worker
    }

    #[tokio::test]
    async fn test_keys_lists_stores() {
        let worker = seeded().await;

        let out = output_json(&keys_impl(&worker, CacheKeysParams { store: None }).await.unwrap());

        assert_eq!(out["stores"][0]["name"], "soci-app-static-v5");
        assert_eq!(out["stores"][0]["entries"], 2);
    }

    #[tokio::test]
    async fn test_keys_lists_entries() {
        let worker = seeded().await;

        let params = CacheKeysParams { store: Some("soci-app-static-v5".into()) };
        let out = output_json(&keys_impl(&worker, params).await.unwrap());

        assert_eq!(out["entries"][0]["url"], "https://app.test/");
        assert_eq!(out["entries"][1]["url"], "https://app.test/index.html");
    }

    #[tokio::test]
    async fn test_keys_unknown_store() {
        let worker = seeded().await;
        let params = CacheKeysParams { store: Some("nope".into()) };
        assert!(keys_impl(&worker, params).await.is_err());
    }
}
