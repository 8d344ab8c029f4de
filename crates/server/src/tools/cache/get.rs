//! cache_match tool implementation.
//!
//! Retrieves a stored response by request, from one store or from all of them.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::OfflineWorker;
use swcache_core::{Error, RequestKey};

use crate::tools::{json_result, resolve_url};

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method of the stored request (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Store to search; all stores in creation order when omitted.
    #[serde(default)]
    pub store: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheMatchOutput {
    pub store: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub stored_at: String,
}

/// Implementation of the cache_match tool.
pub async fn match_impl(worker: &OfflineWorker, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let url = resolve_url(worker, &params.url)?;
    let key = RequestKey::new(&params.method, &url);

    let entry = match &params.store {
        Some(store) => worker.db().match_entry(store, &key).await?,
        None => worker.db().match_any(&key).await?,
    }
    .ok_or_else(|| Error::CacheMiss(url.clone()))?;

    let output = CacheMatchOutput {
        body: entry.response.text(),
        store: entry.store,
        method: entry.method,
        url: entry.url,
        status: entry.response.status,
        status_text: entry.response.status_text,
        headers: entry.response.headers,
        stored_at: entry.stored_at,
    };

    json_result(&output)
}
