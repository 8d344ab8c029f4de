//! sw_fetch tool implementation.
//!
//! Delivers one request to the worker as a fetch event and reports what the
//! page would have received.

use std::str::FromStr;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{Exclusion, FetchOutcome, OfflineWorker, ResponseSource, Strategy};
use swcache_core::{Destination, Request, RequestMode};

use super::{json_result, resolve_url};
use crate::error::ToolError;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors".
    /// Defaults to "navigate" for a document destination, else "no-cors".
    #[serde(default)]
    pub mode: Option<String>,

    /// Request destination, e.g. "document", "script", "image", "worker".
    #[serde(default)]
    pub destination: Option<String>,

    /// Include the response body as text (default: true).
    #[serde(default = "default_true")]
    pub include_body: bool,
}

fn default_method() -> String {
    "GET".into()
}

fn default_true() -> bool {
    true
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    /// "not-controlled", "passthrough", "responded" or "failed".
    pub outcome: String,
    pub strategy: Option<Strategy>,
    pub exclusion: Option<Exclusion>,
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    pub body: Option<String>,
    pub error: Option<String>,
}

impl SwFetchOutput {
    fn new(url: String, outcome: &str) -> Self {
        Self {
            url,
            outcome: outcome.to_string(),
            strategy: None,
            exclusion: None,
            source: None,
            status: None,
            status_text: None,
            content_type: None,
            headers: Vec::new(),
            body_len: 0,
            body: None,
            error: None,
        }
    }
}

fn build_request(worker: &OfflineWorker, params: &SwFetchParams) -> Result<Request, McpError> {
    let raw = params.url.trim();
    if raw.is_empty() {
        return Err(ToolError::InvalidInput("url must not be empty".into()).into());
    }

    // Absolute URLs go to the classifier untouched so it can see foreign
    // origins and non-http schemes.
    let url = if url::Url::parse(raw).is_ok() { raw.to_string() } else { resolve_url(worker, raw)? };

    let destination = match &params.destination {
        Some(d) => Destination::from_str(d)?,
        None => Destination::default(),
    };
    let mode = match &params.mode {
        Some(m) => RequestMode::from_str(m)?,
        None if destination == Destination::Document => RequestMode::Navigate,
        None => RequestMode::default(),
    };

    Ok(Request::get(url).with_method(params.method.clone()).with_mode(mode).with_destination(destination))
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &OfflineWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, &params)?;
    let outcome = worker.handle_fetch(&request).await;

    let output = match outcome {
        FetchOutcome::NotControlled => SwFetchOutput::new(request.url, "not-controlled"),
        FetchOutcome::Passthrough(exclusion) => {
            SwFetchOutput { exclusion: Some(exclusion), ..SwFetchOutput::new(request.url, "passthrough") }
        }
        FetchOutcome::Failed { strategy, error } => SwFetchOutput {
            strategy: Some(strategy),
            error: Some(error.to_string()),
            ..SwFetchOutput::new(request.url, "failed")
        },
        FetchOutcome::Responded { strategy, source, response } => SwFetchOutput {
            strategy: Some(strategy),
            source: Some(source),
            status: Some(response.status),
            status_text: Some(response.status_text.clone()),
            content_type: response.content_type().map(str::to_string),
            body_len: response.body.len(),
            body: params.include_body.then(|| response.text()),
            headers: response.headers,
            ..SwFetchOutput::new(request.url, "responded")
        },
    };

    json_result(&output)
}
