//! sw_fetch tool implementation.
//!
//! Runs one request through the worker's fetch hook and reports where the
//! response came from.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::canonicalize;
use swcache_core::{CacheWorker, RequestDescriptor, ResponseSource};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// URL to request: absolute, or relative to the serving origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub status: u16,
    /// `network`, `cache` or `passthrough`.
    pub source: String,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    pub body_bytes: usize,
    /// True when a background refresh of a stale entry was started.
    pub revalidating: bool,
}

fn source_name(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
        ResponseSource::Passthrough => "passthrough",
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &CacheWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.method.trim().is_empty() {
        return Err(ToolError::InvalidInput("method cannot be empty".into()).into());
    }
    let url =
        canonicalize(&params.url, Some(&worker.settings().origin)).map_err(|e| ToolError::InvalidUrl(e.to_string()))?;

    let mut request = RequestDescriptor::from_url(params.method.trim(), url)?;
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }

    let outcome = worker.respond(&request).await?;
    let response = outcome.response;

    let output = SwFetchOutput {
        url: response.url.clone(),
        status: response.status,
        source: source_name(outcome.source).to_string(),
        content_type: response.content_type().map(str::to_string),
        headers: response.headers.iter().cloned().collect(),
        body: std::str::from_utf8(&response.body).ok().map(str::to_string),
        body_bytes: response.body.len(),
        revalidating: outcome.revalidation.is_some(),
    };

    Ok(json_result(&output)?)
}
