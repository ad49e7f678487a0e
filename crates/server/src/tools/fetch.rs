//! appcache_fetch tool implementation.
//!
//! Runs the full request path and reports the response the page would see.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::request::RequestParams;
use appcache_client::engine::AppCacheEngine;
use appcache_core::Error;

/// Parameters for the appcache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    #[serde(flatten)]
    pub request: RequestParams,
    /// Maximum body characters to return (default: 65536).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_chars() -> usize {
    65_536
}

/// Output from the appcache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    /// Status 0 means the request failed with a network error.
    pub status: u16,
    pub url: String,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8 (lossy), cut to `max_chars`.
    pub body: String,
    pub body_bytes: usize,
    pub truncated: bool,
}

/// Implementation of the appcache_fetch tool.
pub async fn fetch_impl(engine: &AppCacheEngine, params: FetchParams) -> Result<CallToolResult, McpError> {
    let request = params.request.into_request()?;
    let response = engine.handle(request).await;

    let text = String::from_utf8_lossy(&response.body);
    let truncated = text.chars().count() > params.max_chars;
    let body: String = if truncated { text.chars().take(params.max_chars).collect() } else { text.into_owned() };

    let output = FetchOutput {
        status: response.status,
        url: response.url,
        content_type: response.content_type,
        body,
        body_bytes: response.body.len(),
        truncated,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::Serialization(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
