//! appcache_resolve tool implementation.
//!
//! Reports which source would serve a request without fetching anything.
//! A session's first resolution still records its pin.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};

use super::request::RequestParams;
use appcache_client::engine::AppCacheEngine;
use appcache_core::Error;

/// Implementation of the appcache_resolve tool.
pub async fn resolve_impl(engine: &AppCacheEngine, params: RequestParams) -> Result<CallToolResult, McpError> {
    let request = params.into_request()?;
    let decision = engine.resolve(&request).await;

    let json = serde_json::to_string_pretty(&decision)
        .map_err(|e| Error::Serialization(format!("Failed to serialize decision: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
