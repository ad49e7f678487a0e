//! appcache_cleanup tool implementation.
//!
//! Runs one generation collection pass and waits for it.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};

use appcache_client::engine::AppCacheEngine;
use appcache_core::Error;

/// Implementation of the appcache_cleanup tool.
pub async fn cleanup_impl(engine: &AppCacheEngine) -> Result<CallToolResult, McpError> {
    let report = engine.cleanup_old_caches().await?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| Error::Serialization(format!("Failed to serialize report: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
