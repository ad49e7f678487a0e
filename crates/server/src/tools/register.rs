//! appcache_register tool implementation.
//!
//! Registers manifest text for a page. Identical text is recorded once;
//! changed text becomes the manifest's latest version.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use appcache_client::engine::AppCacheEngine;
use appcache_core::Error;

/// Parameters for the appcache_register tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegisterParams {
    /// Absolute URL of the page that references the manifest.
    pub page_url: String,
    /// Absolute URL the manifest was fetched from. Relative entries resolve against it.
    pub manifest_url: String,
    /// Raw manifest text, starting with `CACHE MANIFEST`.
    pub manifest_text: String,
}

/// Implementation of the appcache_register tool.
pub async fn register_impl(engine: &AppCacheEngine, params: RegisterParams) -> Result<CallToolResult, McpError> {
    if params.manifest_text.trim().is_empty() {
        return Err(Error::InvalidInput("manifest_text cannot be empty".into()).into());
    }

    let registration = engine
        .register(&params.page_url, &params.manifest_url, &params.manifest_text)
        .await?;

    let json = serde_json::to_string_pretty(&registration)
        .map_err(|e| Error::Serialization(format!("Failed to serialize registration: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{engine, text_of};

    fn params(text: &str) -> RegisterParams {
        RegisterParams {
            page_url: "https://app.test/index.html".into(),
            manifest_url: "https://app.test/app.appcache".into(),
            manifest_text: text.into(),
        }
    }

    #[tokio::test]
    async fn test_register_impl_success() {
        let (engine, _sessions) = engine().await;
        let result = register_impl(&engine, params("CACHE MANIFEST\n/app.js\n")).await.unwrap();

        let json: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(json["manifest_url"], "https://app.test/app.appcache");
        assert_eq!(json["is_new_version"], true);
    }

    #[tokio::test]
    async fn test_register_impl_empty_text() {
        let (engine, _sessions) = engine().await;
        let err = register_impl(&engine, params("  ")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_register_impl_bad_manifest() {
        let (engine, _sessions) = engine().await;
        let err = register_impl(&engine, params("NOT A MANIFEST")).await.unwrap_err();
        assert_eq!(err.code.0, -32000);
    }
}
