//! appcache_session tool implementation.
//!
//! Opens, navigates or closes a session in the server's session table.
//! Closing a session makes its pin eligible for cleanup.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use appcache_client::engine::SessionTable;
use appcache_client::fetch::normalize;
use appcache_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    /// Open the session, or move it to a new page.
    Open,
    Close,
}

/// Parameters for the appcache_session tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionParams {
    pub session_id: String,
    pub action: SessionAction,
    /// Page loaded in the session. Required for `open`.
    #[serde(default)]
    pub url: Option<String>,
}

/// Output from the appcache_session tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionOutput {
    pub session_id: String,
    pub action: SessionAction,
    /// For `close`, whether the session was open.
    pub changed: bool,
}

/// Implementation of the appcache_session tool.
pub async fn session_impl(sessions: &SessionTable, params: SessionParams) -> Result<CallToolResult, McpError> {
    if params.session_id.trim().is_empty() {
        return Err(Error::InvalidInput("session_id cannot be empty".into()).into());
    }

    let changed = match params.action {
        SessionAction::Open => {
            let url = params
                .url
                .as_deref()
                .ok_or_else(|| Error::InvalidInput("url is required to open a session".into()))?;
            let url = normalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            sessions.open(params.session_id.clone(), url.to_string()).await;
            true
        }
        SessionAction::Close => sessions.close(&params.session_id).await,
    };

    tracing::debug!(session_id = %params.session_id, action = ?params.action, changed, "session updated");

    let output = SessionOutput { session_id: params.session_id, action: params.action, changed };
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}
