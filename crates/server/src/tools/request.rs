//! Request description shared by the resolve and fetch tools.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use appcache_core::{Error, Request, RequestMode};

/// An intercepted request as described by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RequestParams {
    /// Absolute request URL.
    pub url: String,
    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// URL of the page that issued the request.
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// navigate, same-origin (default), no-cors or cors.
    #[serde(default)]
    pub mode: RequestMode,
}

impl RequestParams {
    pub fn into_request(self) -> Result<Request, Error> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidInput("url cannot be empty".into()));
        }

        let mut request = Request::get(self.url).with_mode(self.mode);
        if let Some(method) = self.method {
            request = request.with_method(method);
        }
        for (name, value) in self.headers {
            request = request.with_header(&name, value);
        }
        if let Some(referrer) = self.referrer {
            request = request.with_referrer(referrer);
        }
        if let Some(session_id) = self.session_id {
            request = request.with_session(session_id);
        }
        Ok(request)
    }
}
