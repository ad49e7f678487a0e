//! Request resolution: which source serves a request.
//!
//! 1. Escape hatches send bypass, non-GET and cross-scheme requests to the network.
//! 2. The client URL is the session's page, else a meaningful referrer, else the request itself.
//! 3. A registered client URL resolves to its manifest and a version (session pin first).
//! 4. The version's tiers are tried in order: cache, fallback, network.
//! 5. Without a registration, every manifest's latest fallback namespaces are searched.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::AppCacheEngine;
use super::manifests::ManifestStore;
use super::prefix::longest_prefix;
use crate::fetch::url::{normalize, scheme_of};
use appcache_core::{Error, ManifestVersion, Request, VersionHistory};

/// Where a request's response comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Serve `url` from the generation for `hash`.
    ServeFromGeneration { hash: String, url: String },
    /// Try the network, substituting `fallback_url` from the generation for `hash`.
    ServeViaFallback { fallback_url: String, hash: String },
    ServeViaNetwork,
    /// Terminal; answered with a network error.
    Error { reason: String },
}

impl Decision {
    fn error(err: Error) -> Self {
        Decision::Error { reason: err.to_string() }
    }
}

/// Tiered match of `request_url` against one manifest version.
pub fn match_version(version: &ManifestVersion, request_url: &str, client_url: &str) -> Decision {
    let manifest = &version.manifest;

    if manifest.cache.contains(request_url) || request_url == client_url {
        return Decision::ServeFromGeneration { hash: version.hash.clone(), url: request_url.to_string() };
    }

    if let Some(prefix) = longest_prefix(request_url, manifest.fallback.keys()) {
        return Decision::ServeViaFallback {
            fallback_url: manifest.fallback[prefix].clone(),
            hash: version.hash.clone(),
        };
    }

    if manifest.allows_network(request_url) {
        return Decision::ServeViaNetwork;
    }

    Decision::error(Error::NoMatch(format!("{request_url} is not covered by manifest version {}", version.hash)))
}

/// Fallback search across the latest version of every manifest.
///
/// A longer prefix replaces the current best; so does one of equal length,
/// which makes the manifest scanned last win ties.
pub fn match_unregistered(store: &ManifestStore, request_url: &str) -> Decision {
    let mut best: Option<(&ManifestVersion, &str)> = None;

    for version in store.latest_versions() {
        let Some(prefix) = longest_prefix(request_url, version.manifest.fallback.keys()) else {
            continue;
        };
        if best.is_none_or(|(_, current)| prefix.len() >= current.len()) {
            best = Some((version, prefix));
        }
    }

    match best {
        Some((version, prefix)) => Decision::ServeViaFallback {
            fallback_url: version.manifest.fallback[prefix].clone(),
            hash: version.hash.clone(),
        },
        None => Decision::ServeViaNetwork,
    }
}

fn normalized_or_raw(url: &str) -> String {
    normalize(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

impl AppCacheEngine {
    /// Decide how `request` is served. Writes at most one session pin.
    pub async fn resolve(&self, request: &Request) -> Decision {
        if let Some(reason) = self.escape_reason(request) {
            tracing::debug!(url = %request.url, reason, "bypassing engine");
            return Decision::ServeViaNetwork;
        }

        let request_url = match normalize(&request.url) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "unusable request URL, passing through");
                return Decision::ServeViaNetwork;
            }
        };

        let client_url = self.client_url(request, &request_url).await;
        let store = ManifestStore::load(self.kv.as_ref()).await;

        let decision = match store.manifest_url_for(&client_url) {
            Some(manifest_url) => match store.history(manifest_url) {
                Some(history) => match self.select_version(request, history).await {
                    Some(version) => match_version(version, &request_url, &client_url),
                    None => Decision::error(Error::NoVersion(manifest_url.to_string())),
                },
                None => Decision::error(Error::NoVersion(manifest_url.to_string())),
            },
            None => match_unregistered(&store, &request_url),
        };

        tracing::debug!(url = %request_url, client_url = %client_url, ?decision, "resolved");
        decision
    }

    fn escape_reason(&self, request: &Request) -> Option<&'static str> {
        let bypass = request
            .header(&self.config.bypass_header)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        if bypass {
            return Some("bypass header");
        }
        if !request.is_get() {
            return Some("not a GET");
        }
        if scheme_of(&request.url).as_deref() != Some(self.config.origin.scheme()) {
            return Some("scheme differs from origin");
        }
        None
    }

    async fn client_url(&self, request: &Request, request_url: &str) -> String {
        if let Some(session_id) = request.session_id.as_deref()
            && let Some(url) = self.sessions.resolve_session_url(session_id).await
        {
            return normalized_or_raw(&url);
        }

        if let Some(referrer) = request.referrer.as_deref()
            && !referrer.is_empty()
            && !self.config.is_ignored_referrer(referrer)
        {
            return normalized_or_raw(referrer);
        }

        request_url.to_string()
    }

    async fn select_version<'h>(&self, request: &Request, history: &'h VersionHistory) -> Option<&'h ManifestVersion> {
        let Some(session_id) = request.session_id.as_deref() else {
            return history.latest();
        };

        if let Some(pinned) = self.pins.get_pin(session_id).await
            && let Some(version) = history.find(&pinned)
        {
            return Some(version);
        }

        let latest = history.latest()?;
        match self.pins.set_pin_if_absent(session_id, &latest.hash).await {
            // Another request for this session pinned first; stay on its version.
            Ok(effective) if effective != latest.hash => history.find(&effective).or(Some(latest)),
            Ok(_) => Some(latest),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "failed to record session pin");
                Some(latest)
            }
        }
    }
}
