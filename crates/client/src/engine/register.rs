//! Manifest registration: the write side of the registry.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::fetch::url::normalize;
use appcache_core::cache::hash::compute_manifest_hash;
use appcache_core::cache::kv::{self, KvStore, REGISTRY_KEY};
use appcache_core::{Error, Manifest, ManifestVersion, Registry, parse_manifest};

/// Result of registering a manifest for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Registration {
    pub page_url: String,
    pub manifest_url: String,
    pub hash: String,
    /// False when this exact manifest content was already in the history.
    pub is_new_version: bool,
}

/// Records page registrations and appends manifest versions.
pub struct Registrar {
    kv: Arc<dyn KvStore>,
    write_lock: Mutex<()>,
}

impl Registrar {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv, write_lock: Mutex::new(()) }
    }

    /// Parse and hash manifest text, then register it for `page_url`.
    pub async fn register(&self, page_url: &str, manifest_url: &str, manifest_text: &str) -> Result<Registration, Error> {
        let manifest_url = normalize(manifest_url).map_err(|e| Error::InvalidUrl(format!("manifest_url: {e}")))?;
        let manifest = parse_manifest(manifest_url.as_str(), manifest_text)?;
        let hash = compute_manifest_hash(manifest_url.as_str(), manifest_text);
        self.register_manifest(page_url, manifest_url.as_str(), hash, manifest).await
    }

    /// Register an already-parsed manifest version for `page_url`.
    ///
    /// The version is appended (becoming latest) only if its hash is new.
    pub async fn register_manifest(
        &self, page_url: &str, manifest_url: &str, hash: String, manifest: Manifest,
    ) -> Result<Registration, Error> {
        let page_url = normalize(page_url).map_err(|e| Error::InvalidUrl(format!("page_url: {e}")))?.to_string();
        let manifest_url = normalize(manifest_url)
            .map_err(|e| Error::InvalidUrl(format!("manifest_url: {e}")))?
            .to_string();
        if hash.is_empty() {
            return Err(Error::InvalidInput("version hash cannot be empty".into()));
        }

        let _guard = self.write_lock.lock().await;
        let mut registry: Registry = kv::get_typed(self.kv.as_ref(), REGISTRY_KEY).await?.unwrap_or_default();

        let is_new_version = registry
            .history_mut(&manifest_url)
            .append(ManifestVersion { hash: hash.clone(), manifest });
        registry.pages.insert(page_url.clone(), manifest_url.clone());

        kv::set_typed(self.kv.as_ref(), REGISTRY_KEY, &registry).await?;

        tracing::info!(page_url = %page_url, manifest_url = %manifest_url, hash = %hash, is_new_version, "registered manifest");

        Ok(Registration { page_url, manifest_url, hash, is_new_version })
    }
}
