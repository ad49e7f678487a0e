//! Per-request read-only view over registrations and version histories.

use appcache_core::cache::kv::{self, KvStore, REGISTRY_KEY};
use appcache_core::{ManifestVersion, Registry, VersionHistory};

/// Snapshot of the registry taken at the start of a request.
#[derive(Debug, Clone, Default)]
pub struct ManifestStore {
    registry: Registry,
}

impl ManifestStore {
    /// Load the registry. A failed or malformed read is treated as an empty
    /// registry so the request degrades to the no-manifest path.
    pub async fn load(kv: &dyn KvStore) -> Self {
        match kv::get_typed::<Registry>(kv, REGISTRY_KEY).await {
            Ok(registry) => Self { registry: registry.unwrap_or_default() },
            Err(e) => {
                tracing::warn!(error = %e, "registry unavailable, treating as empty");
                Self::default()
            }
        }
    }

    pub fn from_registry(registry: Registry) -> Self {
        Self { registry }
    }

    /// Manifest URL registered for a page.
    pub fn manifest_url_for(&self, page_url: &str) -> Option<&str> {
        self.registry.manifest_for_page(page_url)
    }

    pub fn history(&self, manifest_url: &str) -> Option<&VersionHistory> {
        self.registry.history(manifest_url)
    }

    /// Latest version of every manifest, in scan order.
    pub fn latest_versions(&self) -> impl Iterator<Item = &ManifestVersion> {
        self.registry.manifests.iter().filter_map(VersionHistory::latest)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
