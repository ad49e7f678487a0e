//! Manifest data model.
//!
//! A [`Manifest`] is an immutable policy snapshot; a [`VersionHistory`] is the
//! append-only list of snapshots seen for one manifest URL, oldest first.
//! The [`Registry`] ties pages to manifests and is what the engine reads.

pub mod parse;

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use parse::parse_manifest;

/// Token in a network list that allows every URL through to the network.
pub const NETWORK_WILDCARD: &str = "*";

/// Declarative offline policy for a set of pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    /// URLs always served from the version's generation.
    #[serde(default)]
    pub cache: BTreeSet<String>,
    /// URL prefix -> fallback target URL.
    #[serde(default)]
    pub fallback: BTreeMap<String, String>,
    /// URLs (or the wildcard) allowed to pass through to the network.
    #[serde(default)]
    pub network: BTreeSet<String>,
}

impl Manifest {
    /// Whether `url` may bypass the cache and go to the network.
    pub fn allows_network(&self, url: &str) -> bool {
        self.network.contains(NETWORK_WILDCARD) || self.network.contains(url)
    }
}

/// One immutable snapshot of a manifest, keyed by its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ManifestVersion {
    pub hash: String,
    pub manifest: Manifest,
}

/// Ordered version history for a single manifest URL. The last entry is the latest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VersionHistory {
    pub manifest_url: String,
    #[serde(default)]
    pub versions: Vec<ManifestVersion>,
}

impl VersionHistory {
    pub fn new(manifest_url: impl Into<String>) -> Self {
        Self { manifest_url: manifest_url.into(), versions: Vec::new() }
    }

    /// The current version, if any has been recorded.
    pub fn latest(&self) -> Option<&ManifestVersion> {
        self.versions.last()
    }

    /// Find a version by hash anywhere in the history.
    pub fn find(&self, hash: &str) -> Option<&ManifestVersion> {
        self.versions.iter().find(|v| v.hash == hash)
    }

    /// Every hash except the latest one.
    pub fn superseded_hashes(&self) -> impl Iterator<Item = &str> {
        let keep = self.versions.len().saturating_sub(1);
        self.versions[..keep].iter().map(|v| v.hash.as_str())
    }

    /// Append a version unless its hash is already present.
    ///
    /// Returns true when the version was appended and is now the latest.
    pub fn append(&mut self, version: ManifestVersion) -> bool {
        if self.find(&version.hash).is_some() {
            return false;
        }
        self.versions.push(version);
        true
    }
}

/// Page registrations plus every manifest's history, in first-registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Page URL -> manifest URL.
    #[serde(default)]
    pub pages: BTreeMap<String, String>,
    #[serde(default)]
    pub manifests: Vec<VersionHistory>,
}

impl Registry {
    /// Manifest URL declared by a page.
    pub fn manifest_for_page(&self, page_url: &str) -> Option<&str> {
        self.pages.get(page_url).map(String::as_str)
    }

    pub fn history(&self, manifest_url: &str) -> Option<&VersionHistory> {
        self.manifests.iter().find(|h| h.manifest_url == manifest_url)
    }

    /// History for a manifest URL, created at the end of the scan order if new.
    pub fn history_mut(&mut self, manifest_url: &str) -> &mut VersionHistory {
        let idx = match self.manifests.iter().position(|h| h.manifest_url == manifest_url) {
            Some(idx) => idx,
            None => {
                self.manifests.push(VersionHistory::new(manifest_url));
                self.manifests.len() - 1
            }
        };
        &mut self.manifests[idx]
    }

    /// Hashes that are no longer the latest version of their manifest.
    pub fn superseded_hashes(&self) -> BTreeSet<String> {
        self.manifests
            .iter()
            .flat_map(|h| h.superseded_hashes().map(str::to_string))
            .collect()
    }
}
