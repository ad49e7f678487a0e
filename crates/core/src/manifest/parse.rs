//! Manifest text parser.
//!
//! ```text
//! CACHE MANIFEST
//! # v3
//! index.html
//! NETWORK:
//! *
//! FALLBACK:
//! img/ img/offline.png
//! ```
//!
//! Entries resolve against the manifest URL and lose their fragment.
//! Fallback prefixes and targets must share the manifest's origin.

use url::Url;

use super::{Manifest, NETWORK_WILDCARD};
use crate::Error;

const SIGNATURE: &str = "CACHE MANIFEST";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Cache,
    Network,
    Fallback,
    Settings,
    Unknown,
}

impl Section {
    fn from_header(line: &str) -> Option<Self> {
        let name = line.strip_suffix(':')?;
        Some(match name {
            "CACHE" => Section::Cache,
            "NETWORK" => Section::Network,
            "FALLBACK" => Section::Fallback,
            "SETTINGS" => Section::Settings,
            _ if !name.contains(char::is_whitespace) => Section::Unknown,
            _ => return None,
        })
    }
}

/// Parse manifest text served from `manifest_url`.
///
/// # Errors
///
/// Returns `Error::InvalidUrl` if `manifest_url` is not absolute, and
/// `Error::ManifestParse` if the signature line is missing.
pub fn parse_manifest(manifest_url: &str, text: &str) -> Result<Manifest, Error> {
    let base = Url::parse(manifest_url).map_err(|e| Error::InvalidUrl(format!("{manifest_url}: {e}")))?;

    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines();

    let first = lines.next().unwrap_or_default();
    let rest = first.strip_prefix(SIGNATURE).ok_or_else(|| {
        Error::ManifestParse(format!("{manifest_url}: first line must start with \"{SIGNATURE}\""))
    })?;
    if !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
        return Err(Error::ManifestParse(format!("{manifest_url}: malformed signature line")));
    }

    let mut manifest = Manifest::default();
    let mut section = Section::Cache;

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(next) = Section::from_header(line) {
            section = next;
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else { continue };

        match section {
            Section::Cache => {
                if let Some(url) = resolve(&base, first) {
                    manifest.cache.insert(url.to_string());
                }
            }
            Section::Network => {
                if first == NETWORK_WILDCARD {
                    manifest.network.insert(NETWORK_WILDCARD.to_string());
                } else if let Some(url) = resolve(&base, first) {
                    manifest.network.insert(url.to_string());
                }
            }
            Section::Fallback => {
                let Some(second) = tokens.next() else {
                    tracing::debug!(manifest_url, line, "fallback entry without target, skipping");
                    continue;
                };
                match (resolve(&base, first), resolve(&base, second)) {
                    (Some(prefix), Some(target))
                        if prefix.origin() == base.origin() && target.origin() == base.origin() =>
                    {
                        manifest
                            .fallback
                            .entry(prefix.to_string())
                            .or_insert_with(|| target.to_string());
                    }
                    _ => tracing::debug!(manifest_url, line, "cross-origin or invalid fallback entry, skipping"),
                }
            }
            Section::Settings | Section::Unknown => {}
        }
    }

    Ok(manifest)
}

fn resolve(base: &Url, entry: &str) -> Option<Url> {
    let mut url = base.join(entry).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
