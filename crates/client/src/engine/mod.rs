//! Offline cache resolution engine.
//!
//! ### Resolution
//! - [`AppCacheEngine::resolve`] decides how a request is served; see [`resolve`].
//! - [`AppCacheEngine::handle`] executes that decision against the generation
//!   store and the network collaborators.
//!
//! ### State
//! - Registrations and version histories: [`register::Registrar`] writes,
//!   [`manifests::ManifestStore`] reads a per-request snapshot.
//! - Session pins: [`pins::SessionPins`].
//!
//! ### Cleanup
//! - [`gc::GenerationCollector`] reclaims generations no live session can
//!   reach. Navigations schedule a pass in the background.

pub mod gc;
pub mod manifests;
pub mod pins;
pub mod prefix;
pub mod register;
pub mod resolve;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use url::Url;

use crate::fetch::url::{normalize, same_origin};
use crate::fetch::{FallbackFetch, GenerationFallback, NetworkFetch};
use appcache_core::{AppConfig, CacheDb, Error, GenerationStore, KvStore, Request, Response};

pub use gc::{CleanupReport, GenerationCollector};
pub use pins::SessionPins;
pub use register::{Registrar, Registration};
pub use resolve::Decision;
pub use session::{SessionEnvironment, SessionTable};

/// Engine settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Requests whose scheme differs from this origin's bypass the engine.
    pub origin: Url,
    /// Header forcing a request to the network when set to `true`.
    pub bypass_header: String,
    /// Referrers that carry no page information.
    pub ignored_referrers: Vec<String>,
}

impl EngineConfig {
    pub fn is_ignored_referrer(&self, referrer: &str) -> bool {
        self.ignored_referrers.iter().any(|r| r == referrer)
    }
}

impl TryFrom<&AppConfig> for EngineConfig {
    type Error = Error;

    fn try_from(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        Ok(Self {
            origin,
            bypass_header: config.bypass_header.to_ascii_lowercase(),
            ignored_referrers: config.ignored_referrers.clone(),
        })
    }
}

/// Collaborators the engine is built from.
pub struct EngineParts {
    pub kv: Arc<dyn KvStore>,
    pub generations: Arc<dyn GenerationStore>,
    pub network: Arc<dyn NetworkFetch>,
    pub sessions: Arc<dyn SessionEnvironment>,
}

/// Resolves intercepted requests against registered manifests.
pub struct AppCacheEngine {
    config: EngineConfig,
    kv: Arc<dyn KvStore>,
    pins: Arc<SessionPins>,
    sessions: Arc<dyn SessionEnvironment>,
    network: Arc<dyn NetworkFetch>,
    fallback: Arc<dyn FallbackFetch>,
    generations: Arc<dyn GenerationStore>,
    collector: GenerationCollector,
    registrar: Registrar,
}

impl AppCacheEngine {
    pub fn new(config: EngineConfig, parts: EngineParts) -> Self {
        let EngineParts { kv, generations, network, sessions } = parts;
        let pins = Arc::new(SessionPins::new(kv.clone()));
        let fallback = Arc::new(GenerationFallback::new(network.clone(), generations.clone()));
        let collector = GenerationCollector::new(kv.clone(), pins.clone(), sessions.clone(), generations.clone());
        let registrar = Registrar::new(kv.clone());

        Self { config, kv, pins, sessions, network, fallback, generations, collector, registrar }
    }

    /// Engine whose key-value and generation stores share one database.
    pub fn from_db(
        config: EngineConfig, db: Arc<CacheDb>, network: Arc<dyn NetworkFetch>, sessions: Arc<dyn SessionEnvironment>,
    ) -> Self {
        Self::new(config, EngineParts { kv: db.clone(), generations: db, network, sessions })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pins(&self) -> &SessionPins {
        &self.pins
    }

    /// Register manifest text for a page; see [`Registrar::register`].
    pub async fn register(&self, page_url: &str, manifest_url: &str, manifest_text: &str) -> Result<Registration, Error> {
        self.registrar.register(page_url, manifest_url, manifest_text).await
    }

    /// Run one collection pass and wait for it.
    pub async fn cleanup_old_caches(&self) -> Result<CleanupReport, Error> {
        self.collector.run().await
    }

    /// Answer an intercepted request.
    pub async fn handle(&self, request: Request) -> Response {
        let decision = self.resolve(&request).await;

        if request.is_navigation() {
            // Detached; the response never waits on cleanup.
            drop(self.collector.spawn());
        }

        self.execute(&request, decision).await
    }

    async fn execute(&self, request: &Request, decision: Decision) -> Response {
        match decision {
            Decision::ServeFromGeneration { hash, url } => self.serve_from_generation(request, &hash, &url).await,
            Decision::ServeViaFallback { fallback_url, hash } => {
                match self.fallback.fetch_with_fallback(request, &fallback_url, &hash).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!(url = %request.url, hash = %hash, error = %e, "fallback fetch failed");
                        Response::network_error()
                    }
                }
            }
            Decision::ServeViaNetwork => match self.network.fetch(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "network fetch failed");
                    Response::network_error()
                }
            },
            Decision::Error { reason } => {
                tracing::debug!(url = %request.url, reason = %reason, "no source for request");
                Response::network_error()
            }
        }
    }

    /// Look `url` up in the generation; on a miss fetch it and keep 2xx responses.
    async fn serve_from_generation(&self, request: &Request, hash: &str, url: &str) -> Response {
        let generation = match self.generations.open_generation(hash).await {
            Ok(generation) => generation,
            Err(e) => {
                tracing::warn!(hash, error = %e, "failed to open generation");
                return Response::network_error();
            }
        };

        match self.generations.lookup(&generation, url).await {
            Ok(Some(response)) => return response,
            Ok(None) => {}
            Err(e) => tracing::warn!(hash, url, error = %e, "generation lookup failed"),
        }

        let response = match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, error = %e, "uncached entry unavailable");
                return Response::network_error();
            }
        };

        let stayed_on_origin = match (normalize(url), normalize(&response.url)) {
            (Ok(requested), Ok(served)) => same_origin(&requested, &served),
            _ => false,
        };
        if response.is_ok()
            && stayed_on_origin
            && let Err(e) = self.generations.put(&generation, url, &response).await
        {
            tracing::warn!(hash, url, error = %e, "failed to store fetched entry");
        }

        response
    }
}
