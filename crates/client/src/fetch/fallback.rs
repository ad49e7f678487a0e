//! Network-with-fallback fetch.
//!
//! The network is tried first. A 2xx response that stayed on the request's
//! origin is stored into the generation and returned; anything else (transport
//! error, error status, cross-origin redirect) serves the fallback target from
//! the generation instead.

use std::sync::Arc;

use async_trait::async_trait;

use super::NetworkFetch;
use super::url::{normalize, same_origin};
use appcache_core::{Error, GenerationStore, Request, Response};

/// Fetch with fallback to a cached substitute.
#[async_trait]
pub trait FallbackFetch: Send + Sync {
    async fn fetch_with_fallback(&self, request: &Request, fallback_url: &str, hash: &str) -> Result<Response, Error>;
}

/// [`FallbackFetch`] backed by a network fetcher and a generation store.
#[derive(Clone)]
pub struct GenerationFallback {
    network: Arc<dyn NetworkFetch>,
    generations: Arc<dyn GenerationStore>,
}

impl GenerationFallback {
    pub fn new(network: Arc<dyn NetworkFetch>, generations: Arc<dyn GenerationStore>) -> Self {
        Self { network, generations }
    }
}

fn left_origin(request: &Request, response: &Response) -> bool {
    match (normalize(&request.url), normalize(&response.url)) {
        (Ok(requested), Ok(served)) => !same_origin(&requested, &served),
        _ => false,
    }
}

#[async_trait]
impl FallbackFetch for GenerationFallback {
    async fn fetch_with_fallback(&self, request: &Request, fallback_url: &str, hash: &str) -> Result<Response, Error> {
        match self.network.fetch(request).await {
            Ok(response) if response.is_ok() && !left_origin(request, &response) => {
                let key = normalize(&request.url).map(|u| u.to_string()).unwrap_or_else(|_| request.url.clone());
                let generation = self.generations.open_generation(hash).await?;
                if let Err(e) = self.generations.put(&generation, &key, &response).await {
                    tracing::warn!(url = %request.url, hash, error = %e, "failed to store fetched response");
                }
                return Ok(response);
            }
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status, served = %response.url, "serving fallback");
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network failed, serving fallback");
            }
        }

        let generation = self.generations.open_generation(hash).await?;
        match self.generations.lookup(&generation, fallback_url).await? {
            Some(response) => Ok(response),
            None => {
                tracing::warn!(fallback_url, hash, "fallback target missing from generation");
                Ok(Response::network_error())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{StubNetwork, ok_response};
    use appcache_core::CacheDb;

    const HASH: &str = "h1";
    const OFFLINE: &str = "https://app.test/img/offline.png";

    async fn setup(network: StubNetwork) -> (GenerationFallback, Arc<CacheDb>) {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let generation = db.open_generation(HASH).await.unwrap();
        db.put(&generation, OFFLINE, &ok_response(OFFLINE, "offline")).await.unwrap();
        (GenerationFallback::new(Arc::new(network), db.clone()), db)
    }

    #[tokio::test]
    async fn test_success_is_stored_and_returned() {
        let url = "https://app.test/img/photo.jpg";
        let (fallback, db) = setup(StubNetwork::new().with(url, ok_response(url, "photo"))).await;

        let response = fallback.fetch_with_fallback(&Request::get(url), OFFLINE, HASH).await.unwrap();
        assert_eq!(response.body, b"photo");

        let generation = db.open_generation(HASH).await.unwrap();
        assert!(db.lookup(&generation, url).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_network_failure_serves_fallback() {
        let (fallback, _db) = setup(StubNetwork::new()).await;

        let request = Request::get("https://app.test/img/photo.jpg");
        let response = fallback.fetch_with_fallback(&request, OFFLINE, HASH).await.unwrap();
        assert_eq!(response.body, b"offline");
    }

    #[tokio::test]
    async fn test_error_status_serves_fallback() {
        let url = "https://app.test/img/photo.jpg";
        let mut missing = ok_response(url, "not found");
        missing.status = 404;
        let (fallback, db) = setup(StubNetwork::new().with(url, missing)).await;

        let response = fallback.fetch_with_fallback(&Request::get(url), OFFLINE, HASH).await.unwrap();
        assert_eq!(response.body, b"offline");

        let generation = db.open_generation(HASH).await.unwrap();
        assert!(db.lookup(&generation, url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cross_origin_redirect_serves_fallback() {
        let url = "https://app.test/img/photo.jpg";
        let (fallback, _db) =
            setup(StubNetwork::new().with(url, ok_response("https://login.test/", "sign in"))).await;

        let response = fallback.fetch_with_fallback(&Request::get(url), OFFLINE, HASH).await.unwrap();
        assert_eq!(response.body, b"offline");
    }

    #[tokio::test]
    async fn test_missing_fallback_target_is_network_error() {
        let (fallback, _db) = setup(StubNetwork::new()).await;

        let request = Request::get("https://app.test/img/photo.jpg");
        let response = fallback
            .fetch_with_fallback(&request, "https://app.test/img/none.png", HASH)
            .await
            .unwrap();
        assert!(response.is_network_error());
    }
}
