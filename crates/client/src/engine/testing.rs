//! Test doubles shared by the engine and fetch tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::fetch::NetworkFetch;
use appcache_core::{CacheDb, Error, Generation, GenerationStore, KvStore, Manifest, ManifestVersion, Request, Response};

/// Build a manifest version, letting the caller fill in the manifest.
pub fn version(hash: &str, f: impl FnOnce(&mut Manifest)) -> ManifestVersion {
    let mut manifest = Manifest::default();
    f(&mut manifest);
    ManifestVersion { hash: hash.to_string(), manifest }
}

pub fn ok_response(url: &str, body: &str) -> Response {
    Response {
        url: url.to_string(),
        status: 200,
        content_type: Some("text/plain".to_string()),
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
    }
}

/// Canned network: known URLs answer, everything else is a transport failure.
#[derive(Default)]
pub struct StubNetwork {
    routes: HashMap<String, Response>,
    calls: Mutex<Vec<String>>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, response: Response) -> Self {
        self.routes.insert(url.to_string(), response);
        self
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkFetch for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.url.clone());
        self.routes
            .get(&request.url)
            .cloned()
            .ok_or_else(|| Error::HttpError(format!("offline: {}", request.url)))
    }
}

/// Key-value store whose every operation fails.
pub struct FailingKv;

#[async_trait]
impl KvStore for FailingKv {
    async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>, Error> {
        Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed))
    }

    async fn set(&self, _key: &str, _value: serde_json::Value) -> Result<(), Error> {
        Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed))
    }
}

/// Generation store that refuses to delete one hash.
pub struct FlakyGenerations {
    inner: Arc<CacheDb>,
    fail_hash: String,
}

impl FlakyGenerations {
    pub fn new(inner: Arc<CacheDb>, fail_hash: &str) -> Self {
        Self { inner, fail_hash: fail_hash.to_string() }
    }
}

#[async_trait]
impl GenerationStore for FlakyGenerations {
    async fn open_generation(&self, hash: &str) -> Result<Generation, Error> {
        self.inner.open_generation(hash).await
    }

    async fn lookup(&self, generation: &Generation, url: &str) -> Result<Option<Response>, Error> {
        self.inner.lookup(generation, url).await
    }

    async fn put(&self, generation: &Generation, url: &str, response: &Response) -> Result<(), Error> {
        self.inner.put(generation, url, response).await
    }

    async fn delete(&self, hash: &str) -> Result<bool, Error> {
        if hash == self.fail_hash {
            return Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed));
        }
        self.inner.delete(hash).await
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        self.inner.list().await
    }
}
