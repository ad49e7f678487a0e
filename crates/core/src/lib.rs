//! Core types and shared functionality for appcache.
//!
//! This crate provides:
//! - Manifest, version history and registry data model
//! - Manifest text parsing
//! - SQLite-backed key-value and cache-generation stores
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod request;

pub use cache::{CacheDb, Generation, GenerationStore, KvStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::{Manifest, ManifestVersion, NETWORK_WILDCARD, Registry, VersionHistory, parse_manifest};
pub use request::{Request, RequestMode, Response};
