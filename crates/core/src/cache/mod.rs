//! SQLite-backed persistence for the engine.
//!
//! This module provides a persistent store using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Key-value JSON documents (registrations, version histories, session pins)
//! - Cache generations keyed by manifest version hash
//! - Content-derived version hashes using SHA-256
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod generations;
pub mod hash;
pub mod kv;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use generations::{Generation, GenerationStore};
pub use kv::{KvStore, REGISTRY_KEY, SESSION_PINS_KEY};
