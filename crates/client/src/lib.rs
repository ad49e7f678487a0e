//! Client code for appcache.
//!
//! This crate provides the resolution engine, session pins, generation
//! collection and the network collaborators used by the server.

pub mod engine;
pub mod fetch;

pub use engine::{
    AppCacheEngine, CleanupReport, Decision, EngineConfig, EngineParts, Registration, SessionEnvironment, SessionPins,
    SessionTable,
};

pub use fetch::{FallbackFetch, FetchClient, FetchConfig, GenerationFallback, NetworkFetch};
