//! MCP tool implementations.
//!
//! This module contains all tools exposed by the appcache server.

pub mod cleanup;
pub mod fetch;
pub mod register;
pub mod request;
pub mod resolve;
pub mod session;

pub use fetch::FetchParams;
pub use register::RegisterParams;
pub use request::RequestParams;
pub use session::SessionParams;
