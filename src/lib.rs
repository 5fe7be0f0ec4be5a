//! # Admin API Client Library
//!
//! Authenticated access to the admin backend: a credential store with
//! pluggable persistence, and a request client that attaches credentials,
//! refreshes them once per burst of 401s, and retries exactly once.
//!
//! Modules:
//! - `config`: client configuration, loading and validation
//! - `store`: credential storage back-ends and the token store
//! - `session`: the authenticated request client and refresh protocol
//! - `api`: backend auth endpoints (login, logout)
//! - `resilience`: single-flight guard

pub mod api;
pub mod config;
pub mod helpers;
pub mod observability;
pub mod resilience;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::ClientConfig;
pub use crate::session::{ApiError, AuthSession, RequestOptions, ResponseBody};
pub use crate::store::TokenStore;
