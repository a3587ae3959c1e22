//! Core library for the VeloCare service shop console.
//!
//! - `api`: `SessionClient` with transparent one-shot token refresh
//! - `auth`: credential pair, roles and session stores
//! - `config`: base URLs, timeout and session backend

pub mod api;
pub mod auth;
pub mod config;

pub use api::{ClientError, PendingRequest, SessionClient};
pub use auth::{CredentialPair, Role, SessionStore};
pub use config::Config;
