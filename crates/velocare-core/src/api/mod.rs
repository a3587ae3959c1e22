//! REST API client module for the VeloCare backend.
//!
//! This module provides the `SessionClient`, which attaches the stored
//! bearer token to every call and recovers once from an expired token
//! through the refresh endpoint.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod request;

pub use client::{SessionClient, SessionClientBuilder};
pub use error::ClientError;
pub use request::{Attempt, PendingRequest};
