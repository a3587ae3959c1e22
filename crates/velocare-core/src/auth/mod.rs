//! Authentication module for credentials and session state.
//!
//! This module provides:
//! - `CredentialPair`, `Role`: what login produces and which endpoints to use
//! - `SessionStore`: injected get/set/clear storage for the current pair
//! - `MemorySessionStore`, `FileSessionStore`, `KeyringSessionStore`
//!
//! Access tokens are never checked for expiry locally; the server's 401
//! is the only signal.

pub mod credentials;
pub mod keychain;
pub mod session;

pub use credentials::{CredentialPair, Role};
pub use keychain::KeyringSessionStore;
pub use session::{FileSessionStore, MemorySessionStore, SessionFile, SessionStore};
