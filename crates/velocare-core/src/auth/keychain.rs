use anyhow::{Context, Result};
use keyring::Entry;

use super::{CredentialPair, SessionStore};

const SERVICE_NAME: &str = "velocare";

/// Keychain account the pair is stored under
const SESSION_ACCOUNT: &str = "session";

/// Keeps the credential pair in the OS keychain.
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    account: String,
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new(SESSION_ACCOUNT)
    }
}

impl KeyringSessionStore {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl SessionStore for KeyringSessionStore {
    fn get(&self) -> Result<Option<CredentialPair>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let pair = serde_json::from_str(&secret)
                    .context("Failed to parse session from keychain")?;
                Ok(Some(pair))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve session from keychain"),
        }
    }

    fn set(&self, pair: &CredentialPair) -> Result<()> {
        let secret = serde_json::to_string(pair)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store session in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}
