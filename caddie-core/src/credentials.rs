//! API key storage for generation providers.
//!
//! - `KeyringCredentialStore` keeps keys in the OS credential store (macOS
//!   Keychain, Windows Credential Manager, Linux Secret Service).
//! - `InMemoryCredentialStore` is for tests and short-lived sessions.
//!
//! Keys are looked up by name, normally the provider id (`"gemini"`) unless
//! the provider config sets `credential_store_key`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Keyring service under which all Caddie keys live.
pub const KEYRING_SERVICE: &str = "caddie";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Credential not found for {service}:{account}")]
    NotFound { service: String, account: String },

    #[error("Failed to store credential: {message}")]
    StoreFailed { message: String },

    #[error("Failed to delete credential: {message}")]
    DeleteFailed { message: String },

    #[error("Keyring backend not available: {message}")]
    BackendUnavailable { message: String },
}

/// Storage backend for provider API keys.
pub trait CredentialStore: Send + Sync {
    fn store_key(&self, name: &str, api_key: &str) -> Result<(), CredentialError>;

    fn get_key(&self, name: &str) -> Result<String, CredentialError>;

    fn delete_key(&self, name: &str) -> Result<(), CredentialError>;

    fn has_key(&self, name: &str) -> bool {
        self.get_key(name).is_ok()
    }
}

/// Account name used for a key, e.g. `provider:openai`.
pub fn account_name(name: &str) -> String {
    format!("provider:{name}")
}

/// OS-native credential store backed by the `keyring` crate.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, name: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, &account_name(name)).map_err(|e| {
            CredentialError::BackendUnavailable {
                message: e.to_string(),
            }
        })
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn store_key(&self, name: &str, api_key: &str) -> Result<(), CredentialError> {
        self.entry(name)?
            .set_password(api_key)
            .map_err(|e| CredentialError::StoreFailed {
                message: e.to_string(),
            })
    }

    fn get_key(&self, name: &str) -> Result<String, CredentialError> {
        self.entry(name)?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => CredentialError::NotFound {
                service: self.service.clone(),
                account: account_name(name),
            },
            other => CredentialError::BackendUnavailable {
                message: other.to_string(),
            },
        })
    }

    fn delete_key(&self, name: &str) -> Result<(), CredentialError> {
        self.entry(name)?
            .delete_credential()
            .map_err(|e| CredentialError::DeleteFailed {
                message: e.to_string(),
            })
    }
}

/// Process-local credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    keys: Mutex<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn store_key(&self, name: &str, api_key: &str) -> Result<(), CredentialError> {
        self.keys().insert(account_name(name), api_key.to_string());
        Ok(())
    }

    fn get_key(&self, name: &str) -> Result<String, CredentialError> {
        let account = account_name(name);
        self.keys()
            .get(&account)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound {
                service: KEYRING_SERVICE.to_string(),
                account,
            })
    }

    fn delete_key(&self, name: &str) -> Result<(), CredentialError> {
        self.keys().remove(&account_name(name));
        Ok(())
    }
}
