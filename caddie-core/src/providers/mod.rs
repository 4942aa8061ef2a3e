//! Generation provider implementations.
//!
//! Provides concrete implementations of the [`GenerationProvider`] trait for:
//! - OpenAI chat completions (`OpenAiCompatibleProvider`)
//! - Perplexity, which speaks the same API with its own endpoint and a
//!   JSON-only system instruction (`OpenAiCompatibleProvider`)
//! - Google Gemini (`GeminiProvider`)
//!
//! Use [`create_provider`] to instantiate one from configuration. Callers
//! hold an `Arc<dyn GenerationProvider>` and never depend on a concrete type.

pub mod gemini;
pub mod mock;
pub mod openai_compat;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::credentials::CredentialStore;
use crate::error::GenerationError;
use crate::types::ProviderId;

pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use openai_compat::OpenAiCompatibleProvider;

/// A backend that turns a prompt into a text reply.
///
/// Implementations buffer the whole reply and never retry. Every transport,
/// authentication or remote failure is reported as a [`GenerationError`].
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Send `prompt` and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Which provider this is.
    fn provider_id(&self) -> ProviderId;

    /// The model identifier requests are sent with.
    fn model_name(&self) -> &str;
}

/// Resolve the API key for a provider.
///
/// Checks, in order: the explicit `api_key` in config, the credential store
/// (under `credential_store_key`, or the provider id), then the environment
/// variable named by `api_key_env`. Returns `GenerationError::AuthFailed` if
/// none of them has a key.
pub fn resolve_api_key(
    id: ProviderId,
    config: &ProviderConfig,
    cred_store: Option<&dyn CredentialStore>,
) -> Result<String, GenerationError> {
    if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    if let Some(store) = cred_store {
        let name = config.credential_store_key.as_deref().unwrap_or(id.as_str());
        match store.get_key(name) {
            Ok(key) => return Ok(key),
            Err(e) => tracing::debug!(provider = %id, error = %e, "No key in credential store"),
        }
    }

    std::env::var(&config.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| GenerationError::AuthFailed {
            provider: format!(
                "{id} (env var '{}' not set and no stored credential found)",
                config.api_key_env
            ),
        })
}

/// Create a provider, resolving its API key first.
///
/// A missing credential fails here, at construction, not on the first call.
pub fn create_provider(
    id: ProviderId,
    config: &ProviderConfig,
    cred_store: Option<&dyn CredentialStore>,
) -> Result<Arc<dyn GenerationProvider>, GenerationError> {
    let api_key = resolve_api_key(id, config, cred_store)?;
    create_provider_with_key(id, config, api_key)
}

/// Create a provider with an already resolved API key.
pub fn create_provider_with_key(
    id: ProviderId,
    config: &ProviderConfig,
    api_key: String,
) -> Result<Arc<dyn GenerationProvider>, GenerationError> {
    Ok(match id {
        ProviderId::Gemini => Arc::new(GeminiProvider::new(config, api_key)?),
        ProviderId::OpenAi => Arc::new(OpenAiCompatibleProvider::openai(config, api_key)?),
        ProviderId::Perplexity => {
            Arc::new(OpenAiCompatibleProvider::perplexity(config, api_key)?)
        }
    })
}

/// Build the HTTP client, applying the configured timeout if there is one.
pub(crate) fn build_client(timeout_secs: Option<u64>) -> Result<reqwest::Client, GenerationError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(|e| GenerationError::Connection {
        message: format!("Failed to build HTTP client: {}", e),
    })
}

/// Convert a `reqwest` send failure into a `GenerationError`.
pub(crate) fn map_transport_error(provider: ProviderId, err: reqwest::Error) -> GenerationError {
    if err.is_connect() || err.is_timeout() {
        GenerationError::Connection {
            message: format!("{provider}: {err}"),
        }
    } else {
        GenerationError::ApiRequest {
            message: format!("Request to {provider} failed: {err}"),
        }
    }
}
