//! Error types for the Caddie core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the catalog, generation providers, and configuration domains.
//! A malformed provider reply is not an error: the normalizer turns it into a
//! degraded [`ComparisonResult`](crate::types::ComparisonResult) instead.

use std::path::PathBuf;

/// Top-level error type for the Caddie core library.
#[derive(Debug, thiserror::Error)]
pub enum CaddieError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while loading the club catalog.
///
/// These are fatal to initialization and must reach the operator.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Malformed catalog record {index}: {message}")]
    DataFormat { index: usize, message: String },

    #[error("Catalog document is not valid JSON: {message}")]
    InvalidDocument { message: String },

    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from generation provider calls.
///
/// Recoverable by the caller, who should offer a retry.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Provider {provider} returned an empty reply")]
    EmptyReply { provider: String },

    #[error("Provider {provider} is not configured")]
    ProviderUnavailable { provider: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `CaddieError`.
pub type Result<T> = std::result::Result<T, CaddieError>;
