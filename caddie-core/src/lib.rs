//! # Caddie Core
//!
//! Core library for Caddie, a golf club comparison assistant.
//! Provides the club catalog, prompt construction, LLM provider clients,
//! the reply normalizer, configuration, and the comparison pipeline that
//! ties them together.

pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod types;

// Re-export commonly used types at the crate root.
pub use catalog::{Brand, Catalog, CatalogItem, ItemKey, display_category};
pub use config::{CaddieConfig, ProviderConfig, load_config};
pub use credentials::{CredentialStore, InMemoryCredentialStore, KeyringCredentialStore};
pub use error::{CaddieError, CatalogError, ConfigError, GenerationError, Result};
pub use normalize::normalize;
pub use pipeline::{ComparisonPipeline, ProviderRegistry};
pub use prompt::build_prompt;
pub use providers::{GenerationProvider, MockProvider, create_provider};
pub use types::{ComparisonRequest, ComparisonResult, ItemDescriptor, ProsCons, ProviderId};
