//! Configuration system for Caddie.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! environment -> explicit overrides. Configuration is loaded from
//! `~/.config/caddie/config.toml` and/or `.caddie/config.toml` in the
//! workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::ProviderId;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaddieConfig {
    /// Provider used when a request does not name one.
    pub default_provider: ProviderId,
    pub catalog: CatalogConfig,
    pub providers: ProvidersConfig,
}

/// Where the club catalog is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON array-of-objects catalog file. Relative paths resolve against the
    /// workspace.
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/golf_catalog.json"),
        }
    }
}

impl CatalogConfig {
    pub fn resolve(&self, workspace: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            workspace.join(&self.path)
        }
    }
}

/// One entry per supported provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub gemini: ProviderConfig,
    pub openai: ProviderConfig,
    pub perplexity: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            gemini: ProviderConfig::defaults_for(ProviderId::Gemini),
            openai: ProviderConfig::defaults_for(ProviderId::OpenAi),
            perplexity: ProviderConfig::defaults_for(ProviderId::Perplexity),
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, id: ProviderId) -> &ProviderConfig {
        match id {
            ProviderId::Gemini => &self.gemini,
            ProviderId::OpenAi => &self.openai,
            ProviderId::Perplexity => &self.perplexity,
        }
    }

    pub fn get_mut(&mut self, id: ProviderId) -> &mut ProviderConfig {
        match id {
            ProviderId::Gemini => &mut self.gemini,
            ProviderId::OpenAi => &mut self.openai,
            ProviderId::Perplexity => &mut self.perplexity,
        }
    }
}

/// Generation provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model identifier (e.g., "gemini-1.5-pro", "sonar-pro").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Explicit API key. Prefer the environment or the credential store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout. `None` keeps the HTTP client default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Name of the key in the OS credential store, checked before the
    /// environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_store_key: Option<String>,
}

impl ProviderConfig {
    /// Built-in settings for a provider.
    pub fn defaults_for(id: ProviderId) -> Self {
        let (model, api_key_env, timeout_secs) = match id {
            ProviderId::Gemini => ("gemini-1.5-pro", "GEMINI_API_KEY", None),
            ProviderId::OpenAi => ("gpt-3.5-turbo", "OPENAI_API_KEY", None),
            ProviderId::Perplexity => ("sonar-pro", "PERPLEXITY_API_KEY", Some(60)),
        };
        Self {
            model: model.to_string(),
            api_key_env: api_key_env.to_string(),
            api_key: None,
            base_url: None,
            timeout_secs,
            credential_store_key: None,
        }
    }

    /// Validate this provider config and return any warnings.
    ///
    /// An empty Vec means the config looks fine.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.model.trim().is_empty() {
            warnings.push("model is empty; the provider will reject requests".to_string());
        }
        if self.api_key.is_none() && self.api_key_env.trim().is_empty() {
            warnings.push(
                "neither api_key nor api_key_env is set; only the credential store can supply a key"
                    .to_string(),
            );
        }
        if let Some(url) = &self.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!("base_url '{url}' is not an http(s) URL"));
        }
        if self.timeout_secs == Some(0) {
            warnings.push("timeout_secs is 0; every request will time out".to_string());
        }
        warnings
    }
}

/// Path of the user-level config file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "caddie", "caddie")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".caddie").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `CADDIE_`, `__` for nesting)
/// 3. Workspace-local config (`.caddie/config.toml`)
/// 4. User config (`~/.config/caddie/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&CaddieConfig>,
) -> Result<CaddieConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(CaddieConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // CADDIE_DEFAULT_PROVIDER, CADDIE_PROVIDERS__GEMINI__MODEL, etc.
    figment = figment.merge(Env::prefixed("CADDIE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract()?)
}
