//! The comparison pipeline: prompt -> provider -> normalizer.
//!
//! Each comparison owns its prompt and reply. Nothing is cached or shared
//! between calls, and identical concurrent requests are not de-duplicated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CaddieConfig;
use crate::credentials::CredentialStore;
use crate::error::GenerationError;
use crate::normalize::normalize;
use crate::prompt::build_prompt;
use crate::providers::{GenerationProvider, create_provider};
use crate::types::{ComparisonRequest, ComparisonResult, ProviderId};

/// Runs comparisons against a single provider.
pub struct ComparisonPipeline {
    provider: Arc<dyn GenerationProvider>,
}

impl std::fmt::Debug for ComparisonPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparisonPipeline").finish_non_exhaustive()
    }
}

impl ComparisonPipeline {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn GenerationProvider> {
        &self.provider
    }

    /// Run one comparison.
    ///
    /// Provider failures are returned as errors. A reply that cannot be
    /// parsed still produces a (degraded) result.
    pub async fn compare(
        &self,
        request: &ComparisonRequest,
    ) -> Result<ComparisonResult, GenerationError> {
        let provider_id = self.provider.provider_id();
        if request.provider != provider_id {
            warn!(
                requested = %request.provider,
                actual = %provider_id,
                "Request names a different provider than this pipeline uses"
            );
        }

        let prompt = build_prompt(request);
        let started = Instant::now();
        let reply = self.provider.generate(&prompt).await?;
        let result = normalize(&reply);

        info!(
            provider = %provider_id,
            model = %self.provider.model_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            entries = result.per_item.len(),
            degraded = result.is_degraded(),
            "Comparison finished"
        );
        Ok(result)
    }

    /// Run a comparison on the tokio runtime.
    ///
    /// Dropping the handle abandons interest only: the provider call runs to
    /// completion and its result is discarded.
    pub fn spawn_compare(
        self: &Arc<Self>,
        request: ComparisonRequest,
    ) -> JoinHandle<Result<ComparisonResult, GenerationError>> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.compare(&request).await })
    }
}

/// One pipeline per configured provider, selected by the request's
/// `provider` field.
#[derive(Default)]
pub struct ProviderRegistry {
    pipelines: HashMap<ProviderId, Arc<ComparisonPipeline>>,
    unavailable: HashMap<ProviderId, String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every provider in `config`.
    ///
    /// Providers that fail to initialize (usually a missing key) are
    /// remembered, so a later request for them reports why. Only that
    /// request is an error; an unused provider without a key is not.
    pub fn from_config(config: &CaddieConfig, cred_store: Option<&dyn CredentialStore>) -> Self {
        let mut registry = Self::new();
        for id in ProviderId::ALL {
            match create_provider(id, config.providers.get(id), cred_store) {
                Ok(provider) => registry.register(provider),
                Err(e) => {
                    debug!(provider = %id, error = %e, "Provider unavailable");
                    registry.unavailable.insert(id, e.to_string());
                }
            }
        }
        registry
    }

    /// Add or replace the pipeline for the provider's id.
    pub fn register(&mut self, provider: Arc<dyn GenerationProvider>) {
        let id = provider.provider_id();
        self.unavailable.remove(&id);
        self.pipelines
            .insert(id, Arc::new(ComparisonPipeline::new(provider)));
    }

    /// Configured providers, in `ProviderId::ALL` order.
    pub fn available(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.pipelines.contains_key(id))
            .collect()
    }

    pub fn pipeline(&self, id: ProviderId) -> Result<Arc<ComparisonPipeline>, GenerationError> {
        self.pipelines.get(&id).cloned().ok_or_else(|| {
            let provider = match self.unavailable.get(&id) {
                Some(reason) => format!("{id} ({reason})"),
                None => id.to_string(),
            };
            GenerationError::ProviderUnavailable { provider }
        })
    }

    pub async fn compare(
        &self,
        request: &ComparisonRequest,
    ) -> Result<ComparisonResult, GenerationError> {
        self.pipeline(request.provider)?.compare(request).await
    }

    pub fn spawn_compare(
        &self,
        request: ComparisonRequest,
    ) -> Result<JoinHandle<Result<ComparisonResult, GenerationError>>, GenerationError> {
        Ok(self.pipeline(request.provider)?.spawn_compare(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;
    use crate::types::ItemDescriptor;
    use std::time::Duration;

    const REPLY: &str = r#"```json
{"proscons":{"Ping G430 (2023)":{"pros":["long"],"cons":["pricey"]},"Callaway Paradym (2023)":{"pros":["forgiving"],"cons":["spin"]},"summary":"Both suit high handicaps."}}
```"#;

    fn request(provider: ProviderId) -> ComparisonRequest {
        ComparisonRequest {
            item1: ItemDescriptor::new("Ping", "G430", 2023),
            item2: ItemDescriptor::new("Callaway", "Paradym", 2023),
            player_skill_level: 24,
            category: "DRIVER".into(),
            extra_notes: String::new(),
            provider,
        }
    }

    #[tokio::test]
    async fn test_compare_sends_prompt_and_normalizes() {
        let mock = Arc::new(MockProvider::with_response(ProviderId::Gemini, REPLY));
        let pipeline = ComparisonPipeline::new(mock.clone());

        let result = pipeline.compare(&request(ProviderId::Gemini)).await.unwrap();
        assert_eq!(result.summary, "Both suit high handicaps.");
        assert_eq!(result.per_item.len(), 2);

        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("\"Ping G430 (2023)\""));
        assert!(prompts[0].contains("a 24 handicap"));
    }

    #[tokio::test]
    async fn test_provider_error_is_returned_not_normalized() {
        let mock = Arc::new(MockProvider::new(ProviderId::OpenAi));
        mock.queue_error(GenerationError::AuthFailed {
            provider: "openai".into(),
        });
        let pipeline = ComparisonPipeline::new(mock);
        let err = pipeline
            .compare(&request(ProviderId::OpenAi))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::AuthFailed { .. }));
    }

    #[tokio::test]
    async fn test_bad_reply_degrades() {
        let mock = Arc::new(MockProvider::with_response(
            ProviderId::Gemini,
            "I cannot help with that.",
        ));
        let pipeline = ComparisonPipeline::new(mock);
        let result = pipeline.compare(&request(ProviderId::Gemini)).await.unwrap();
        assert!(result.is_degraded());
        assert!(result.summary.contains("I cannot help with that."));
    }

    #[tokio::test]
    async fn test_spawn_compare_runs_off_caller() {
        let mock = Arc::new(MockProvider::with_response(ProviderId::Gemini, REPLY));
        let pipeline = Arc::new(ComparisonPipeline::new(mock));
        let handle = pipeline.spawn_compare(request(ProviderId::Gemini));
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.per_item.len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_handle_lets_call_finish() {
        let mock = Arc::new(
            MockProvider::with_response(ProviderId::Gemini, REPLY)
                .with_delay(Duration::from_millis(50)),
        );
        let pipeline = Arc::new(ComparisonPipeline::new(mock.clone()));

        let handle = pipeline.spawn_compare(request(ProviderId::Gemini));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(mock.prompts().len(), 1);
        assert_eq!(mock.completed(), 0);
        drop(handle);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(mock.completed(), 1);
    }

    #[tokio::test]
    async fn test_registry_selects_by_request_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider::with_response(ProviderId::Gemini, REPLY)));
        registry.register(Arc::new(MockProvider::with_response(
            ProviderId::Perplexity,
            "not json",
        )));

        assert_eq!(
            registry.available(),
            vec![ProviderId::Gemini, ProviderId::Perplexity]
        );

        let gemini = registry.compare(&request(ProviderId::Gemini)).await.unwrap();
        assert!(!gemini.is_degraded());
        let perplexity = registry
            .compare(&request(ProviderId::Perplexity))
            .await
            .unwrap();
        assert!(perplexity.is_degraded());

        let err = registry
            .compare(&request(ProviderId::OpenAi))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ProviderUnavailable { .. }));
    }

    #[test]
    fn test_registry_from_config_records_missing_keys() {
        let mut config = CaddieConfig::default();
        for id in ProviderId::ALL {
            config.providers.get_mut(id).api_key_env = "CADDIE_REGISTRY_TEST_NO_SUCH_KEY".into();
        }
        config.providers.gemini.api_key = Some("g-key".into());

        let registry = ProviderRegistry::from_config(&config, None);
        assert_eq!(registry.available(), vec![ProviderId::Gemini]);
        match registry.pipeline(ProviderId::Perplexity) {
            Err(GenerationError::ProviderUnavailable { provider }) => {
                assert!(provider.starts_with("perplexity"));
                assert!(provider.contains("CADDIE_REGISTRY_TEST_NO_SUCH_KEY"));
            }
            Err(other) => panic!("Expected ProviderUnavailable, got {:?}", other),
            Ok(_) => panic!("Expected ProviderUnavailable, got a pipeline"),
        }
    }
}
