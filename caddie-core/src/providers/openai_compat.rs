//! OpenAI-compatible chat completions provider.
//!
//! Serves both OpenAI and Perplexity; they differ only in base URL, model,
//! credential and, for Perplexity, a system message that forces a bare JSON
//! reply.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{GenerationProvider, build_client, map_transport_error};
use crate::config::ProviderConfig;
use crate::error::GenerationError;
use crate::prompt::JSON_ONLY_SYSTEM_INSTRUCTION;
use crate::types::ProviderId;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

/// OpenAI-compatible provider.
pub struct OpenAiCompatibleProvider {
    id: ProviderId,
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    system_instruction: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// OpenAI chat completions.
    pub fn openai(config: &ProviderConfig, api_key: String) -> Result<Self, GenerationError> {
        Self::build(ProviderId::OpenAi, OPENAI_BASE_URL, None, config, api_key)
    }

    /// Perplexity, with the JSON-only system instruction.
    pub fn perplexity(config: &ProviderConfig, api_key: String) -> Result<Self, GenerationError> {
        Self::build(
            ProviderId::Perplexity,
            PERPLEXITY_BASE_URL,
            Some(JSON_ONLY_SYSTEM_INSTRUCTION),
            config,
            api_key,
        )
    }

    fn build(
        id: ProviderId,
        default_base_url: &str,
        system_instruction: Option<&str>,
        config: &ProviderConfig,
        api_key: String,
    ) -> Result<Self, GenerationError> {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(default_base_url)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            id,
            client: build_client(config.timeout_secs)?,
            base_url,
            api_key,
            model: config.model.clone(),
            system_instruction: system_instruction.map(str::to_string),
        })
    }

    fn build_request_body(&self, prompt: &str) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_instruction {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        })
    }

    /// Pull the assistant text out of a chat completions body.
    fn parse_response(id: ProviderId, body: &Value) -> Result<String, GenerationError> {
        let choice = body
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| GenerationError::ResponseParse {
                message: "No choices in response".to_string(),
            })?;

        let text = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or("");

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyReply {
                provider: id.to_string(),
            });
        }
        Ok(text.to_string())
    }

    /// Map an HTTP status code to the appropriate GenerationError.
    fn map_http_error(id: ProviderId, status: reqwest::StatusCode, body: &str) -> GenerationError {
        match status.as_u16() {
            401 | 403 => {
                debug!(provider = %id, body = %body, "Authentication failed");
                GenerationError::AuthFailed {
                    provider: id.to_string(),
                }
            }
            429 => {
                // "Rate limit reached ... Please try again in 20s."
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string))
                    .and_then(|msg| {
                        msg.split("in ")
                            .last()
                            .map(|s| s.trim().trim_end_matches('.').trim_end_matches('s'))
                            .and_then(|s| s.parse::<u64>().ok())
                    })
                    .unwrap_or(5);
                GenerationError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            status if status >= 500 => GenerationError::ApiRequest {
                message: format!("Server error ({}) from {}: {}", status, id, body),
            },
            _ => GenerationError::ApiRequest {
                message: format!("HTTP {} from {}: {}", status, id, body),
            },
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenAiCompatibleProvider {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(prompt);

        debug!(provider = %self.id, url = %url, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(self.id, e))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| GenerationError::ApiRequest {
                message: format!("Failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            return Err(Self::map_http_error(self.id, status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| GenerationError::ResponseParse {
                message: format!("Invalid JSON: {}", e),
            })?;

        Self::parse_response(self.id, &json)
    }

    fn provider_id(&self) -> ProviderId {
        self.id
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
