//! Google Gemini API provider.
//!
//! Key differences from OpenAI-compatible APIs:
//! - Auth via the `key` query parameter (not a header)
//! - The prompt travels as `contents[].parts[].text`
//! - A reply may be split across several text parts, which are concatenated

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{GenerationProvider, build_client, map_transport_error};
use crate::config::ProviderConfig;
use crate::error::GenerationError;
use crate::types::ProviderId;

/// The default Google Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, GenerationError> {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url,
            api_key,
            model: config.model.clone(),
        })
    }

    fn build_request_body(prompt: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }]
        })
    }

    /// URL of the `generateContent` method for the configured model.
    fn endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Concatenate the text parts of the first candidate.
    fn parse_response(body: &Value) -> Result<String, GenerationError> {
        if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
            return Err(GenerationError::ApiRequest {
                message: format!("Gemini blocked the prompt: {reason}"),
            });
        }

        let candidates = body["candidates"]
            .as_array()
            .ok_or_else(|| GenerationError::ResponseParse {
                message: "Missing 'candidates' array in response".to_string(),
            })?;

        let Some(candidate) = candidates.first() else {
            return Err(GenerationError::ResponseParse {
                message: "Empty 'candidates' array in response".to_string(),
            });
        };

        let text: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            debug!(finish_reason = ?candidate["finishReason"].as_str(), "Gemini candidate had no text");
            return Err(GenerationError::EmptyReply {
                provider: ProviderId::Gemini.to_string(),
            });
        }
        Ok(text)
    }

    /// Map an HTTP status code to the appropriate `GenerationError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> GenerationError {
        match status.as_u16() {
            401 | 403 => GenerationError::AuthFailed {
                provider: ProviderId::Gemini.to_string(),
            },
            429 => GenerationError::RateLimited {
                retry_after_secs: 30,
            },
            _ => GenerationError::ApiRequest {
                message: format!("HTTP {} from Gemini API: {}", status, body_text),
            },
        }
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = self.endpoint_url();
        let body = Self::build_request_body(prompt);

        debug!(model = %self.model, url = %url, "Sending Gemini generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(ProviderId::Gemini, e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| GenerationError::ResponseParse {
                message: format!("Failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let response_json: Value =
            serde_json::from_str(&body_text).map_err(|e| GenerationError::ResponseParse {
                message: format!("Invalid JSON in response: {}", e),
            })?;

        Self::parse_response(&response_json)
    }

    fn provider_id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
