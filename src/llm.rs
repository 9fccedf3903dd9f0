//! Generative model clients.
//!
//! [`AnswerModel`] is the seam between the answer pipeline and the model
//! backend. [`GeminiClient`] calls the Gemini `generateContent` REST
//! endpoint; [`DisabledModel`] always fails, which routes every query
//! through the extractive fallback.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{Error, ModelFailure, Result};

#[async_trait]
pub trait AnswerModel: Send + Sync {
    /// Send one prompt and return the model's text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn name(&self) -> &str;
}

/// Build the model named by `llm.provider`.
pub fn create_model(config: &LlmConfig) -> Result<Box<dyn AnswerModel>> {
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiClient::from_config(config)?)),
        "disabled" => Ok(Box::new(DisabledModel)),
        other => Err(Error::Config(format!("Unknown llm provider: {}", other))),
    }
}

// ============ Disabled ============

pub struct DisabledModel;

#[async_trait]
impl AnswerModel for DisabledModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::model(
            ModelFailure::Disabled,
            "generative model is disabled",
        ))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

// ============ Gemini ============

/// Gemini REST client (`POST {base}/v1beta/models/{model}:generateContent`).
///
/// The API key is read from the environment variable named by
/// `llm.api_key_env` when the client is built. A missing key is reported
/// per call as [`ModelFailure::MissingApiKey`] so that answering still
/// falls back to extraction.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(config, api_key)
    }

    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl AnswerModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::model(
                ModelFailure::MissingApiKey,
                format!("{} is not set", self.api_key_env),
            )
        })?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            debug!(model = %self.model, attempt, "gemini generateContent");
            let resp = self
                .client
                .post(self.endpoint())
                .header("x-goog-api-key", api_key)
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await.map_err(|e| {
                            Error::model(ModelFailure::InvalidResponse, e)
                        })?;
                        return Ok(extract_text(&json));
                    }

                    let body = response.text().await.unwrap_or_default();
                    let kind = match status.as_u16() {
                        429 => ModelFailure::QuotaExceeded,
                        404 => ModelFailure::ModelNotFound,
                        code => ModelFailure::Http(code),
                    };
                    let err = Error::model(kind, format!("Gemini API error {}: {}", status, body));

                    if status.is_server_error() {
                        warn!(attempt, %status, "gemini request failed, retrying");
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(Error::model(ModelFailure::Network, e));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            Error::model(ModelFailure::Network, "Gemini request failed after retries")
        }))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Pull the answer text out of a `generateContent` response.
///
/// Tries a top-level `text` field, then the concatenated
/// `candidates[0].content.parts[*].text`, and finally falls back to the
/// raw JSON.
pub fn extract_text(response: &Value) -> String {
    if let Some(text) = response.get("text").and_then(Value::as_str) {
        if !text.is_empty() {
            return text.to_string();
        }
    }

    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array);
    if let Some(parts) = parts {
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        if !text.is_empty() {
            return text;
        }
    }

    response.to_string()
}
