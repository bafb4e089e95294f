//! OpenAI-compatible HTTP client.
//!
//! Chat completions run in JSON mode with a bounded retry loop; image
//! generation is one-shot and degrades to an empty URL on every failure
//! path, since callers always have a placeholder to fall back to.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

use crate::config::ModelConfig;
use crate::error::{AppError, Result};
use crate::store::ObjectStore;
use crate::utils::text::normalize_ws;

use super::{lenient_json, ChatMessage, LanguageModel, RetryPolicy};

/// Client for an OpenAI-compatible chat/image API.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    chat_model: String,
    image_model: String,
    image_size: String,
    chat_timeout: Duration,
    image_timeout: Duration,
    retry: RetryPolicy,
    objects: Arc<dyn ObjectStore>,
}

impl OpenAiClient {
    /// Build a client from configuration, reading the API key from the
    /// configured environment variable. An absent key yields an
    /// unconfigured client; calls will fail until one is provided.
    pub fn from_config(config: &ModelConfig, objects: Arc<dyn ObjectStore>) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        Self::new(config, api_key, objects)
    }

    /// Build a client with an explicit API key.
    pub fn new(
        config: &ModelConfig,
        api_key: impl Into<String>,
        objects: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
            chat_model: config.chat_model.clone(),
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
            chat_timeout: Duration::from_secs(config.chat_timeout_secs),
            image_timeout: Duration::from_secs(config.image_timeout_secs),
            retry: RetryPolicy::from_config(config),
            objects,
        })
    }

    /// One chat-completion attempt; returns the raw reply text.
    async fn chat_attempt(&self, body: &Value) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .timeout(self.chat_timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::internal(format!(
                "chat completion failed with status {status}"
            )));
        }

        let payload: Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(AppError::internal("empty model reply"));
        }
        Ok(content.to_string())
    }

    /// Run the retry loop around a chat body. Attempts are sequential with
    /// a fixed inter-attempt delay; the last error wins.
    async fn chat_with_retry(&self, body: Value) -> Result<String> {
        if !self.is_configured() {
            return Err(AppError::failed_precondition("model API key is not set"));
        }

        let mut last_error = AppError::internal("chat retries exhausted");
        for attempt in 1..=self.retry.max_attempts {
            match self.chat_attempt(&body).await {
                Ok(content) => return Ok(content),
                Err(error) => {
                    log::warn!("chat attempt {attempt} failed: {error}");
                    last_error = error;
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn chat_json(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<Value> {
        let body = json!({
            "model": self.chat_model,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "messages": [
                { "role": "system", "content": "You output strict JSON only." },
                { "role": "user", "content": prompt },
            ],
            "response_format": { "type": "json_object" },
        });

        let content = self.chat_with_retry(body).await?;
        lenient_json(&content)
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let body = json!({
            "model": self.chat_model,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "messages": messages,
        });

        self.chat_with_retry(body).await
    }

    async fn generate_image(&self, prompt: &str, storage_path: &str) -> String {
        if !self.is_configured() {
            return String::new();
        }

        let body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "size": self.image_size,
        });

        let response = match self
            .http
            .post(format!("{}/images/generations", self.api_base))
            .bearer_auth(&self.api_key)
            .timeout(self.image_timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                log::warn!("image generation failed with status {}", response.status());
                return String::new();
            }
            Err(error) => {
                log::warn!("image generation transport error: {error}");
                return String::new();
            }
        };

        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(error) => {
                log::warn!("image generation payload error: {error}");
                return String::new();
            }
        };

        let first = &payload["data"][0];
        let direct_url = normalize_ws(first["url"].as_str().unwrap_or_default());
        if !direct_url.is_empty() {
            return direct_url;
        }

        let base64_image = normalize_ws(first["b64_json"].as_str().unwrap_or_default());
        if base64_image.is_empty() || storage_path.is_empty() {
            return String::new();
        }

        let bytes = match base64::engine::general_purpose::STANDARD.decode(base64_image) {
            Ok(bytes) => bytes,
            Err(error) => {
                log::warn!("image payload base64 decode failed: {error}");
                return String::new();
            }
        };

        match self.objects.put_image(storage_path, bytes).await {
            Ok(url) => url,
            Err(error) => {
                log::warn!("image upload failed: {error}");
                String::new()
            }
        }
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
