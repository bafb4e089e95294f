//! Language-model client.
//!
//! The [`LanguageModel`] trait is the seam between generators and the
//! OpenAI-compatible HTTP client, so every generator can run against a
//! scripted fake in tests. JSON repair and the retry policy live here,
//! independent of any network code.

pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ModelConfig;
use crate::error::{AppError, Result};

pub use openai::OpenAiClient;

/// One turn of a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Retry policy for chat requests: bounded attempts with a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_millis(600),
        }
    }
}

/// Parse model output as JSON, tolerating prose or markdown fences around
/// the object: when the strict parse fails, retry once on the substring
/// between the first `{` and the last `}`.
pub fn lenient_json(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::internal("empty model reply"));
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(_) => {
            let start = trimmed.find('{');
            let end = trimmed.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if end > start => {
                    serde_json::from_str(&trimmed[start..=end])
                        .map_err(|e| AppError::internal(format!("unparseable model JSON: {e}")))
                }
                _ => Err(AppError::internal("no JSON object in model reply")),
            }
        }
    }
}

/// Chat and image access to the language-model API.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// JSON-mode completion for a single prompt; returns the parsed object.
    async fn chat_json(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<Value>;

    /// Plain completion over a message history.
    async fn chat(&self, messages: &[ChatMessage], max_tokens: u32, temperature: f32)
        -> Result<String>;

    /// One-shot image generation. Returns a readable URL, or an empty
    /// string on any failure.
    async fn generate_image(&self, prompt: &str, storage_path: &str) -> String;

    /// Whether the client has credentials to make live calls.
    fn is_configured(&self) -> bool {
        true
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_json_strict() {
        assert_eq!(lenient_json(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_lenient_json_prose_wrapped() {
        let content = "Sure! Here is the JSON you asked for:\n{\"questions\": []}\nHope it helps.";
        assert_eq!(lenient_json(content).unwrap(), json!({"questions": []}));
    }

    #[test]
    fn test_lenient_json_markdown_fenced() {
        let content = "```json\n{\"hero\": [1, 2]}\n```";
        assert_eq!(lenient_json(content).unwrap(), json!({"hero": [1, 2]}));
    }

    #[test]
    fn test_lenient_json_nested_braces() {
        let content = "prefix {\"outer\": {\"inner\": true}} suffix";
        assert_eq!(
            lenient_json(content).unwrap(),
            json!({"outer": {"inner": true}})
        );
    }

    #[test]
    fn test_lenient_json_rejects_empty() {
        assert!(lenient_json("   ").is_err());
    }

    #[test]
    fn test_lenient_json_rejects_hopeless() {
        assert!(lenient_json("no braces here").is_err());
        assert!(lenient_json("{ broken").is_err());
    }

    #[test]
    fn test_retry_policy_floor() {
        let mut config = ModelConfig::default();
        config.retry_max_attempts = 0;
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 1);
    }
}
