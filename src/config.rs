// src/config.rs

//! Application configuration structures.
//!
//! Loaded from a TOML file with per-field defaults, so a missing file or a
//! partial file both yield a usable configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Language-model API settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Per-action rate limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Content generation settings
    #[serde(default)]
    pub content: ContentConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return defaults if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.model.api_base.trim().is_empty() {
            return Err(AppError::invalid_argument("model.api_base is empty"));
        }
        if self.model.chat_timeout_secs == 0 {
            return Err(AppError::invalid_argument(
                "model.chat_timeout_secs must be > 0",
            ));
        }
        if self.model.lookup_timeout_secs == 0 {
            return Err(AppError::invalid_argument(
                "model.lookup_timeout_secs must be > 0",
            ));
        }
        if self.model.retry_max_attempts == 0 {
            return Err(AppError::invalid_argument(
                "model.retry_max_attempts must be > 0",
            ));
        }
        if self.limits.quiz_regen_per_day == 0
            || self.limits.package_per_day == 0
            || self.limits.article_per_day == 0
            || self.limits.chat_per_minute == 0
        {
            return Err(AppError::invalid_argument("limits must all be > 0"));
        }
        if self.content.freshness_days == 0 {
            return Err(AppError::invalid_argument(
                "content.freshness_days must be > 0",
            ));
        }
        Ok(())
    }
}

/// Language-model API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Environment variable holding the API key
    #[serde(default = "defaults::api_key_env")]
    pub api_key_env: String,

    /// Chat completion model name
    #[serde(default = "defaults::chat_model")]
    pub chat_model: String,

    /// Image generation model name
    #[serde(default = "defaults::image_model")]
    pub image_model: String,

    /// Generated image dimensions
    #[serde(default = "defaults::image_size")]
    pub image_size: String,

    /// Per-attempt timeout for chat completions, in seconds
    #[serde(default = "defaults::chat_timeout")]
    pub chat_timeout_secs: u64,

    /// Timeout for image generation, in seconds
    #[serde(default = "defaults::image_timeout")]
    pub image_timeout_secs: u64,

    /// Timeout for encyclopedia/image-search lookups, in seconds
    #[serde(default = "defaults::lookup_timeout")]
    pub lookup_timeout_secs: u64,

    /// Maximum chat attempts per request
    #[serde(default = "defaults::retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds
    #[serde(default = "defaults::retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// User-Agent header for outbound requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            api_key_env: defaults::api_key_env(),
            chat_model: defaults::chat_model(),
            image_model: defaults::image_model(),
            image_size: defaults::image_size(),
            chat_timeout_secs: defaults::chat_timeout(),
            image_timeout_secs: defaults::image_timeout(),
            lookup_timeout_secs: defaults::lookup_timeout(),
            retry_max_attempts: defaults::retry_max_attempts(),
            retry_delay_ms: defaults::retry_delay_ms(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Per-action fixed-window rate limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Forced quiz regenerations per caller per day
    #[serde(default = "defaults::quiz_regen_per_day")]
    pub quiz_regen_per_day: u32,

    /// Year-news package generations per caller per day
    #[serde(default = "defaults::package_per_day")]
    pub package_per_day: u32,

    /// Article generations per caller per day
    #[serde(default = "defaults::article_per_day")]
    pub article_per_day: u32,

    /// Chat replies per caller per minute
    #[serde(default = "defaults::chat_per_minute")]
    pub chat_per_minute: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            quiz_regen_per_day: defaults::quiz_regen_per_day(),
            package_per_day: defaults::package_per_day(),
            article_per_day: defaults::article_per_day(),
            chat_per_minute: defaults::chat_per_minute(),
        }
    }
}

/// Content generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Days a generated year-news package stays fresh
    #[serde(default = "defaults::freshness_days")]
    pub freshness_days: i64,

    /// Placeholder image when every resolution stage fails
    #[serde(default = "defaults::fallback_image_url")]
    pub fallback_image_url: String,

    /// Encyclopedia summary API base URL
    #[serde(default = "defaults::wiki_summary_base")]
    pub wiki_summary_base: String,

    /// Image-search API endpoint
    #[serde(default = "defaults::commons_api_url")]
    pub commons_api_url: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            freshness_days: defaults::freshness_days(),
            fallback_image_url: defaults::fallback_image_url(),
            wiki_summary_base: defaults::wiki_summary_base(),
            commons_api_url: defaults::commons_api_url(),
        }
    }
}

mod defaults {
    // Model defaults
    pub fn api_base() -> String {
        "https://api.openai.com/v1".into()
    }
    pub fn api_key_env() -> String {
        "OPENAI_API_KEY".into()
    }
    pub fn chat_model() -> String {
        "gpt-4o-mini".into()
    }
    pub fn image_model() -> String {
        "gpt-image-1".into()
    }
    pub fn image_size() -> String {
        "1024x1024".into()
    }
    pub fn chat_timeout() -> u64 {
        60
    }
    pub fn image_timeout() -> u64 {
        60
    }
    pub fn lookup_timeout() -> u64 {
        10
    }
    pub fn retry_max_attempts() -> u32 {
        2
    }
    pub fn retry_delay_ms() -> u64 {
        600
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; rewind/1.0)".into()
    }

    // Limit defaults
    pub fn quiz_regen_per_day() -> u32 {
        25
    }
    pub fn package_per_day() -> u32 {
        40
    }
    pub fn article_per_day() -> u32 {
        100
    }
    pub fn chat_per_minute() -> u32 {
        20
    }

    // Content defaults
    pub fn freshness_days() -> i64 {
        30
    }
    pub fn fallback_image_url() -> String {
        "https://upload.wikimedia.org/wikipedia/commons/thumb/a/ac/No_image_available.svg/640px-No_image_available.svg.png".into()
    }
    pub fn wiki_summary_base() -> String {
        "https://en.wikipedia.org/api/rest_v1/page/summary".into()
    }
    pub fn commons_api_url() -> String {
        "https://commons.wikimedia.org/w/api.php".into()
    }
}
