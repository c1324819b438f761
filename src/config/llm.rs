use std::time::Duration;

use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_env};
use crate::error::ConfigError;
use crate::settings::Settings;

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "x-ai/grok-4-fast:free";
pub const DEFAULT_REFERER: &str = "http://localhost:5173";
pub const DEFAULT_TITLE: &str = "Sui Chat Wallet";

/// Model gateway configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    /// `OPEN_ROUTER_TOKEN`. Checked per request, not at startup.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub referer: String,
    pub title: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl LlmConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let llm = &settings.llm;

        let base_url = optional_env("OPENAI_BASE_URL")?
            .or_else(|| llm.base_url.clone())
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();

        let temperature = parse_env::<f32>("LLM_TEMPERATURE", "a number")?
            .unwrap_or(llm.temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TEMPERATURE".to_string(),
                message: format!("must be between 0 and 2, got {temperature}"),
            });
        }

        let timeout_secs = parse_env::<u64>("LLM_TIMEOUT_SECS", "a positive integer")?
            .unwrap_or(llm.timeout_secs);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TIMEOUT_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let max_retries = parse_env::<u32>("LLM_MAX_RETRIES", "a non-negative integer")?
            .unwrap_or(llm.max_retries);

        let retry_backoff_ms =
            parse_env::<u64>("LLM_RETRY_BACKOFF_MS", "a non-negative integer")?
                .unwrap_or(llm.retry_backoff_ms);

        Ok(Self {
            base_url,
            api_key: optional_env("OPEN_ROUTER_TOKEN")?.map(SecretString::from),
            model: optional_env("OPENAI_MODEL")?
                .or_else(|| llm.model.clone())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            referer: optional_env("FRONTEND_URL")?
                .or_else(|| llm.referer.clone())
                .unwrap_or_else(|| DEFAULT_REFERER.to_string()),
            title: optional_env("X_TITLE")?
                .or_else(|| llm.title.clone())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            temperature,
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            retry_backoff: Duration::from_millis(retry_backoff_ms),
        })
    }

    /// Full chat-completions endpoint URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
            temperature: 0.2,
            timeout: Duration::from_secs(60),
            max_retries: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}
