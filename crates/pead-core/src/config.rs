//! Pipeline configuration.
//!
//! Every setting has a default. [`PipelineConfig::from_env`] overlays the
//! environment (API keys, endpoint overrides); the CLI applies its flags last.

use std::path::PathBuf;
use std::time::Duration;

use crate::drift::DEFAULT_SURPRISE_THRESHOLD;
use crate::earnings::EarningsColumns;

pub const PRICES_API_KEY_ENV: &str = "FDA_API_KEY";
pub const PRICES_URL_ENV: &str = "PEAD_PRICES_URL";
pub const CHAT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const CHAT_URL_ENV: &str = "PEAD_CHAT_URL";
pub const CHAT_MODEL_ENV: &str = "PEAD_CHAT_MODEL";

/// Connection settings for the daily price API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for PriceApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.financialdatasets.ai/prices"),
            api_key: None,
            timeout_ms: 10_000,
        }
    }
}

/// Connection and sampling settings for the chat-completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("https://api.openai.com/v1/chat/completions"),
            api_key: None,
            model: String::from("gpt-4"),
            temperature: 0.7,
            max_tokens: 500,
            timeout_ms: 60_000,
        }
    }
}

/// Full run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub columns: EarningsColumns,
    /// Surprise ratios within `[-threshold, threshold]` are Neutral.
    pub surprise_threshold: f64,
    pub top_n: usize,
    /// Minimum spacing between consecutive price requests.
    pub pacing: Duration,
    /// Calendar days added on each side of the report-date span when fetching prices.
    pub window_padding_days: u32,
    pub prices: PriceApiConfig,
    pub chat: ChatConfig,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            columns: EarningsColumns::default(),
            surprise_threshold: DEFAULT_SURPRISE_THRESHOLD,
            top_n: 3,
            pacing: Duration::from_secs(1),
            window_padding_days: 7,
            prices: PriceApiConfig::default(),
            chat: ChatConfig::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`; blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        config.prices.api_key = read(PRICES_API_KEY_ENV);
        if let Some(url) = read(PRICES_URL_ENV) {
            config.prices.base_url = url;
        }
        config.chat.api_key = read(CHAT_API_KEY_ENV);
        if let Some(url) = read(CHAT_URL_ENV) {
            config.chat.endpoint = url;
        }
        if let Some(model) = read(CHAT_MODEL_ENV) {
            config.chat.model = model;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_follow_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.surprise_threshold, 0.01);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.pacing, Duration::from_secs(1));
        assert_eq!(config.chat.model, "gpt-4");
        assert_eq!(config.chat.max_tokens, 500);
        assert!(config.prices.api_key.is_none());
    }

    #[test]
    fn environment_overlays_keys_and_endpoints() {
        let env = HashMap::from([
            (PRICES_API_KEY_ENV, "fda-secret"),
            (CHAT_API_KEY_ENV, "  "),
            (CHAT_MODEL_ENV, "gpt-4o"),
            (PRICES_URL_ENV, "http://localhost:9000/prices"),
        ]);

        let config = PipelineConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_owned()));

        assert_eq!(config.prices.api_key.as_deref(), Some("fda-secret"));
        assert_eq!(config.prices.base_url, "http://localhost:9000/prices");
        assert!(config.chat.api_key.is_none(), "blank values are ignored");
        assert_eq!(config.chat.model, "gpt-4o");
        assert_eq!(config.chat.endpoint, ChatConfig::default().endpoint);
    }
}
