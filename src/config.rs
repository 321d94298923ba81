//! Configuration for a risk-analysis run.
//!
//! Every knob lives in [`GuardConfig`], built through [`GuardConfigBuilder`].
//! The only secret, the Upstage API key, is never compiled in: it comes from
//! the caller or from the `UPSTAGE_API_KEY` environment variable via
//! [`GuardConfig::from_env`].

use crate::error::GuardError;
use crate::pipeline::chat::ChatModel;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Environment variable holding the Upstage API key.
pub const API_KEY_ENV: &str = "UPSTAGE_API_KEY";

/// Document Parse endpoint.
pub const DEFAULT_PARSE_URL: &str = "https://api.upstage.ai/v1/document-ai/document-parse";

/// OpenAI-compatible base URL of the Solar chat API.
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.upstage.ai/v1/solar";

/// Chat model used for both extraction and report generation.
pub const DEFAULT_MODEL: &str = "solar-1-mini-chat";

/// Characters of parsed text quoted back to the model in the report prompt.
pub const DEFAULT_EXCERPT_CHARS: usize = 500;

/// Configuration for a single analysis run.
///
/// # Example
/// ```rust
/// use solarguard::GuardConfig;
///
/// let config = GuardConfig::builder()
///     .api_key("up_xxx")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.excerpt_chars, 500);
/// ```
#[derive(Clone)]
pub struct GuardConfig {
    /// Bearer key for both Upstage services. Required.
    pub api_key: Option<String>,

    /// Document Parse endpoint. Default: [`DEFAULT_PARSE_URL`].
    pub parse_url: String,

    /// Base URL of the chat-completion API. Default: [`DEFAULT_CHAT_BASE_URL`].
    pub chat_base_url: String,

    /// Chat model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Route chat calls through an edgequake-llm provider ("openai",
    /// "anthropic", "gemini", "ollama", …) instead of Solar. Its own API key
    /// variable is read by the provider factory.
    pub provider_name: Option<String>,

    /// Pre-constructed chat model. Takes precedence over `provider_name`.
    pub chat_model: Option<Arc<dyn ChatModel>>,

    /// Sampling temperature. `None` leaves it to the service default.
    pub temperature: Option<f32>,

    /// Length of the parsed-text excerpt embedded in the report prompt. Default: 500.
    pub excerpt_chars: usize,

    /// Timeout for the document upload and parse, in seconds. Default: 120.
    pub parse_timeout_secs: u64,

    /// Timeout for each chat call, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Receives stage start/complete/error events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            parse_url: DEFAULT_PARSE_URL.to_string(),
            chat_base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            chat_model: None,
            temperature: None,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            parse_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("parse_url", &self.parse_url)
            .field("chat_base_url", &self.chat_base_url)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("chat_model", &self.chat_model.as_ref().map(|m| m.name().to_string()))
            .field("temperature", &self.temperature)
            .field("excerpt_chars", &self.excerpt_chars)
            .field("parse_timeout_secs", &self.parse_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl GuardConfig {
    /// Create a new builder for `GuardConfig`.
    pub fn builder() -> GuardConfigBuilder {
        GuardConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default configuration with the API key taken from `UPSTAGE_API_KEY`.
    ///
    /// Fails with [`GuardError::Config`] when the variable is unset or empty.
    pub fn from_env() -> Result<Self, GuardError> {
        let key = std::env::var(API_KEY_ENV).unwrap_or_default();
        Self::builder().api_key(key).build()
    }

    /// The API key, or a configuration error naming the variable to set.
    pub fn api_key(&self) -> Result<&str, GuardError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(GuardError::Config(format!(
                "no Upstage API key configured; set {API_KEY_ENV} or pass --api-key"
            ))),
        }
    }
}

/// Builder for [`GuardConfig`].
#[derive(Debug)]
pub struct GuardConfigBuilder {
    config: GuardConfig,
}

impl GuardConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn parse_url(mut self, url: impl Into<String>) -> Self {
        self.config.parse_url = url.into();
        self
    }

    pub fn chat_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.chat_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.config.chat_model = Some(model);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn excerpt_chars(mut self, n: usize) -> Self {
        self.config.excerpt_chars = n.max(1);
        self
    }

    pub fn parse_timeout_secs(mut self, secs: u64) -> Self {
        self.config.parse_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GuardConfig, GuardError> {
        let c = &self.config;
        c.api_key()?;
        if c.parse_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(GuardError::Config("timeouts must be at least 1 second".into()));
        }
        if c.model.trim().is_empty() {
            return Err(GuardError::Config("model must not be empty".into()));
        }
        for (name, url) in [("parse URL", &c.parse_url), ("chat base URL", &c.chat_base_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(GuardError::Config(format!(
                    "{name} must be an HTTP/HTTPS URL, got '{url}'"
                )));
            }
        }
        Ok(self.config)
    }
}
