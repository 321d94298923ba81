//! The chat-model seam.
//!
//! Both model-facing stages talk to a [`ChatModel`]: an ordered list of
//! role-tagged messages in, the reply text out. The pipeline never depends on
//! a concrete backend, so tests drive it with scripted replies.
//!
//! Two implementations ship with the crate:
//!
//! * [`SolarChat`], the default. Speaks the OpenAI-compatible
//!   `/chat/completions` protocol of the Upstage Solar API with a bearer key.
//! * [`ProviderChat`] wraps any `edgequake_llm` provider (OpenAI, Anthropic,
//!   Gemini, Ollama, …) chosen by name.

use crate::config::GuardConfig;
use crate::error::GuardError;
use crate::pipeline::http::{check_status, transport_error};
use async_trait::async_trait;
use edgequake_llm::{CompletionOptions, LLMProvider, LlmError, ProviderFactory};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Service label for the Solar chat endpoint.
pub const SERVICE: &str = "chat-completions";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat-completion backend: messages in, reply text out.
///
/// Implementations must treat the reply as opaque text; interpreting it is
/// the calling stage's job.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Label used in logs and errors.
    fn name(&self) -> &str;

    /// Submit `messages` and return the content of the first completion choice.
    async fn complete(&self, messages: &[Message]) -> Result<String, GuardError>;
}

// ── Solar (OpenAI-compatible HTTP) ───────────────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat client for the Upstage Solar API (or any OpenAI-compatible server).
#[derive(Clone)]
pub struct SolarChat {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl SolarChat {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatModel for SolarChat {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, GuardError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let response = check_status(SERVICE, response).await?;
        let body: CompletionResponse = response.json().await.map_err(|e| GuardError::Model {
            service: SERVICE.to_string(),
            detail: format!("malformed JSON: {e}"),
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GuardError::Model {
                service: SERVICE.to_string(),
                detail: "response carried no completion choice".into(),
            })?;

        debug!("{}: {} chars reply", self.model, content.chars().count());
        Ok(content)
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Adapter running the pipeline's chat calls on an `edgequake_llm` provider.
pub struct ProviderChat {
    label: String,
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl ProviderChat {
    pub fn new(label: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            label: label.into(),
            provider,
            options: CompletionOptions::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.options.temperature = temperature;
        self
    }

    /// Instantiate a named provider with the given model.
    ///
    /// The provider factory reads that provider's own API key variable
    /// (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …).
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, GuardError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            GuardError::Config(format!("LLM provider '{provider_name}' is not configured: {e}"))
        })?;
        Ok(Self::new(format!("{provider_name}/{model}"), provider))
    }
}

#[async_trait]
impl ChatModel for ProviderChat {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, GuardError> {
        let converted: Vec<edgequake_llm::ChatMessage> = messages
            .iter()
            .map(|m| match m.role {
                Role::System => edgequake_llm::ChatMessage::system(m.content.as_str()),
                Role::User => edgequake_llm::ChatMessage::user(m.content.as_str()),
            })
            .collect();

        let response = self
            .provider
            .chat(&converted, Some(&self.options))
            .await
            .map_err(|e| provider_error(&self.label, e))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Classify an `edgequake_llm` failure the same way the HTTP path does.
///
/// Rejected credentials become `Auth` (not retryable). Transport failures and
/// timeouts become `Network`. A missing provider setup becomes `Config`.
/// Everything else becomes `Model`.
fn provider_error(label: &str, err: LlmError) -> GuardError {
    let detail = format!("{label}: {err}");
    match err {
        LlmError::AuthError(_) => GuardError::Auth {
            service: SERVICE.to_string(),
            status: 401,
            detail,
        },
        LlmError::NetworkError(_) | LlmError::Timeout => GuardError::Network {
            service: SERVICE.to_string(),
            detail,
        },
        LlmError::ConfigError(_) => GuardError::Config(detail),
        _ => GuardError::Model {
            service: SERVICE.to_string(),
            detail,
        },
    }
}

/// Resolve the chat model for a run, from most-specific to least-specific:
///
/// 1. a pre-built model on the config (tests, custom middleware),
/// 2. a named edgequake-llm provider with the configured model,
/// 3. Solar over HTTP with the Upstage key.
pub fn resolve_chat_model(config: &GuardConfig) -> Result<Arc<dyn ChatModel>, GuardError> {
    if let Some(ref model) = config.chat_model {
        return Ok(Arc::clone(model));
    }

    if let Some(ref name) = config.provider_name {
        let chat = ProviderChat::from_name(name, &config.model)?
            .with_temperature(config.temperature);
        return Ok(Arc::new(chat));
    }

    let chat = SolarChat::new(&config.chat_base_url, config.api_key()?, &config.model)
        .with_temperature(config.temperature);
    Ok(Arc::new(chat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn messages_serialise_with_lowercase_roles() {
        let msgs = vec![Message::system("rules"), Message::user("text")];
        let json = serde_json::to_value(&msgs).unwrap();
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[1]["role"], "user");
        assert_eq!(json[1]["content"], "text");
    }

    #[test]
    fn request_omits_unset_temperature() {
        let msgs = vec![Message::user("hi")];
        let req = CompletionRequest {
            model: "solar-1-mini-chat",
            messages: &msgs,
            temperature: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["model"], "solar-1-mini-chat");
    }

    #[test]
    fn endpoint_joins_base_url() {
        let chat = SolarChat::new("https://api.upstage.ai/v1/solar/", "k", "m");
        assert_eq!(chat.endpoint(), "https://api.upstage.ai/v1/solar/chat/completions");
    }

    #[test]
    fn provider_auth_failure_is_not_retryable() {
        let err = provider_error(
            "openai/gpt-4.1-mini",
            LlmError::AuthError("invalid api key".into()),
        );
        assert!(matches!(err, GuardError::Auth { .. }));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("openai/gpt-4.1-mini"));
    }

    #[test]
    fn provider_failures_keep_the_chat_service_label() {
        let cases = [
            (LlmError::NetworkError("connection reset".into()), ErrorKind::Network),
            (LlmError::Timeout, ErrorKind::Network),
            (LlmError::ConfigError("OPENAI_API_KEY not set".into()), ErrorKind::Config),
            (LlmError::RateLimited("slow down".into()), ErrorKind::Model),
            (LlmError::ApiError("bad gateway".into()), ErrorKind::Model),
        ];
        for (source, kind) in cases {
            let err = provider_error("ollama/llama3", source);
            assert_eq!(err.kind(), kind, "{err}");
            if let GuardError::Network { service, .. } | GuardError::Model { service, .. } = &err {
                assert_eq!(service, SERVICE);
            }
        }
    }

    #[test]
    fn resolve_defaults_to_solar() {
        let config = GuardConfig::builder().api_key("k").build().unwrap();
        let model = resolve_chat_model(&config).unwrap();
        assert_eq!(model.name(), "solar-1-mini-chat");
    }

    #[test]
    fn resolve_without_key_fails() {
        let config = GuardConfig::default();
        assert!(resolve_chat_model(&config).is_err());
    }
}
