//! OpenAI-compatible chat-completion backend.
//!
//! Groq and Cerebras both expose `POST {base}/chat/completions` with bearer
//! authentication, so one backend type covers both; [`BackendPreset`]
//! carries what differs between them.

use std::time::Duration;

use parley_core::LanguageTag;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{BoxFuture, TranslationBackend, credential_is_usable};
use crate::error::{BackendError, BackendResult};

/// Known chat-completion services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendPreset {
    Groq,
    Cerebras,
}

impl BackendPreset {
    /// Every preset, in the order they are listed in health output.
    pub const ALL: [BackendPreset; 2] = [BackendPreset::Cerebras, BackendPreset::Groq];

    /// Backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Cerebras => "cerebras",
        }
    }

    /// API base URL, without the `/chat/completions` suffix.
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Cerebras => "https://api.cerebras.ai/v1",
        }
    }

    /// Model used for translation.
    pub fn model(&self) -> &'static str {
        match self {
            Self::Groq => "llama-3.3-70b-versatile",
            Self::Cerebras => "llama3.1-70b",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::Cerebras => "CEREBRAS_API_KEY",
        }
    }
}

/// Configuration for a [`ChatCompletionBackend`].
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Backend name.
    pub name: String,
    /// API base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer credential. `None` leaves the backend unconfigured.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl CompletionConfig {
    /// Default temperature. Low, so translations stay literal.
    pub const DEFAULT_TEMPERATURE: f64 = 0.3;

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

    /// Creates a configuration from explicit values.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            temperature: Self::DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("parley/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Creates a configuration for a known service.
    pub fn preset(preset: BackendPreset) -> Self {
        Self::new(preset.name(), preset.base_url(), preset.model())
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 2],
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionContent>,
}

#[derive(Debug, Deserialize)]
struct CompletionContent {
    content: Option<String>,
}

/// System prompt sent with every request.
pub fn system_prompt(target: &LanguageTag) -> String {
    format!("Translate to {}. Return ONLY the translation.", target)
}

fn build_request<'a>(
    config: &'a CompletionConfig,
    text: &'a str,
    target: &LanguageTag,
) -> CompletionRequest<'a> {
    CompletionRequest {
        model: &config.model,
        messages: [
            CompletionMessage {
                role: "system",
                content: system_prompt(target).into(),
            },
            CompletionMessage {
                role: "user",
                content: text.into(),
            },
        ],
        temperature: config.temperature,
    }
}

/// Pulls the trimmed `choices[0].message.content` out of a response body.
fn extract_content(body: &str) -> BackendResult<String> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::invalid_response(format!("failed to parse response: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(BackendError::empty_content());
    }
    Ok(content)
}

/// A backend speaking the OpenAI chat-completion API.
#[derive(Debug)]
pub struct ChatCompletionBackend {
    config: CompletionConfig,
    configured: bool,
    http_client: reqwest::Client,
}

impl ChatCompletionBackend {
    /// Creates a backend. The configured flag is fixed here.
    pub fn new(config: CompletionConfig) -> BackendResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                BackendError::internal("failed to create HTTP client")
                    .with_backend(&config.name)
                    .with_source(e)
            })?;

        let configured = credential_is_usable(config.api_key.as_deref());
        if !configured {
            debug!(backend = %config.name, "no usable credential, backend disabled");
        }

        Ok(Self {
            config,
            configured,
            http_client,
        })
    }

    /// Creates a backend for a known service.
    pub fn from_preset(preset: BackendPreset, api_key: Option<String>) -> BackendResult<Self> {
        Self::new(CompletionConfig::preset(preset).with_api_key(api_key))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    async fn request(&self, text: &str, target: &LanguageTag) -> BackendResult<String> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if self.configured => key.trim(),
            _ => {
                return Err(BackendError::not_configured("missing API key"));
            }
        };

        let body = build_request(&self.config, text, target);
        debug!(backend = %self.config.name, model = %self.config.model, target = %target, "sending completion request");

        let response = self
            .http_client
            .post(self.config.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    format!("request failed: {}", e)
                };
                BackendError::network(message).with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(backend = %self.config.name, status = status.as_u16(), "completion request rejected");
            return Err(BackendError::http_status(status.as_u16(), body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::network(format!("failed to read response: {}", e)))?;

        extract_content(&body)
    }
}

impl TranslationBackend for ChatCompletionBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target: &'a LanguageTag,
    ) -> BoxFuture<'a, BackendResult<String>> {
        Box::pin(async move {
            self.request(text, target)
                .await
                .map_err(|e| e.with_backend(&self.config.name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_point_at_known_services() {
        let groq = CompletionConfig::preset(BackendPreset::Groq);
        assert_eq!(groq.completions_url(), "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(groq.model, "llama-3.3-70b-versatile");

        let cerebras = CompletionConfig::preset(BackendPreset::Cerebras);
        assert_eq!(cerebras.completions_url(), "https://api.cerebras.ai/v1/chat/completions");
        assert_eq!(cerebras.model, "llama3.1-70b");
        assert_eq!(BackendPreset::Cerebras.api_key_env(), "CEREBRAS_API_KEY");
    }

    #[test]
    fn trailing_slash_in_base_url() {
        let config = CompletionConfig::new("local", "http://127.0.0.1:9000/v1/", "m");
        assert_eq!(config.completions_url(), "http://127.0.0.1:9000/v1/chat/completions");
    }

    #[test]
    fn request_body_shape() {
        let config = CompletionConfig::preset(BackendPreset::Groq);
        let body = build_request(&config, "Hola", &LanguageTag::new("en"));
        insta::assert_json_snapshot!(body, @r###"
        {
          "model": "llama-3.3-70b-versatile",
          "messages": [
            {
              "role": "system",
              "content": "Translate to en. Return ONLY the translation."
            },
            {
              "role": "user",
              "content": "Hola"
            }
          ],
          "temperature": 0.3
        }
        "###);
    }

    #[test]
    fn content_is_trimmed() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello \n"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Hello");
    }

    #[test]
    fn missing_or_blank_content_is_empty() {
        use crate::error::BackendErrorCode;
        for body in [
            r#"{"choices":[]}"#,
            r#"{}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
        ] {
            let err = extract_content(body).unwrap_err();
            assert_eq!(err.code(), BackendErrorCode::EmptyContent, "{body}");
        }
    }

    #[test]
    fn garbage_body_is_invalid_response() {
        use crate::error::BackendErrorCode;
        let err = extract_content("<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.code(), BackendErrorCode::InvalidResponse);
    }

    #[test]
    fn configured_flag_follows_credential() {
        let backend = ChatCompletionBackend::from_preset(BackendPreset::Groq, None).unwrap();
        assert!(!backend.is_configured());

        let backend =
            ChatCompletionBackend::from_preset(BackendPreset::Groq, Some("abc".into())).unwrap();
        assert!(!backend.is_configured());

        let backend =
            ChatCompletionBackend::from_preset(BackendPreset::Cerebras, Some("csk-123456".into()))
                .unwrap();
        assert!(backend.is_configured());
        assert_eq!(backend.name(), "cerebras");
    }

    #[tokio::test]
    async fn unconfigured_backend_fails_without_request() {
        use crate::error::BackendErrorCode;
        let backend = ChatCompletionBackend::from_preset(BackendPreset::Groq, None).unwrap();
        let err = backend
            .translate("Hola", &LanguageTag::new("en"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), BackendErrorCode::NotConfigured);
        assert_eq!(err.backend(), Some("groq"));
    }
}
