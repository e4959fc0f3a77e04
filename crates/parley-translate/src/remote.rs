//! Client for the `/translate` HTTP endpoint, with local fallback.

use std::time::Duration;

use parley_core::LanguageTag;
use parley_protocol::{ErrorBody, TranslateRequest, TranslateResponse};
use tracing::{debug, info, warn};

use crate::backend::{BoxFuture, Translate};
use crate::dispatcher::{Translation, TranslationDispatcher};
use crate::error::{BackendError, TranslationError, TranslationResult};

/// Calls a remote `/translate` endpoint.
#[derive(Debug, Clone)]
pub struct RemoteTranslator {
    endpoint: String,
    http_client: reqwest::Client,
}

impl RemoteTranslator {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a client for `endpoint` (the full `/translate` URL).
    pub fn new(endpoint: impl Into<String>) -> TranslationResult<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> TranslationResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::internal("failed to create HTTP client").with_source(e))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, text: &str, target: &LanguageTag) -> TranslationResult<Translation> {
        if text.trim().is_empty() {
            return Ok(Translation::empty());
        }

        let body = TranslateRequest::new(text, target.as_str());
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::EndpointUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TranslationError::EndpointUnavailable(format!(
                "{} returned 404",
                self.endpoint
            )));
        }

        let text = response.text().await.map_err(|e| {
            TranslationError::EndpointUnavailable(format!("failed to read response: {}", e))
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => body.describe(),
                Err(_) if text.trim().is_empty() => format!("server error {}", status.as_u16()),
                Err(_) => text.trim().to_string(),
            };
            return Err(TranslationError::Endpoint {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TranslateResponse = serde_json::from_str(&text).map_err(|e| {
            BackendError::invalid_response(format!("failed to parse response: {}", e))
        })?;

        debug!(provider = %parsed.provider, "remote translation complete");
        Ok(Translation::from_provider(parsed.translated_text, parsed.provider))
    }
}

impl Translate for RemoteTranslator {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target: &'a LanguageTag,
    ) -> BoxFuture<'a, TranslationResult<Translation>> {
        Box::pin(self.request(text, target))
    }
}

/// Tries the remote endpoint first and falls back to local backends when
/// the endpoint is missing or unreachable.
///
/// Errors reported by a reachable endpoint are returned as-is; the local
/// dispatcher is not consulted for those.
#[derive(Debug)]
pub struct FallbackTranslator {
    remote: Option<RemoteTranslator>,
    local: TranslationDispatcher,
}

impl FallbackTranslator {
    /// Creates a translator. With no remote, every call goes local.
    pub fn new(remote: Option<RemoteTranslator>, local: TranslationDispatcher) -> Self {
        Self { remote, local }
    }

    /// Returns the local dispatcher.
    pub fn local(&self) -> &TranslationDispatcher {
        &self.local
    }

    async fn run(&self, text: &str, target: &LanguageTag) -> TranslationResult<Translation> {
        let Some(ref remote) = self.remote else {
            return self.local.translate(text, target).await;
        };

        match remote.translate(text, target).await {
            Err(TranslationError::EndpointUnavailable(reason)) => {
                if !self.local.has_configured_backend() {
                    warn!(endpoint = remote.endpoint(), %reason, "translation endpoint unavailable and no local backend configured");
                    return Err(TranslationError::EndpointUnavailable(reason));
                }
                info!(endpoint = remote.endpoint(), %reason, "translation endpoint unavailable, using local backends");
                self.local.translate(text, target).await
            }
            other => other,
        }
    }
}

impl Translate for FallbackTranslator {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target: &'a LanguageTag,
    ) -> BoxFuture<'a, TranslationResult<Translation>> {
        Box::pin(self.run(text, target))
    }
}
