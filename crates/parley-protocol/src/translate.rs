//! JSON bodies of the `/translate` HTTP endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /translate`.
///
/// Both fields default to empty so that a request with missing fields can
/// be answered with a validation error instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    /// Text to translate.
    #[serde(default)]
    pub text: String,
    /// Target language, either a tag or a free-form hint such as
    /// `"es to en"`.
    #[serde(default)]
    pub target_lang: String,
}

impl TranslateRequest {
    /// Creates a new request.
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.into(),
        }
    }

    /// Returns the name of the first missing field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.text.trim().is_empty() {
            Some("text")
        } else if self.target_lang.trim().is_empty() {
            Some("targetLang")
        } else {
            None
        }
    }
}

/// Successful `POST /translate` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    /// The translated text.
    pub translated_text: String,
    /// Name of the backend that produced it.
    pub provider: String,
}

/// Error body returned with 4xx/5xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error.
    pub error: String,
    /// One entry per backend attempted, when the failure aggregates several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorBody {
    /// Creates an error body without details.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Builder: attach per-backend details.
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }

    /// Error message followed by its details, as shown to users.
    pub fn describe(&self) -> String {
        match self.details {
            Some(ref details) if !details.is_empty() => {
                format!("{}. Details: {}", self.error, details.join(" | "))
            }
            _ => self.error.clone(),
        }
    }
}

/// Whether a backend has a usable credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendHealth {
    Configured,
    Missing,
}

impl BackendHealth {
    /// Maps a configured flag to a health value.
    pub fn from_configured(configured: bool) -> Self {
        if configured {
            Self::Configured
        } else {
            Self::Missing
        }
    }
}

/// Body of `GET /translate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the endpoint answers.
    pub status: String,
    /// Short description.
    pub message: String,
    /// Backend name to credential state.
    pub config: BTreeMap<String, BackendHealth>,
}

impl HealthResponse {
    /// Creates an `ok` response for the given backends.
    pub fn ok(config: BTreeMap<String, BackendHealth>) -> Self {
        Self {
            status: "ok".to_string(),
            message: "Translate endpoint is active".to_string(),
            config,
        }
    }
}
