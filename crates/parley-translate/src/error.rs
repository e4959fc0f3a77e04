//! Error types for translation.
//!
//! [`BackendError`] describes one failed call to one backend. The
//! dispatcher records each of those as a [`TranslationAttempt`] and, when
//! every candidate has failed, reports them together in
//! [`TranslationError::AggregateFailure`].

use std::fmt;
use thiserror::Error;

/// The category of a single backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorCode {
    /// The backend could not be reached (connect, DNS, timeout, TLS).
    Network,
    /// The backend answered with a non-success status.
    HttpStatus,
    /// The backend answered successfully but with no translated content.
    EmptyContent,
    /// The response body could not be parsed.
    InvalidResponse,
    /// The backend has no usable credential.
    NotConfigured,
    /// Local failure before any request was made.
    Internal,
}

impl BackendErrorCode {
    /// Returns true if the dispatcher should move on to the next backend.
    pub fn is_fallback_eligible(&self) -> bool {
        !matches!(self, Self::Internal)
    }

    /// Returns a short machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network_error",
            Self::HttpStatus => "http_status",
            Self::EmptyContent => "empty_content",
            Self::InvalidResponse => "invalid_response",
            Self::NotConfigured => "not_configured",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for BackendErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call to one translation backend.
#[derive(Debug, Error)]
pub struct BackendError {
    code: BackendErrorCode,
    message: String,
    backend: Option<String>,
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    /// Creates a new backend error.
    pub fn new(code: BackendErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            backend: None,
            status: None,
            source: None,
        }
    }

    /// Transport-level failure reaching the backend.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BackendErrorCode::Network, message)
    }

    /// Non-success HTTP status.
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.trim().is_empty() {
            format!("returned {}", status)
        } else {
            format!("returned {}: {}", status, body.trim())
        };
        let mut err = Self::new(BackendErrorCode::HttpStatus, message);
        err.status = Some(status);
        err
    }

    /// Success status but no content.
    pub fn empty_content() -> Self {
        Self::new(BackendErrorCode::EmptyContent, "returned no translation")
    }

    /// Unparseable response.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(BackendErrorCode::InvalidResponse, message)
    }

    /// Missing credential.
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(BackendErrorCode::NotConfigured, message)
    }

    /// Local failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(BackendErrorCode::Internal, message)
    }

    /// Sets the backend name.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> BackendErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the backend name, if set.
    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }

    /// Returns the HTTP status for [`BackendErrorCode::HttpStatus`] errors.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref backend) = self.backend {
            write!(f, "[{}] ", backend)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result type for a single backend call.
pub type BackendResult<T> = Result<T, BackendError>;

/// The outcome of trying one backend, kept for failure reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationAttempt {
    /// Backend name.
    pub backend_name: String,
    /// Whether this attempt produced the translation.
    pub succeeded: bool,
    /// Why the attempt failed.
    pub error_detail: Option<String>,
}

impl TranslationAttempt {
    /// A successful attempt.
    pub fn success(backend_name: impl Into<String>) -> Self {
        Self {
            backend_name: backend_name.into(),
            succeeded: true,
            error_detail: None,
        }
    }

    /// A failed attempt.
    pub fn failure(backend_name: impl Into<String>, error: &BackendError) -> Self {
        Self {
            backend_name: backend_name.into(),
            succeeded: false,
            error_detail: Some(format!("{}: {}", error.code(), error.message())),
        }
    }

    /// One-line description used in error details.
    pub fn describe(&self) -> String {
        match self.error_detail {
            Some(ref detail) => format!("{}: {}", self.backend_name, detail),
            None => format!("{}: ok", self.backend_name),
        }
    }
}

/// High-level category of a [`TranslationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslationErrorCode {
    /// Malformed or missing request fields.
    ValidationError,
    /// No backend credential configured at all.
    ConfigurationError,
    /// A backend answered badly.
    BackendError,
    /// A backend or endpoint could not be reached.
    NetworkError,
    /// Every configured backend was tried and failed.
    AggregateFailure,
}

impl TranslationErrorCode {
    /// Returns a short machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::ConfigurationError => "configuration_error",
            Self::BackendError => "backend_error",
            Self::NetworkError => "network_error",
            Self::AggregateFailure => "aggregate_failure",
        }
    }
}

impl fmt::Display for TranslationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`crate::Translate`] implementations.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// The request itself is invalid. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// No backend has a credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single backend failed and there was nothing to fall back to.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Every backend attempted failed.
    #[error("translation failed: {}", summarize(.attempts))]
    AggregateFailure {
        /// One entry per backend attempted, in attempt order.
        attempts: Vec<TranslationAttempt>,
    },

    /// The translation endpoint is missing (404) or unreachable.
    #[error("translation endpoint unavailable: {0}")]
    EndpointUnavailable(String),

    /// The translation endpoint answered with an error.
    #[error("translation endpoint error ({status}): {message}")]
    Endpoint {
        /// HTTP status.
        status: u16,
        /// Error message, including per-backend details.
        message: String,
    },
}

fn summarize(attempts: &[TranslationAttempt]) -> String {
    if attempts.is_empty() {
        return "no backend attempted".to_string();
    }
    attempts
        .iter()
        .map(TranslationAttempt::describe)
        .collect::<Vec<_>>()
        .join(" | ")
}

impl TranslationError {
    /// Returns the category of this error.
    pub fn code(&self) -> TranslationErrorCode {
        match self {
            Self::Validation(_) => TranslationErrorCode::ValidationError,
            Self::Configuration(_) => TranslationErrorCode::ConfigurationError,
            Self::Backend(err) if err.code() == BackendErrorCode::Network => {
                TranslationErrorCode::NetworkError
            }
            Self::Backend(_) => TranslationErrorCode::BackendError,
            Self::AggregateFailure { .. } => TranslationErrorCode::AggregateFailure,
            Self::EndpointUnavailable(_) => TranslationErrorCode::NetworkError,
            Self::Endpoint { .. } => TranslationErrorCode::BackendError,
        }
    }

    /// Returns true if another translator may still succeed where this one
    /// failed.
    pub fn is_fallback_eligible(&self) -> bool {
        match self {
            Self::Backend(err) => err.code().is_fallback_eligible(),
            Self::EndpointUnavailable(_) => true,
            _ => false,
        }
    }

    /// Per-backend details of an aggregate failure.
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::AggregateFailure { attempts } => {
                attempts.iter().map(TranslationAttempt::describe).collect()
            }
            _ => Vec::new(),
        }
    }

    /// The attempts recorded by an aggregate failure.
    pub fn attempts(&self) -> &[TranslationAttempt] {
        match self {
            Self::AggregateFailure { attempts } => attempts,
            _ => &[],
        }
    }
}

/// Result type for translation.
pub type TranslationResult<T> = Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_includes_body() {
        let err = BackendError::http_status(503, " overloaded ").with_backend("groq");
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "[groq] http_status: returned 503: overloaded");
    }

    #[test]
    fn only_internal_errors_block_fallback() {
        assert!(BackendErrorCode::Network.is_fallback_eligible());
        assert!(BackendErrorCode::HttpStatus.is_fallback_eligible());
        assert!(BackendErrorCode::EmptyContent.is_fallback_eligible());
        assert!(!BackendErrorCode::Internal.is_fallback_eligible());
    }

    #[test]
    fn attempt_records_error_detail() {
        let attempt = TranslationAttempt::failure("cerebras", &BackendError::empty_content());
        assert!(!attempt.succeeded);
        assert_eq!(attempt.describe(), "cerebras: empty_content: returned no translation");
    }

    #[test]
    fn aggregate_failure_lists_every_attempt() {
        let err = TranslationError::AggregateFailure {
            attempts: vec![
                TranslationAttempt::failure("groq", &BackendError::network("timed out")),
                TranslationAttempt::failure("cerebras", &BackendError::http_status(500, "")),
            ],
        };
        assert_eq!(err.code(), TranslationErrorCode::AggregateFailure);
        assert_eq!(err.details().len(), 2);
        let display = err.to_string();
        assert!(display.contains("groq: network_error: timed out"));
        assert!(display.contains("cerebras: http_status: returned 500"));
    }

    #[test]
    fn network_backend_error_maps_to_network_code() {
        let err = TranslationError::from(BackendError::network("refused"));
        assert_eq!(err.code(), TranslationErrorCode::NetworkError);
        let err = TranslationError::from(BackendError::empty_content());
        assert_eq!(err.code(), TranslationErrorCode::BackendError);
    }

    #[test]
    fn validation_is_never_fallback_eligible() {
        assert!(!TranslationError::Validation("missing text".into()).is_fallback_eligible());
        assert!(TranslationError::EndpointUnavailable("404".into()).is_fallback_eligible());
        assert!(TranslationError::from(BackendError::network("x")).is_fallback_eligible());
    }

    #[test]
    fn source_is_exposed() {
        use std::error::Error;
        let io = std::io::Error::other("reset");
        let err = BackendError::network("send failed").with_source(io);
        assert!(err.source().is_some());
    }
}
