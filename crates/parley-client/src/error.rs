//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Translation failed.
    #[error(transparent)]
    Translation(#[from] parley_translate::TranslationError),

    /// Chat session failure.
    #[error(transparent)]
    Session(#[from] parley_session::SessionError),

    /// Peer link failure.
    #[error("link error: {0}")]
    Link(#[from] parley_session::LinkError),

    /// Translation server failure.
    #[error(transparent)]
    Server(#[from] parley_server::ServerError),

    /// A background task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<parley_translate::BackendError> for ClientError {
    fn from(err: parley_translate::BackendError) -> Self {
        Self::Translation(err.into())
    }
}
