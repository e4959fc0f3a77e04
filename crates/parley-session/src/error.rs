//! Session and call error types.

use parley_core::{CallState, ConnectionState};
use thiserror::Error;

use crate::link::LinkError;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by [`crate::ConnectionSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Opening the peer link failed, or an attempt was already made.
    #[error("connection error: {0}")]
    Connection(String),

    /// A chat operation was attempted outside the active state.
    #[error("session is not active (state: {0})")]
    NotActive(ConnectionState),

    /// Tried to send a message with no visible text.
    #[error("message is empty")]
    EmptyMessage,

    /// The peer link rejected a frame.
    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

/// Result type for call operations.
pub type CallResult<T> = Result<T, CallError>;

/// Errors returned by [`crate::CallController`].
#[derive(Debug, Error)]
pub enum CallError {
    /// The operation is not allowed in the current call state.
    #[error("cannot {operation} while call is {state}")]
    InvalidState {
        operation: &'static str,
        state: CallState,
    },

    /// The connection is not active, so no call can be placed.
    #[error("no active connection (state: {0})")]
    NoConnection(ConnectionState),

    /// Camera or microphone could not be obtained.
    #[error("media acquisition failed: {0}")]
    MediaAcquisition(String),

    /// The call was ended while media was being acquired.
    #[error("call ended before media was ready")]
    Superseded,

    /// The signaling collaborator refused the operation.
    #[error("signaling error: {0}")]
    Signaling(String),
}

impl CallError {
    /// Returns true for state-check failures.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. } | Self::NoConnection(_))
    }
}
