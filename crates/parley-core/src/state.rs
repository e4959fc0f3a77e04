//! Connection and call lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single peer connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection attempt has been made.
    #[default]
    Idle,
    /// Waiting for the transport channel to open.
    Connecting,
    /// Channel is open, identity handshake in progress.
    AwaitingHandshake,
    /// Both handshakes exchanged; chat frames flow.
    Active,
    /// Terminal. A new session is required to reconnect.
    Closed,
    /// The transport failed. Only `close()` leaves this state.
    Error,
}

impl ConnectionState {
    /// Returns true for states that accept no further transitions except
    /// an explicit close.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }

    /// Returns true once chat frames may be sent.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns a short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::AwaitingHandshake => "awaiting_handshake",
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an audio/video call on top of an active connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    #[default]
    NoCall,
    /// We offered a call and wait for the remote stream.
    Outgoing,
    /// The remote side offered a call.
    Incoming,
    /// Media flows both ways.
    Active,
}

impl CallState {
    /// Returns a short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCall => "no_call",
            Self::Outgoing => "outgoing",
            Self::Incoming => "incoming",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Error.is_terminal());
        assert!(!ConnectionState::Active.is_terminal());
        assert!(!ConnectionState::Idle.is_terminal());
    }

    #[test]
    fn defaults() {
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
        assert_eq!(CallState::default(), CallState::NoCall);
    }

    #[test]
    fn display_names() {
        assert_eq!(ConnectionState::AwaitingHandshake.to_string(), "awaiting_handshake");
        assert_eq!(CallState::NoCall.to_string(), "no_call");
    }
}
