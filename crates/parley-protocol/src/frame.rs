//! Peer-to-peer frame definitions.

use parley_core::{ChatMessage, PeerIdentity};
use serde::{Deserialize, Serialize};

/// One discrete unit exchanged over a peer link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Identity of the sending endpoint. Sent exactly once, first.
    Handshake {
        /// The sender's identity.
        user: PeerIdentity,
    },

    /// A chat message, optionally carrying its translation.
    Message {
        /// The message.
        message: ChatMessage,
    },
}

impl Frame {
    /// Creates a handshake frame.
    pub fn handshake(user: PeerIdentity) -> Self {
        Self::Handshake { user }
    }

    /// Creates a message frame.
    pub fn message(message: ChatMessage) -> Self {
        Self::Message { message }
    }

    /// Returns the wire tag of this frame.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Handshake { .. } => "handshake",
            Self::Message { .. } => "message",
        }
    }
}
