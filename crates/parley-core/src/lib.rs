//! Core types: identities, chat messages, session states, tracing

pub mod identity;
pub mod message;
pub mod state;
pub mod tracing;

pub use identity::{LanguageTag, PeerIdentity};
pub use message::{ChatMessage, MessageId, MessageIdGenerator, MessageLog};
pub use state::{CallState, ConnectionState};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
