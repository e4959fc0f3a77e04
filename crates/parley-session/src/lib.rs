//! Peer-to-peer chat sessions and call control.
//!
//! A [`ConnectionSession`] owns one [`PeerLink`] and walks it through the
//! handshake into the active state. It is a plain state machine: every
//! transport callback arrives as a [`TransportEvent`] through
//! [`ConnectionSession::handle_transport_event`], which keeps it testable
//! without timers or sockets. [`SessionDriver`] is the event loop that
//! feeds it.
//!
//! [`CallController`] sits beside a session and manages the local media
//! stream and the remote media handle of an audio/video call.

pub mod call;
pub mod driver;
pub mod error;
pub mod link;
pub mod media;
pub mod memory;
pub mod session;
pub mod tcp;

pub use call::{CallController, CallEvent, CallSignaling, CallTicket};
pub use driver::{SessionCommand, SessionDriver, SessionHandle};
pub use error::{CallError, CallResult, SessionError, SessionResult};
pub use link::{Dialer, LinkError, LinkHandle, LinkResult, PeerLink, TransportEvent, TransportEvents};
pub use media::{LocalStream, MediaConstraints, MediaDevices, MediaTrack, RemoteMedia, TrackKind};
pub use memory::MemoryLink;
pub use session::{ConnectionSession, MAX_PENDING_MESSAGES, OutgoingMessage, SessionEvent};
pub use tcp::{TcpAcceptor, TcpDialer, TcpLink, generate_local_id};
