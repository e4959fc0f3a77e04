//! The transport seam between a session and the network.

use parley_protocol::{Frame, ProtocolError};
use parley_translate::BoxFuture;
use thiserror::Error;
use tokio::sync::mpsc;

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors reported by a [`PeerLink`] or [`Dialer`].
#[derive(Debug, Error)]
pub enum LinkError {
    /// The link has been closed by either side.
    #[error("link closed")]
    Closed,

    /// The remote could not be reached.
    #[error("failed to connect to {remote}: {reason}")]
    Connect { remote: String, reason: String },

    /// The frame could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// IO error from the underlying socket.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a transport can report to the session that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The channel is ready to carry frames.
    Open,
    /// A frame arrived from the remote.
    Frame(Frame),
    /// The channel closed, from either side.
    Closed,
    /// The channel failed.
    Error(String),
}

/// Receiving end for a link's [`TransportEvent`]s.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// Sending half of an established transport channel.
///
/// Sends are non-blocking: frames are queued in order and written by the
/// transport. Incoming traffic is reported separately as
/// [`TransportEvent`]s.
pub trait PeerLink: Send {
    /// Identifier of the remote endpoint as known to the transport.
    fn remote_id(&self) -> &str;

    /// Queues one frame for delivery.
    fn send_frame(&mut self, frame: &Frame) -> LinkResult<()>;

    /// Releases the transport. Calling it again has no effect.
    fn close(&mut self);
}

/// A link together with the stream of events it produces.
pub struct LinkHandle {
    /// Outgoing half.
    pub link: Box<dyn PeerLink>,
    /// Incoming events, starting with [`TransportEvent::Open`].
    pub events: TransportEvents,
}

impl LinkHandle {
    /// Bundles a link and its events.
    pub fn new(link: impl PeerLink + 'static, events: TransportEvents) -> Self {
        Self {
            link: Box::new(link),
            events,
        }
    }
}

impl std::fmt::Debug for LinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkHandle")
            .field("remote_id", &self.link.remote_id())
            .finish_non_exhaustive()
    }
}

/// Opens outbound links.
pub trait Dialer: Send + Sync {
    /// Connects to `remote_id`.
    fn dial<'a>(&'a self, remote_id: &'a str) -> BoxFuture<'a, LinkResult<LinkHandle>>;
}
