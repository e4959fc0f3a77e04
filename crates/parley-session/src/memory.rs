//! In-process links.
//!
//! Frames cross a memory link through the same codec a socket uses, so
//! anything that would fail to encode on the wire fails here too.

use parley_protocol::{Frame, decode_frame, encode_frame};
use tokio::sync::mpsc;
use tracing::trace;

use crate::link::{LinkError, LinkHandle, LinkResult, PeerLink, TransportEvent};

/// One end of an in-memory link.
#[derive(Debug)]
pub struct MemoryLink {
    remote_id: String,
    peer: Option<mpsc::UnboundedSender<TransportEvent>>,
}

impl PeerLink for MemoryLink {
    fn remote_id(&self) -> &str {
        &self.remote_id
    }

    fn send_frame(&mut self, frame: &Frame) -> LinkResult<()> {
        let peer = self.peer.as_ref().ok_or(LinkError::Closed)?;
        let decoded = decode_frame(&encode_frame(frame)?)?;
        trace!(remote = %self.remote_id, kind = frame.kind(), "memory link frame");
        peer.send(TransportEvent::Frame(decoded))
            .map_err(|_| LinkError::Closed)
    }

    fn close(&mut self) {
        if let Some(peer) = self.peer.take() {
            let _ = peer.send(TransportEvent::Closed);
        }
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Creates two connected links. `a` talks to `b_id`, `b` talks to `a_id`.
///
/// Both event streams already hold [`TransportEvent::Open`].
pub fn pair(a_id: impl Into<String>, b_id: impl Into<String>) -> (LinkHandle, LinkHandle) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let _ = a_tx.send(TransportEvent::Open);
    let _ = b_tx.send(TransportEvent::Open);

    let a = MemoryLink {
        remote_id: b_id.into(),
        peer: Some(b_tx),
    };
    let b = MemoryLink {
        remote_id: a_id.into(),
        peer: Some(a_tx),
    };
    (LinkHandle::new(a, a_rx), LinkHandle::new(b, b_rx))
}
