//! TCP links speaking the length-prefixed frame codec.

use std::net::SocketAddr;

use parley_protocol::{Frame, read_frame_async, write_frame_async};
use parley_translate::BoxFuture;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::link::{Dialer, LinkError, LinkHandle, LinkResult, PeerLink, TransportEvent};

/// Sending half of a TCP link. Frames are written by a background task.
#[derive(Debug)]
pub struct TcpLink {
    remote_id: String,
    outgoing: Option<mpsc::UnboundedSender<Frame>>,
}

impl TcpLink {
    /// Splits `stream` into a link and its event stream.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(stream: TcpStream, remote_id: impl Into<String>) -> LinkHandle {
        let remote_id = remote_id.into();
        let (read_half, write_half) = stream.into_split();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();

        let _ = events_tx.send(TransportEvent::Open);
        tokio::spawn(write_loop(write_half, frames_rx, events_tx.clone(), remote_id.clone()));
        tokio::spawn(read_loop(read_half, events_tx, remote_id.clone()));

        LinkHandle::new(
            Self {
                remote_id,
                outgoing: Some(frames_tx),
            },
            events_rx,
        )
    }
}

impl PeerLink for TcpLink {
    fn remote_id(&self) -> &str {
        &self.remote_id
    }

    fn send_frame(&mut self, frame: &Frame) -> LinkResult<()> {
        let outgoing = self.outgoing.as_ref().ok_or(LinkError::Closed)?;
        outgoing.send(frame.clone()).map_err(|_| LinkError::Closed)
    }

    fn close(&mut self) {
        if self.outgoing.take().is_some() {
            debug!(remote = %self.remote_id, "closing tcp link");
        }
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.close();
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    events: mpsc::UnboundedSender<TransportEvent>,
    remote_id: String,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = write_frame_async(&mut writer, &frame).await {
            warn!(remote = %remote_id, error = %e, "failed to write frame");
            let _ = events.send(TransportEvent::Error(e.to_string()));
            return;
        }
    }
    // sender dropped: local close
    let _ = writer.shutdown().await;
    let _ = events.send(TransportEvent::Closed);
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    events: mpsc::UnboundedSender<TransportEvent>,
    remote_id: String,
) {
    loop {
        match read_frame_async(&mut reader).await {
            Ok(Some(frame)) => {
                debug!(remote = %remote_id, kind = frame.kind(), "received frame");
                if events.send(TransportEvent::Frame(frame)).is_err() {
                    return;
                }
            }
            Ok(None) => {
                debug!(remote = %remote_id, "remote closed connection");
                let _ = events.send(TransportEvent::Closed);
                return;
            }
            Err(e) => {
                warn!(remote = %remote_id, error = %e, "failed to read frame");
                let _ = events.send(TransportEvent::Error(e.to_string()));
                return;
            }
        }
    }
}

/// Generates a transport-assigned local id.
pub fn generate_local_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Opens TCP links to `host:port` remote ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    fn dial<'a>(&'a self, remote_id: &'a str) -> BoxFuture<'a, LinkResult<LinkHandle>> {
        Box::pin(async move {
            let stream = TcpStream::connect(remote_id).await.map_err(|e| LinkError::Connect {
                remote: remote_id.to_string(),
                reason: e.to_string(),
            })?;
            stream.set_nodelay(true)?;
            info!(remote = remote_id, "connected to peer");
            Ok(TcpLink::spawn(stream, remote_id))
        })
    }
}

/// Accepts inbound TCP links.
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
    local_id: String,
}

impl TcpAcceptor {
    /// Binds to `addr` and assigns a fresh local id.
    pub async fn bind(addr: impl ToSocketAddrs) -> LinkResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_id = generate_local_id();
        info!(addr = ?listener.local_addr().ok(), local_id = %local_id, "listening for peers");
        Ok(Self { listener, local_id })
    }

    /// Local id peers should dial with.
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Bound address.
    pub fn local_addr(&self) -> LinkResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits for the next inbound link.
    pub async fn accept(&self) -> LinkResult<LinkHandle> {
        let (stream, addr) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        info!(remote = %addr, "accepted peer connection");
        Ok(TcpLink::spawn(stream, addr.to_string()))
    }
}
