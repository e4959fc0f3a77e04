//! One chat connection with one remote peer.
//!
//! ```text
//!   Idle ──initiate/accept──► Connecting ──Open──► AwaitingHandshake
//!                                                    │ local sent + remote received
//!                                                    ▼
//!          Error ◄──transport error── (any) ◄──── Active
//!            │                                       │
//!            └──────close()──────► Closed ◄──close──┘
//! ```

use std::sync::Arc;

use parley_core::{ChatMessage, ConnectionState, LanguageTag, MessageIdGenerator, MessageLog, PeerIdentity};
use parley_protocol::Frame;
use parley_translate::{Translate, Translation, TranslationResult};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::link::{Dialer, LinkHandle, PeerLink, TransportEvent, TransportEvents};

/// Messages held while waiting for the remote handshake.
pub const MAX_PENDING_MESSAGES: usize = 256;

/// Notifications for whoever renders the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message was added to the log, sent or received.
    Message(ChatMessage),
    /// The remote handshake resolved.
    RemoteIdentity(PeerIdentity),
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// Something failed; the detail is human readable.
    Error(String),
}

/// A message built by [`ConnectionSession::prepare_send`] and waiting for
/// its translation.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    message: ChatMessage,
    target: Option<LanguageTag>,
}

impl OutgoingMessage {
    /// The untranslated message.
    pub fn message(&self) -> &ChatMessage {
        &self.message
    }

    /// Language to translate into, if the remote reads another language.
    pub fn target(&self) -> Option<&LanguageTag> {
        self.target.as_ref()
    }

    /// Runs the translation step for this message.
    pub async fn translate(&self, translator: &dyn Translate) -> Option<TranslationResult<Translation>> {
        let target = self.target.as_ref()?;
        Some(translator.translate(&self.message.original_text, target).await)
    }
}

/// A chat session over a single [`PeerLink`].
pub struct ConnectionSession {
    local: PeerIdentity,
    remote: Option<PeerIdentity>,
    state: ConnectionState,
    link: Option<Box<dyn PeerLink>>,
    local_handshake_sent: bool,
    pending: Vec<ChatMessage>,
    log: MessageLog,
    ids: MessageIdGenerator,
    translator: Arc<dyn Translate>,
    dialer: Option<Arc<dyn Dialer>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    state_tx: watch::Sender<ConnectionState>,
}

impl std::fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("local", &self.local.id)
            .field("remote", &self.remote.as_ref().map(|r| &r.id))
            .field("state", &self.state)
            .field("messages", &self.log.len())
            .finish_non_exhaustive()
    }
}

impl ConnectionSession {
    /// Creates an idle session and the receiver for its events.
    pub fn new(
        local: PeerIdentity,
        translator: Arc<dyn Translate>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let ids = MessageIdGenerator::new(local.id.clone());
        let session = Self {
            local,
            remote: None,
            state: ConnectionState::Idle,
            link: None,
            local_handshake_sent: false,
            pending: Vec::new(),
            log: MessageLog::new(),
            ids,
            translator,
            dialer: None,
            events,
            state_tx,
        };
        (session, events_rx)
    }

    /// Sets the dialer used by [`ConnectionSession::initiate`].
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Watches the state, for collaborators such as the call controller.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Local identity.
    pub fn local(&self) -> &PeerIdentity {
        &self.local
    }

    /// Remote identity, once the handshake has been received.
    pub fn remote(&self) -> Option<&PeerIdentity> {
        self.remote.as_ref()
    }

    /// Transport id of the remote, while a link is held.
    pub fn remote_id(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.remote_id())
    }

    /// Every message sent or received, in order.
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Translator used for outgoing messages.
    pub fn translator(&self) -> Arc<dyn Translate> {
        Arc::clone(&self.translator)
    }

    /// Opens an outbound link to `remote_id`.
    ///
    /// Returns the link's event stream; feed it back through
    /// [`ConnectionSession::handle_transport_event`].
    pub async fn initiate(&mut self, remote_id: &str) -> SessionResult<TransportEvents> {
        if self.state != ConnectionState::Idle {
            return Err(SessionError::Connection(format!(
                "connection attempt already made (state: {})",
                self.state
            )));
        }
        let dialer = self
            .dialer
            .clone()
            .ok_or_else(|| SessionError::Connection("no dialer configured".to_string()))?;

        self.transition(ConnectionState::Connecting);
        info!(remote = remote_id, "dialing peer");

        match dialer.dial(remote_id).await {
            Ok(handle) => Ok(self.attach(handle)),
            Err(e) => {
                let detail = e.to_string();
                self.fail(detail.clone());
                Err(SessionError::Connection(detail))
            }
        }
    }

    /// Wraps an inbound link.
    pub fn accept_incoming(&mut self, handle: LinkHandle) -> SessionResult<TransportEvents> {
        if self.state != ConnectionState::Idle {
            return Err(SessionError::Connection(format!(
                "cannot accept a link while {}",
                self.state
            )));
        }
        info!(remote = handle.link.remote_id(), "accepting peer");
        self.transition(ConnectionState::Connecting);
        Ok(self.attach(handle))
    }

    fn attach(&mut self, handle: LinkHandle) -> TransportEvents {
        let LinkHandle { link, events } = handle;
        self.link = Some(link);
        events
    }

    /// Applies one transport event.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Frame(frame) => self.on_frame(frame),
            TransportEvent::Closed => self.on_transport_closed(),
            TransportEvent::Error(detail) => {
                if !self.state.is_terminal() {
                    warn!(error = %detail, "transport error");
                    self.fail(detail);
                }
            }
        }
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!(state = %self.state, "ignoring open outside connecting");
            return;
        }
        self.transition(ConnectionState::AwaitingHandshake);

        let handshake = Frame::handshake(self.local.clone());
        match self.transmit(&handshake) {
            Ok(()) => {
                self.local_handshake_sent = true;
                self.maybe_activate();
            }
            Err(e) => warn!(error = %e, "failed to send handshake"),
        }
    }

    fn on_frame(&mut self, frame: Frame) {
        if self.state.is_terminal() || self.state == ConnectionState::Idle {
            debug!(state = %self.state, kind = frame.kind(), "dropping frame");
            return;
        }
        match frame {
            Frame::Handshake { user } => self.on_handshake(user),
            Frame::Message { message } => {
                if self.remote.is_none() {
                    if self.pending.len() >= MAX_PENDING_MESSAGES {
                        warn!(limit = MAX_PENDING_MESSAGES, "too many messages before handshake");
                        self.pending.clear();
                        let err = SessionError::Connection(format!(
                            "peer sent more than {} messages before its handshake",
                            MAX_PENDING_MESSAGES
                        ));
                        self.fail(err.to_string());
                        return;
                    }
                    debug!(id = %message.id.as_str(), "buffering message received before handshake");
                    self.pending.push(message);
                } else {
                    self.deliver(message);
                }
            }
        }
    }

    fn on_handshake(&mut self, user: PeerIdentity) {
        if let Some(ref remote) = self.remote {
            warn!(remote = %remote.id, ignored = %user.id, "ignoring repeated handshake");
            return;
        }
        info!(remote = %user.id, name = %user.display_name, lang = %user.native_language, "remote identity received");
        self.remote = Some(user.clone());
        self.emit(SessionEvent::RemoteIdentity(user));

        for message in std::mem::take(&mut self.pending) {
            self.deliver(message);
        }
        self.maybe_activate();
    }

    fn deliver(&mut self, message: ChatMessage) {
        if let Some(ref remote) = self.remote
            && message.sender_id != remote.id
        {
            warn!(sender = %message.sender_id, remote = %remote.id, "message sender does not match remote identity");
        }
        debug!(id = %message.id.as_str(), translated = message.is_translated(), "message received");
        self.log.append(message.clone());
        self.emit(SessionEvent::Message(message));
    }

    fn on_transport_closed(&mut self) {
        self.release_link();
        if self.state == ConnectionState::Error {
            debug!("transport closed after error");
            return;
        }
        self.transition(ConnectionState::Closed);
    }

    fn maybe_activate(&mut self) {
        if self.state == ConnectionState::AwaitingHandshake
            && self.local_handshake_sent
            && self.remote.is_some()
        {
            self.transition(ConnectionState::Active);
        }
    }

    /// Sends `text`, translating it first when the remote reads another
    /// language.
    ///
    /// A failed translation is logged and the message goes out without
    /// one.
    pub async fn send(&mut self, text: &str) -> SessionResult<ChatMessage> {
        let outgoing = self.prepare_send(text)?;
        let translation = outgoing.translate(self.translator.as_ref()).await;
        self.complete_send(outgoing, translation)
    }

    /// First half of [`ConnectionSession::send`]: validates and builds the
    /// message.
    pub fn prepare_send(&mut self, text: &str) -> SessionResult<OutgoingMessage> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if !self.state.is_active() {
            return Err(SessionError::NotActive(self.state));
        }
        let Some(ref remote) = self.remote else {
            return Err(SessionError::NotActive(self.state));
        };

        let target = self
            .local
            .needs_translation_for(remote)
            .then(|| remote.native_language.clone());
        let now = chrono::Utc::now().timestamp_millis();
        let message = ChatMessage::new(self.ids.next_at(now), &self.local, text, now);

        Ok(OutgoingMessage { message, target })
    }

    /// Second half of [`ConnectionSession::send`]: attaches the
    /// translation and transmits.
    ///
    /// If the session left the active state while translating, the
    /// message is discarded.
    pub fn complete_send(
        &mut self,
        outgoing: OutgoingMessage,
        translation: Option<TranslationResult<Translation>>,
    ) -> SessionResult<ChatMessage> {
        if !self.state.is_active() {
            debug!(id = %outgoing.message.id.as_str(), state = %self.state, "discarding message, session no longer active");
            return Err(SessionError::NotActive(self.state));
        }

        let OutgoingMessage {
            mut message,
            target,
        } = outgoing;

        match (translation, target) {
            (Some(Ok(translation)), Some(target)) if !translation.is_empty() => {
                debug!(provider = ?translation.provider, "message translated");
                message = message.with_translation(translation.text, target);
            }
            (Some(Ok(_)), _) => warn!("translation came back empty, sending original"),
            (Some(Err(e)), _) => warn!(error = %e, "translation failed, sending original"),
            (None, _) => {}
        }

        let frame = Frame::message(message.clone());
        self.transmit(&frame)?;

        self.log.append(message.clone());
        self.emit(SessionEvent::Message(message.clone()));
        Ok(message)
    }

    fn transmit(&mut self, frame: &Frame) -> SessionResult<()> {
        let Some(link) = self.link.as_mut() else {
            return Err(SessionError::NotActive(self.state));
        };
        match link.send_frame(frame) {
            Ok(()) => {
                debug!(kind = frame.kind(), "frame sent");
                Ok(())
            }
            Err(e) => {
                self.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Publishes an error detail without changing state.
    pub fn report_error(&self, detail: impl Into<String>) {
        self.emit(SessionEvent::Error(detail.into()));
    }

    /// Releases the link and moves to the closed state. Idempotent.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.release_link();
        self.pending.clear();
        self.transition(ConnectionState::Closed);
    }

    fn release_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
    }

    fn fail(&mut self, detail: String) {
        if self.state.is_terminal() {
            return;
        }
        self.transition(ConnectionState::Error);
        self.emit(SessionEvent::Error(detail));
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        info!(from = %self.state, to = %next, "connection state changed");
        self.state = next;
        self.state_tx.send_replace(next);
        self.emit(SessionEvent::StateChanged(next));
    }

    fn emit(&self, event: SessionEvent) {
        // the consumer may be gone; the session keeps working without it
        let _ = self.events.send(event);
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.release_link();
    }
}
