//! Event loop that owns a [`ConnectionSession`].
//!
//! Translations run concurrently with transport traffic but complete in
//! submission order, so messages leave in the order they were typed.

use futures_util::StreamExt;
use futures_util::stream::FuturesOrdered;
use parley_core::ConnectionState;
use parley_translate::{BoxFuture, Translation, TranslationResult};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::link::{TransportEvent, TransportEvents};
use crate::session::{ConnectionSession, OutgoingMessage};

/// Requests from the user side of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Send a chat message.
    Send(String),
    /// Close the session.
    Close,
}

/// Cloneable handle for issuing [`SessionCommand`]s.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Queues a message.
    pub fn send(&self, text: impl Into<String>) -> SessionResult<()> {
        self.commands
            .send(SessionCommand::Send(text.into()))
            .map_err(|_| SessionError::NotActive(ConnectionState::Closed))
    }

    /// Asks the driver to close the session.
    pub fn close(&self) {
        let _ = self.commands.send(SessionCommand::Close);
    }
}

type PendingSend = BoxFuture<'static, (OutgoingMessage, Option<TranslationResult<Translation>>)>;

/// Runs a session until it closes.
pub struct SessionDriver {
    session: ConnectionSession,
    transport: TransportEvents,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    in_flight: FuturesOrdered<PendingSend>,
}

impl SessionDriver {
    /// Wraps a session whose link has been attached.
    pub fn new(session: ConnectionSession, transport: TransportEvents) -> (Self, SessionHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let driver = Self {
            session,
            transport,
            commands,
            in_flight: FuturesOrdered::new(),
        };
        (driver, SessionHandle { commands: commands_tx })
    }

    /// The driven session.
    pub fn session(&self) -> &ConnectionSession {
        &self.session
    }

    /// Runs until the session is closed, then hands it back.
    pub async fn run(mut self) -> ConnectionSession {
        let mut transport_open = true;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Send(text)) => self.submit(&text),
                    Some(SessionCommand::Close) | None => {
                        info!("closing session");
                        self.session.close();
                    }
                },
                event = self.transport.recv(), if transport_open => match event {
                    Some(event) => self.session.handle_transport_event(event),
                    None => {
                        transport_open = false;
                        self.session.handle_transport_event(TransportEvent::Closed);
                    }
                },
                Some((outgoing, translation)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = self.session.complete_send(outgoing, translation) {
                        warn!(error = %e, "message not sent");
                        self.session.report_error(e.to_string());
                    }
                }
            }

            if self.session.state() == ConnectionState::Closed {
                if !self.in_flight.is_empty() {
                    debug!(dropped = self.in_flight.len(), "dropping pending sends");
                }
                return self.session;
            }
        }
    }

    fn submit(&mut self, text: &str) {
        let outgoing = match self.session.prepare_send(text) {
            Ok(outgoing) => outgoing,
            Err(e) => {
                warn!(error = %e, "message rejected");
                self.session.report_error(e.to_string());
                return;
            }
        };
        let translator = self.session.translator();
        self.in_flight.push_back(Box::pin(async move {
            let translation = outgoing.translate(translator.as_ref()).await;
            (outgoing, translation)
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory;
    use crate::session::SessionEvent;
    use crate::session::tests::{PhraseBook, ana, ben};
    use parley_core::LanguageTag;
    use parley_translate::Translate;
    use std::sync::Arc;
    use std::time::Duration;

    /// Takes longer for shorter texts, to force out-of-order completion.
    struct Staggered;

    impl Translate for Staggered {
        fn translate<'a>(
            &'a self,
            text: &'a str,
            _target: &'a LanguageTag,
        ) -> BoxFuture<'a, TranslationResult<Translation>> {
            Box::pin(async move {
                let delay = 1000 / text.len().max(1) as u64;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(Translation::from_provider(text.to_uppercase(), "staggered"))
            })
        }
    }

    async fn next_message(
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    ) -> parley_core::ChatMessage {
        loop {
            match events.recv().await {
                Some(SessionEvent::Message(message)) => return message,
                Some(_) => continue,
                None => panic!("session events closed"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn messages_leave_in_submission_order() {
        let (a_link, b_link) = memory::pair("a", "b");
        let (mut a, _a_events) = ConnectionSession::new(ana(), Arc::new(Staggered));
        let (mut b, mut b_events) = ConnectionSession::new(ben(), Arc::new(Staggered));
        let a_transport = a.accept_incoming(a_link).unwrap();
        let b_transport = b.accept_incoming(b_link).unwrap();

        let (a_driver, a_handle) = SessionDriver::new(a, a_transport);
        let (b_driver, b_handle) = SessionDriver::new(b, b_transport);
        let a_task = tokio::spawn(a_driver.run());
        let b_task = tokio::spawn(b_driver.run());

        // wait for b to see the handshake before sending
        loop {
            match b_events.recv().await {
                Some(SessionEvent::StateChanged(ConnectionState::Active)) => break,
                Some(_) => continue,
                None => panic!("session events closed"),
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        for text in ["a", "bbbbbbbbbb", "cc"] {
            a_handle.send(text).unwrap();
        }

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(next_message(&mut b_events).await.original_text);
        }
        assert_eq!(received, ["a", "bbbbbbbbbb", "cc"]);

        a_handle.close();
        let a = a_task.await.unwrap();
        assert_eq!(a.state(), ConnectionState::Closed);
        assert_eq!(a.log().len(), 3);
        assert!(a.log().iter().all(|m| m.translated_text.is_some()));

        let b = b_task.await.unwrap();
        assert_eq!(b.state(), ConnectionState::Closed);
        drop(b_handle);
    }

    #[tokio::test]
    async fn rejected_send_is_reported_without_stopping() {
        let (a_link, b_link) = memory::pair("a", "b");
        let (mut a, mut a_events) = ConnectionSession::new(ana(), PhraseBook::new());
        let (mut b, _b_events) = ConnectionSession::new(ben(), PhraseBook::new());
        let a_transport = a.accept_incoming(a_link).unwrap();
        let b_transport = b.accept_incoming(b_link).unwrap();

        let (a_driver, a_handle) = SessionDriver::new(a, a_transport);
        let (b_driver, b_handle) = SessionDriver::new(b, b_transport);
        let a_task = tokio::spawn(a_driver.run());
        let b_task = tokio::spawn(b_driver.run());

        a_handle.send("   ").unwrap();
        loop {
            match a_events.recv().await {
                Some(SessionEvent::Error(detail)) => {
                    assert_eq!(detail, SessionError::EmptyMessage.to_string());
                    break;
                }
                Some(_) => continue,
                None => panic!("session events closed"),
            }
        }

        b_handle.close();
        let b = b_task.await.unwrap();
        assert_eq!(b.state(), ConnectionState::Closed);

        // a follows once the link reports the remote close
        let a = a_task.await.unwrap();
        assert_eq!(a.state(), ConnectionState::Closed);
        assert!(a_handle.send("hola").is_err());
    }
}
