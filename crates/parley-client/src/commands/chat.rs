//! Chat commands: `listen` and `connect`.
//!
//! Lines read from stdin are sent as messages; `/quit` or end of input
//! closes the session.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use parley_core::{ConnectionState, PeerIdentity};
use parley_server::ShutdownSignal;
use parley_session::{
    ConnectionSession, SessionDriver, SessionEvent, TcpAcceptor, TcpDialer, TransportEvents,
    generate_local_id,
};
use parley_translate::Translate;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Input line that ends the chat.
pub const QUIT_COMMAND: &str = "/quit";

/// Waits for one peer on `addr` and chats with it.
pub async fn listen(addr: &str, config: &ClientConfig, shutdown: ShutdownSignal) -> ClientResult<()> {
    let acceptor = TcpAcceptor::bind(addr).await?;
    let local = config.identity.to_identity(acceptor.local_id());
    println!(
        "listening on {} as {} ({}), waiting for a peer...",
        acceptor.local_addr()?,
        local.display_name,
        local.native_language
    );

    let translator = translator(config)?;
    let (mut session, events) = ConnectionSession::new(local, translator);

    let shutdown = shutdown.wait();
    tokio::pin!(shutdown);
    let link = tokio::select! {
        link = acceptor.accept() => link?,
        _ = &mut shutdown => {
            info!("stopped waiting for a peer");
            return Ok(());
        }
    };

    let transport = session.accept_incoming(link)?;
    run(session, transport, events, shutdown).await
}

/// Dials `peer` and chats with it.
pub async fn connect(peer: &str, config: &ClientConfig, shutdown: ShutdownSignal) -> ClientResult<()> {
    let local = config.identity.to_identity(generate_local_id());
    let translator = translator(config)?;
    let (session, events) = ConnectionSession::new(local, translator);
    let mut session = session.with_dialer(Arc::new(TcpDialer));

    println!("connecting to {}...", peer);
    let transport = session.initiate(peer).await?;
    run(session, transport, events, shutdown.wait()).await
}

fn translator(config: &ClientConfig) -> ClientResult<Arc<dyn Translate>> {
    Ok(Arc::new(config.translation.translator()?))
}

async fn run(
    session: ConnectionSession,
    transport: TransportEvents,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    shutdown: impl std::future::Future<Output = ()>,
) -> ClientResult<()> {
    let local = session.local().clone();
    let (driver, handle) = SessionDriver::new(session, transport);
    let driver_task = tokio::spawn(driver.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut shutdown_seen = false;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown, if !shutdown_seen => {
                shutdown_seen = true;
                handle.close();
                stdin_open = false;
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if line.trim() == QUIT_COMMAND => {
                    handle.close();
                    stdin_open = false;
                }
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if handle.send(line).is_err() {
                        break;
                    }
                }
                None => {
                    debug!("stdin closed");
                    handle.close();
                    stdin_open = false;
                }
            },
            event = events.recv() => {
                let Some(event) = event else { break };
                if let Some(line) = render_event(&event, &local) {
                    println!("{}", line);
                }
                match event {
                    SessionEvent::StateChanged(ConnectionState::Closed) => break,
                    SessionEvent::StateChanged(ConnectionState::Error) => handle.close(),
                    _ => {}
                }
            }
        }
    }

    let session = driver_task.await?;
    info!(messages = session.log().len(), "chat ended");
    Ok(())
}

/// Formats an event for the terminal. Returns `None` for events that are
/// only logged.
pub fn render_event(event: &SessionEvent, local: &PeerIdentity) -> Option<String> {
    match event {
        SessionEvent::Message(message) if message.is_from(&local.id) => {
            let mut line = format!("you: {}", message.original_text);
            if let (Some(translated), Some(target)) =
                (&message.translated_text, &message.target_language)
            {
                line.push_str(&format!("  [{}: {}]", target, translated));
            }
            Some(line)
        }
        SessionEvent::Message(message) => {
            let mut line = format!("{}: {}", message.sender_name, message.primary_text());
            if message.is_translated() {
                line.push_str(&format!(
                    "  [{}: {}]",
                    message.original_language, message.original_text
                ));
            }
            Some(line)
        }
        SessionEvent::RemoteIdentity(peer) => Some(format!(
            "connected to {} ({})",
            peer.display_name, peer.native_language
        )),
        SessionEvent::StateChanged(ConnectionState::Closed) => Some("session closed".to_string()),
        SessionEvent::StateChanged(state) => {
            debug!(state = %state, "session state changed");
            None
        }
        SessionEvent::Error(detail) => Some(format!("error: {}", detail)),
    }
}
