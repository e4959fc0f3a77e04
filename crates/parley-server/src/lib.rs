//! Translation endpoint server.
//!
//! This crate serves the `/translate` HTTP endpoint that chat clients use
//! when they do not hold backend credentials themselves:
//! - `POST /translate` runs the Groq/Cerebras dispatcher
//! - `GET /translate` reports which backends are configured
//! - graceful shutdown on SIGTERM/SIGINT
//!
//! # Example
//!
//! ```rust,no_run
//! use parley_server::{ServerConfig, SignalHandler, TranslateServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::from_env()?;
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!
//!     let server = TranslateServer::bind(&config).await?;
//!     server.serve(signals.shutdown()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod signals;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

pub use config::{BIND_ENV, DEFAULT_BIND, ServerConfig, default_bind};
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, MISSING_KEYS_MESSAGE, TRANSLATE_PATH, router};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};

/// A bound translation endpoint.
#[derive(Debug)]
pub struct TranslateServer {
    listener: TcpListener,
    state: AppState,
}

impl TranslateServer {
    /// Builds the dispatcher and binds the listener.
    pub async fn bind(config: &ServerConfig) -> ServerResult<Self> {
        let state = AppState::new(config.dispatcher()?);
        let addr = config.bind_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::bind(addr.to_string(), e))?;
        Ok(Self { listener, state })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// URL of the translate endpoint.
    pub fn endpoint_url(&self) -> ServerResult<String> {
        Ok(format!("http://{}{}", self.local_addr()?, TRANSLATE_PATH))
    }

    /// Serves requests until `shutdown` resolves.
    pub async fn serve(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        info!(
            addr = ?self.listener.local_addr().ok(),
            backends = ?self.state.dispatcher().configured_names(),
            "translation endpoint listening"
        );
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown.wait())
            .await?;
        info!("translation endpoint stopped");
        Ok(())
    }
}
