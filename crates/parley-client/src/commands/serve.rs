//! Serve command: runs the translation endpoint in the foreground.

use std::net::SocketAddr;

use tracing::info;

use parley_server::{ServerConfig, SignalHandler, TranslateServer};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Serves `/translate` until SIGTERM or SIGINT.
///
/// Keys come from `[translation]` in the config file, falling back to the
/// environment.
pub async fn run(bind: Option<SocketAddr>, config: &ClientConfig) -> ClientResult<()> {
    let keys = config.translation.resolve_keys().map_err(ClientError::Config)?;
    let mut server_config = ServerConfig {
        groq_api_key: keys.groq,
        cerebras_api_key: keys.cerebras,
        ..ServerConfig::from_env()?
    };
    if let Some(bind) = bind {
        server_config = server_config.with_bind(bind);
    }

    let signals = SignalHandler::new();
    signals.spawn_listener();

    let server = TranslateServer::bind(&server_config).await?;
    info!(endpoint = %server.endpoint_url()?, "serving translations");
    server.serve(signals.shutdown()).await?;
    Ok(())
}
