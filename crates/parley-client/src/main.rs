//! parley CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use parley_client::cli::{Cli, Command, ConfigAction};
use parley_client::commands;
use parley_client::config::ClientConfig;
use parley_client::error::{ClientError, ClientResult};
use parley_core::{TracingConfig, init_tracing};
use parley_server::SignalHandler;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = match cli.command {
        Some(Command::Serve { .. }) => TracingConfig::server(),
        _ => TracingConfig::cli(cli.debug),
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let mut config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };

    // CLI flags override the file
    if let Some(name) = cli.name {
        config.identity.name = name;
    }
    if let Some(lang) = cli.lang {
        config.identity.native_language = lang;
    }
    if let Some(endpoint) = cli.endpoint {
        config.translation.endpoint = Some(endpoint);
    }

    match cli.command {
        Some(Command::Listen { addr }) => {
            let addr = addr.unwrap_or_else(|| config.chat.listen.clone());
            commands::chat::listen(&addr, &config, shutdown_signal()).await
        }
        Some(Command::Connect { peer }) => {
            commands::chat::connect(&peer, &config, shutdown_signal()).await
        }
        Some(Command::Translate { text, to }) => commands::translate::run(&text, &to, &config).await,
        Some(Command::Serve { bind }) => commands::serve::run(bind, &config).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
        None => {
            println!("parley - translated peer-to-peer chat");
            println!();
            println!("Run 'parley --help' for usage information.");
            println!();
            println!("Quick start:");
            println!("  1. Set GROQ_API_KEY or CEREBRAS_API_KEY, or point translation.endpoint at a `parley serve`");
            println!("  2. One side: parley --name Ana --lang es listen");
            println!("  3. Other side: parley --name Ben --lang en connect <host:port>");
            Ok(())
        }
    }
}

fn shutdown_signal() -> parley_server::ShutdownSignal {
    let signals = SignalHandler::new();
    signals.spawn_listener();
    signals.shutdown()
}
