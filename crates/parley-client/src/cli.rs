//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// parley - translated peer-to-peer chat
#[derive(Debug, Parser)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "PARLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Display name (overrides identity.name)
    #[arg(long, env = "PARLEY_NAME")]
    pub name: Option<String>,

    /// Native language tag (overrides identity.native_language)
    #[arg(long, short, env = "PARLEY_LANG")]
    pub lang: Option<String>,

    /// Translation endpoint URL (overrides translation.endpoint)
    #[arg(long, env = "PARLEY_ENDPOINT")]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Wait for a peer to connect, then chat
    Listen {
        /// Address to listen on (overrides chat.listen)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Connect to a listening peer and chat
    Connect {
        /// Peer address (host:port)
        peer: String,
    },

    /// Translate a single text and print the result
    Translate {
        /// Text to translate
        text: String,

        /// Target language
        #[arg(long, short)]
        to: String,
    },

    /// Run the translation endpoint in the foreground
    Serve {
        /// Address to bind (overrides PARLEY_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_connect_with_overrides() {
        let cli = Cli::try_parse_from(["parley", "--name", "Ana", "-l", "es", "connect", "10.0.0.2:7878"])
            .unwrap();
        assert_eq!(cli.name.as_deref(), Some("Ana"));
        assert_eq!(cli.lang.as_deref(), Some("es"));
        assert!(matches!(cli.command, Some(Command::Connect { ref peer }) if peer == "10.0.0.2:7878"));
    }

    #[test]
    fn translate_requires_target() {
        assert!(Cli::try_parse_from(["parley", "translate", "hola"]).is_err());
        let cli = Cli::try_parse_from(["parley", "translate", "hola", "--to", "en"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Translate { ref to, .. }) if to == "en"));
    }
}
