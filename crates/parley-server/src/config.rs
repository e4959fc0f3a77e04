//! Server configuration.

use std::net::SocketAddr;

use parley_translate::{BackendPreset, TranslationDispatcher};

use crate::error::{ServerError, ServerResult};

/// Environment variable holding the bind address.
pub const BIND_ENV: &str = "PARLEY_BIND";

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8888";

/// Server configuration.
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: Option<SocketAddr>,

    /// Groq API key.
    pub groq_api_key: Option<String>,

    /// Cerebras API key.
    pub cerebras_api_key: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind_addr())
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "<redacted>"))
            .field("cerebras_api_key", &self.cerebras_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment, once.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let bind = match lookup(BIND_ENV).filter(|v| !v.trim().is_empty()) {
            Some(value) => Some(value.trim().parse::<SocketAddr>().map_err(|e| {
                ServerError::config(format!("invalid {} value '{}': {}", BIND_ENV, value, e))
            })?),
            None => None,
        };

        Ok(Self {
            bind,
            groq_api_key: lookup(BackendPreset::Groq.api_key_env()),
            cerebras_api_key: lookup(BackendPreset::Cerebras.api_key_env()),
        })
    }

    /// Builder: set the bind address.
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = Some(bind);
        self
    }

    /// Builder: set the Groq API key.
    pub fn with_groq_api_key(mut self, key: impl Into<String>) -> Self {
        self.groq_api_key = Some(key.into());
        self
    }

    /// Builder: set the Cerebras API key.
    pub fn with_cerebras_api_key(mut self, key: impl Into<String>) -> Self {
        self.cerebras_api_key = Some(key.into());
        self
    }

    /// Address to listen on.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind.unwrap_or_else(default_bind)
    }

    /// Builds the dispatcher for these credentials.
    pub fn dispatcher(&self) -> ServerResult<TranslationDispatcher> {
        Ok(TranslationDispatcher::from_credentials(
            self.groq_api_key.clone(),
            self.cerebras_api_key.clone(),
        )?)
    }
}

/// Returns the default bind address.
pub fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8888))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr().to_string(), DEFAULT_BIND);
        assert!(config.groq_api_key.is_none());
        assert!(config.cerebras_api_key.is_none());
    }

    #[test]
    fn reads_keys_and_bind() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("GROQ_API_KEY", "gsk_abcdef"),
            ("CEREBRAS_API_KEY", "csk_abcdef"),
            ("PARLEY_BIND", "0.0.0.0:9000"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr().port(), 9000);
        assert_eq!(config.groq_api_key.as_deref(), Some("gsk_abcdef"));

        let dispatcher = config.dispatcher().unwrap();
        assert_eq!(dispatcher.configured_names().len(), 2);
    }

    #[test]
    fn invalid_bind_is_config_error() {
        let err = ServerConfig::from_lookup(lookup(&[("PARLEY_BIND", "not-an-addr")])).unwrap_err();
        assert!(matches!(err, ServerError::Config { .. }));
    }

    #[test]
    fn debug_redacts_keys() {
        let config = ServerConfig::default().with_groq_api_key("gsk_secret_value");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("gsk_secret_value"));
        assert!(debug.contains("<redacted>"));
    }
}
