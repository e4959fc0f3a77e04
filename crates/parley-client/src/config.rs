//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/parley/config.toml` by default.
//!
//! API key values support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is
//!
//! Keys missing from the file fall back to `GROQ_API_KEY` and
//! `CEREBRAS_API_KEY`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use parley_core::{LanguageTag, PeerIdentity};
use parley_translate::{BackendPreset, FallbackTranslator, RemoteTranslator, TranslationDispatcher};

use crate::error::{ClientError, ClientResult};

/// Configuration for the parley client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Who the local user is.
    pub identity: IdentitySettings,

    /// Where translations come from.
    pub translation: TranslationSettings,

    /// Peer chat settings.
    pub chat: ChatSettings,
}

/// Local user identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Name shown to peers.
    pub name: String,

    /// Language the user reads and writes.
    pub native_language: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            name: "anonymous".to_string(),
            native_language: "en".to_string(),
        }
    }
}

impl IdentitySettings {
    /// Builds the identity for a transport-assigned id.
    pub fn to_identity(&self, id: impl Into<String>) -> PeerIdentity {
        PeerIdentity::new(id, self.name.trim(), LanguageTag::new(&self.native_language))
    }
}

/// Translation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    /// URL of a `/translate` endpoint tried before local backends.
    pub endpoint: Option<String>,

    /// Groq API key (supports `pass::` and `env::` prefixes).
    pub groq_api_key: Option<String>,

    /// Cerebras API key (supports `pass::` and `env::` prefixes).
    pub cerebras_api_key: Option<String>,

    /// Endpoint request timeout in seconds.
    pub timeout: u64,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            groq_api_key: None,
            cerebras_api_key: None,
            timeout: 30,
        }
    }
}

/// Resolved backend credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BackendKeys {
    pub groq: Option<String>,
    pub cerebras: Option<String>,
}

impl std::fmt::Debug for BackendKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendKeys")
            .field("groq", &self.groq.as_ref().map(|_| "<redacted>"))
            .field("cerebras", &self.cerebras.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TranslationSettings {
    /// Resolves both keys, falling back to the environment.
    pub fn resolve_keys(&self) -> Result<BackendKeys, String> {
        self.resolve_keys_with(|name| std::env::var(name).ok())
    }

    /// Resolves both keys, using `lookup` for the environment fallback.
    pub fn resolve_keys_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<BackendKeys, String> {
        let resolve = |raw: Option<&String>, preset: BackendPreset| -> Result<Option<String>, String> {
            match raw {
                Some(value) => crate::secret::resolve(value)
                    .map(Some)
                    .map_err(|e| format!("failed to resolve {} key: {}", preset.name(), e)),
                None => Ok(lookup(preset.api_key_env())),
            }
        };

        Ok(BackendKeys {
            groq: resolve(self.groq_api_key.as_ref(), BackendPreset::Groq)?,
            cerebras: resolve(self.cerebras_api_key.as_ref(), BackendPreset::Cerebras)?,
        })
    }

    /// Builds the local dispatcher from the resolved keys.
    pub fn dispatcher(&self) -> ClientResult<TranslationDispatcher> {
        let keys = self.resolve_keys().map_err(ClientError::Config)?;
        Ok(TranslationDispatcher::from_credentials(keys.groq, keys.cerebras)?)
    }

    /// Builds the translator used by chat and the `translate` command.
    pub fn translator(&self) -> ClientResult<FallbackTranslator> {
        let remote = match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Some(RemoteTranslator::with_timeout(
                endpoint,
                Duration::from_secs(self.timeout),
            )?),
            _ => None,
        };
        Ok(FallbackTranslator::new(remote, self.dispatcher()?))
    }
}

/// Peer chat settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Address `parley listen` binds to.
    pub listen: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7878".to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
    }

    /// Checks the values that are not validated by parsing.
    pub fn validate(&self) -> Result<(), String> {
        if self.identity.name.trim().is_empty() {
            return Err("identity.name must not be empty".to_string());
        }
        if self.identity.native_language.trim().is_empty() {
            return Err("identity.native_language must not be empty".to_string());
        }
        if let Some(ref endpoint) = self.translation.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(format!(
                    "translation.endpoint must be an http(s) URL, got '{}'",
                    endpoint
                ));
            }
        }
        self.chat
            .listen
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid chat.listen '{}': {}", self.chat.listen, e))?;
        Ok(())
    }
}
