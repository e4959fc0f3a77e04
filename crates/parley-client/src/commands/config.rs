//! Configuration commands.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout. Inline keys are redacted.
pub fn dump(config: &ClientConfig) -> ClientResult<()> {
    let mut shown = config.clone();
    shown.translation.groq_api_key = shown.translation.groq_api_key.map(redact);
    shown.translation.cerebras_api_key = shown.translation.cerebras_api_key.map(redact);

    let toml_str = toml::to_string_pretty(&shown)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{}", toml_str);
    Ok(())
}

/// Keeps secret references, hides inline values.
fn redact(value: String) -> String {
    if value.starts_with("env::") || value.starts_with("pass::") {
        value
    } else {
        "<redacted>".to_string()
    }
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;

    let keys = config
        .translation
        .resolve_keys()
        .map_err(|e| ClientError::Config(format!("invalid translation keys: {}", e)))?;
    let dispatcher = parley_translate::TranslationDispatcher::from_credentials(keys.groq, keys.cerebras)?;
    let configured = dispatcher.configured_names();
    if configured.is_empty() && config.translation.endpoint.is_none() {
        println!("warning: no translation endpoint or backend key configured; messages will be sent untranslated.");
    } else if !configured.is_empty() {
        println!("Local backends: {}", configured.join(", "));
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    println!("config: {}", ClientConfig::default_path().display());
    Ok(())
}
