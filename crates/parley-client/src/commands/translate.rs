//! One-shot translation command.

use tracing::info;

use parley_core::LanguageTag;
use parley_translate::Translate;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Translates `text` into `to` and prints the result.
pub async fn run(text: &str, to: &str, config: &ClientConfig) -> ClientResult<()> {
    let translator = config.translation.translator()?;
    let target = LanguageTag::new(to);
    let translation = translator.translate(text, &target).await?;

    info!(
        provider = translation.provider.as_deref().unwrap_or("none"),
        attempts = translation.attempts.len(),
        "translated"
    );
    println!("{}", translation.text);
    Ok(())
}
