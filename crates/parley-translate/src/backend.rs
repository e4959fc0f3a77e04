//! Translation traits.
//!
//! Two seams live here:
//!
//! - [`TranslationBackend`] is one external service that turns text into a
//!   translation. The dispatcher owns a set of these.
//! - [`Translate`] is what callers (chat sessions, the HTTP handler, live
//!   preview) depend on. The dispatcher, the remote endpoint client and
//!   the fallback wrapper all implement it.

use std::future::Future;
use std::pin::Pin;

use parley_core::LanguageTag;

use crate::dispatcher::Translation;
use crate::error::{BackendResult, TranslationResult};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Credentials this short or shorter are treated as placeholders.
pub const MIN_CREDENTIAL_LEN: usize = 5;

/// Returns true if `credential` looks like a real key.
///
/// Leading and trailing whitespace is ignored.
pub fn credential_is_usable(credential: Option<&str>) -> bool {
    credential.is_some_and(|key| key.trim().len() > MIN_CREDENTIAL_LEN)
}

/// One external translation service.
///
/// # Implementation Notes
///
/// - `is_configured` is decided once at construction and must not change
/// - `translate` returns the translated text only; an empty string is
///   treated as a failure by the dispatcher
/// - implementations do not retry, the dispatcher handles fallback
pub trait TranslationBackend: Send + Sync {
    /// Stable name, used in health output and failure reports.
    fn name(&self) -> &str;

    /// Whether this backend has a usable credential.
    fn is_configured(&self) -> bool;

    /// Translates `text` into `target`.
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target: &'a LanguageTag,
    ) -> BoxFuture<'a, BackendResult<String>>;
}

/// Anything that can produce a [`Translation`].
pub trait Translate: Send + Sync {
    /// Translates `text` into `target`.
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target: &'a LanguageTag,
    ) -> BoxFuture<'a, TranslationResult<Translation>>;
}

impl<T: Translate + ?Sized> Translate for std::sync::Arc<T> {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target: &'a LanguageTag,
    ) -> BoxFuture<'a, TranslationResult<Translation>> {
        (**self).translate(text, target)
    }
}
