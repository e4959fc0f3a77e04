//! Translation backends and the dispatcher that falls back between them.
//!
//! - [`TranslationBackend`] - one external translation service
//! - [`ChatCompletionBackend`] - OpenAI-compatible chat-completion backend
//!   (Groq, Cerebras presets)
//! - [`TranslationDispatcher`] - picks among configured backends, falls back
//!   to the second on failure
//! - [`RemoteTranslator`] / [`FallbackTranslator`] - the `/translate` HTTP
//!   endpoint, with direct backend calls when the endpoint is missing
//! - [`LivePreview`] / [`DebouncedPreview`] - sequence-guarded live
//!   translation of text being typed
//!
//! # Architecture
//!
//! ```text
//!   Groq API        Cerebras API
//!      ^                 ^
//!      |                 |
//! ChatCompletionBackend (one per service)
//!      ^
//!      | TranslationBackend
//! TranslationDispatcher <---- FallbackTranslator ----> POST /translate
//!      ^                            ^
//!      | Translate                  | Translate
//!      +------ chat sessions, live preview, HTTP handler
//! ```

pub mod backend;
pub mod completion;
pub mod dispatcher;
pub mod error;
pub mod preview;
pub mod remote;

pub use backend::{BoxFuture, MIN_CREDENTIAL_LEN, Translate, TranslationBackend, credential_is_usable};
pub use completion::{BackendPreset, ChatCompletionBackend, CompletionConfig};
pub use dispatcher::{
    FixedOrder, MAX_ATTEMPTS, RandomSelection, SelectionStrategy, Translation,
    TranslationDispatcher,
};
pub use error::{
    BackendError, BackendErrorCode, BackendResult, TranslationAttempt, TranslationError,
    TranslationErrorCode, TranslationResult,
};
pub use preview::{DebouncedPreview, LivePreview, PreviewSnapshot, PreviewTicket};
pub use remote::{FallbackTranslator, RemoteTranslator};
