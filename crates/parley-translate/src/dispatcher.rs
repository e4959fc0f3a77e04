//! Backend selection with fallback.

use std::collections::{BTreeMap, BTreeSet};

use parley_core::LanguageTag;
use parley_protocol::BackendHealth;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::backend::{BoxFuture, Translate, TranslationBackend};
use crate::completion::{BackendPreset, ChatCompletionBackend};
use crate::error::{BackendError, BackendResult, TranslationAttempt, TranslationError, TranslationResult};

/// No call tries more backends than this.
pub const MAX_ATTEMPTS: usize = 2;

/// A produced translation and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Translated text. Empty only for empty input.
    pub text: String,
    /// Backend that produced it. `None` when no backend was called.
    pub provider: Option<String>,
    /// Every backend tried, in order, the successful one last.
    pub attempts: Vec<TranslationAttempt>,
}

impl Translation {
    /// The translation of empty input.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            provider: None,
            attempts: Vec::new(),
        }
    }

    /// A translation produced by `provider`.
    pub fn from_provider(text: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: Some(provider.into()),
            attempts: Vec::new(),
        }
    }

    /// Returns true if no text was produced.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Chooses the order in which configured backends are tried.
pub trait SelectionStrategy: Send + Sync {
    /// Returns indices into `0..candidates` in try order. Repeated or
    /// out-of-range indices are skipped.
    fn order(&self, candidates: usize) -> Vec<usize>;
}

/// Shuffles candidates on every call, spreading load across services.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelection;

impl SelectionStrategy for RandomSelection {
    fn order(&self, candidates: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..candidates).collect();
        order.shuffle(&mut rand::rng());
        order
    }
}

/// Always tries candidates in registration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOrder;

impl SelectionStrategy for FixedOrder {
    fn order(&self, candidates: usize) -> Vec<usize> {
        (0..candidates).collect()
    }
}

/// Routes translation requests to configured backends.
///
/// Backends are registered once; whether each is usable is fixed at that
/// point. A call tries at most [`MAX_ATTEMPTS`] distinct backends and
/// never the same one twice.
pub struct TranslationDispatcher {
    backends: Vec<Box<dyn TranslationBackend>>,
    strategy: Box<dyn SelectionStrategy>,
}

impl Default for TranslationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TranslationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationDispatcher")
            .field("backends", &self.status())
            .finish_non_exhaustive()
    }
}

impl TranslationDispatcher {
    /// Creates a dispatcher with no backends and random selection.
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            strategy: Box::new(RandomSelection),
        }
    }

    /// Creates a dispatcher with the Groq and Cerebras backends.
    pub fn from_credentials(
        groq_api_key: Option<String>,
        cerebras_api_key: Option<String>,
    ) -> BackendResult<Self> {
        let dispatcher = Self::new()
            .with_backend(ChatCompletionBackend::from_preset(BackendPreset::Groq, groq_api_key)?)
            .with_backend(ChatCompletionBackend::from_preset(
                BackendPreset::Cerebras,
                cerebras_api_key,
            )?);
        info!(configured = ?dispatcher.configured_names(), "translation dispatcher ready");
        Ok(dispatcher)
    }

    /// Registers a backend.
    pub fn with_backend(mut self, backend: impl TranslationBackend + 'static) -> Self {
        self.backends.push(Box::new(backend));
        self
    }

    /// Replaces the selection strategy.
    pub fn with_strategy(mut self, strategy: impl SelectionStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// Names of backends with a usable credential.
    pub fn configured_names(&self) -> Vec<&str> {
        self.backends
            .iter()
            .filter(|b| b.is_configured())
            .map(|b| b.name())
            .collect()
    }

    /// Returns true if at least one backend can be called.
    pub fn has_configured_backend(&self) -> bool {
        self.backends.iter().any(|b| b.is_configured())
    }

    /// Credential state of every registered backend.
    pub fn status(&self) -> BTreeMap<String, BackendHealth> {
        self.backends
            .iter()
            .map(|b| {
                (
                    b.name().to_string(),
                    BackendHealth::from_configured(b.is_configured()),
                )
            })
            .collect()
    }

    async fn dispatch(&self, text: &str, target: &LanguageTag) -> TranslationResult<Translation> {
        if text.trim().is_empty() {
            return Ok(Translation::empty());
        }

        let candidates: Vec<&dyn TranslationBackend> = self
            .backends
            .iter()
            .filter(|b| b.is_configured())
            .map(|b| b.as_ref())
            .collect();

        if candidates.is_empty() {
            return Err(TranslationError::Configuration(
                "no translation backend configured".to_string(),
            ));
        }

        let mut attempts = Vec::with_capacity(MAX_ATTEMPTS);
        let order = self.strategy.order(candidates.len());
        let mut seen = BTreeSet::new();

        for backend in order
            .into_iter()
            .filter(|index| seen.insert(*index))
            .filter_map(|index| candidates.get(index).copied())
            .take(MAX_ATTEMPTS)
        {
            let name = backend.name();
            debug!(backend = name, target = %target, "trying translation backend");

            let error = match backend.translate(text, target).await {
                Ok(translated) if !translated.trim().is_empty() => {
                    attempts.push(TranslationAttempt::success(name));
                    return Ok(Translation {
                        text: translated,
                        provider: Some(name.to_string()),
                        attempts,
                    });
                }
                Ok(_) => BackendError::empty_content().with_backend(name),
                Err(err) => err,
            };

            warn!(backend = name, error = %error, "translation backend failed");
            attempts.push(TranslationAttempt::failure(name, &error));

            if !error.code().is_fallback_eligible() {
                break;
            }
        }

        Err(TranslationError::AggregateFailure { attempts })
    }
}

impl Translate for TranslationDispatcher {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target: &'a LanguageTag,
    ) -> BoxFuture<'a, TranslationResult<Translation>> {
        Box::pin(self.dispatch(text, target))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::TranslationErrorCode;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend that counts calls.
    pub(crate) struct MockBackend {
        name: &'static str,
        configured: bool,
        reply: Result<&'static str, fn() -> BackendError>,
        pub(crate) calls: Arc<AtomicUsize>,
    }

    impl MockBackend {
        pub(crate) fn ok(name: &'static str, reply: &'static str) -> Self {
            Self {
                name,
                configured: true,
                reply: Ok(reply),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn failing(name: &'static str) -> Self {
            Self {
                reply: Err(|| BackendError::http_status(503, "overloaded")),
                ..Self::ok(name, "")
            }
        }

        pub(crate) fn unconfigured(name: &'static str) -> Self {
            Self {
                configured: false,
                ..Self::ok(name, "unused")
            }
        }

        fn counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }
    }

    impl TranslationBackend for MockBackend {
        fn name(&self) -> &str {
            self.name
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        fn translate<'a>(
            &'a self,
            _text: &'a str,
            _target: &'a LanguageTag,
        ) -> BoxFuture<'a, BackendResult<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .reply
                .map(str::to_string)
                .map_err(|make| make().with_backend(self.name));
            Box::pin(async move { reply })
        }
    }

    struct Reversed;

    impl SelectionStrategy for Reversed {
        fn order(&self, candidates: usize) -> Vec<usize> {
            (0..candidates).rev().collect()
        }
    }

    struct Repeating;

    impl SelectionStrategy for Repeating {
        fn order(&self, candidates: usize) -> Vec<usize> {
            let mut order = vec![0, 0];
            order.extend(1..candidates);
            order
        }
    }

    fn en() -> LanguageTag {
        LanguageTag::new("en")
    }

    #[tokio::test]
    async fn empty_input_calls_nothing() {
        let a = MockBackend::ok("a", "x");
        let calls = a.counter();
        let dispatcher = TranslationDispatcher::new().with_backend(a);

        for input in ["", "   ", "\n\t"] {
            let result = dispatcher.translate(input, &en()).await.unwrap();
            assert!(result.is_empty());
            assert_eq!(result.provider, None);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn single_configured_backend_is_the_only_one_called() {
        let a = MockBackend::ok("a", "Hello");
        let b = MockBackend::unconfigured("b");
        let b_calls = b.counter();
        let dispatcher = TranslationDispatcher::new().with_backend(a).with_backend(b);

        for _ in 0..10 {
            let result = dispatcher.translate("Hola", &en()).await.unwrap();
            assert_eq!(result.text, "Hello");
            assert_eq!(result.provider.as_deref(), Some("a"));
        }
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_when_first_backend_fails() {
        let a = MockBackend::failing("a");
        let b = MockBackend::ok("b", "Hello");
        let dispatcher = TranslationDispatcher::new()
            .with_backend(a)
            .with_backend(b)
            .with_strategy(FixedOrder);

        let result = dispatcher.translate("Hola", &en()).await.unwrap();
        assert_eq!(result.text, "Hello");
        assert_eq!(result.provider.as_deref(), Some("b"));
        assert_eq!(result.attempts.len(), 2);
        assert!(!result.attempts[0].succeeded);
        assert!(result.attempts[1].succeeded);
    }

    #[tokio::test]
    async fn empty_content_counts_as_failure() {
        let a = MockBackend::ok("a", "   ");
        let b = MockBackend::ok("b", "Hello");
        let dispatcher = TranslationDispatcher::new()
            .with_backend(a)
            .with_backend(b)
            .with_strategy(FixedOrder);

        let result = dispatcher.translate("Hola", &en()).await.unwrap();
        assert_eq!(result.provider.as_deref(), Some("b"));
        assert!(
            result.attempts[0]
                .error_detail
                .as_deref()
                .is_some_and(|d| d.starts_with("empty_content"))
        );
    }

    #[tokio::test]
    async fn both_failing_reports_two_attempts_and_no_retry() {
        let a = MockBackend::failing("a");
        let b = MockBackend::failing("b");
        let (a_calls, b_calls) = (a.counter(), b.counter());
        let dispatcher = TranslationDispatcher::new()
            .with_backend(a)
            .with_backend(b)
            .with_strategy(Reversed);

        let err = dispatcher.translate("Hola", &en()).await.unwrap_err();
        assert_eq!(err.code(), TranslationErrorCode::AggregateFailure);
        let names: Vec<_> = err.attempts().iter().map(|a| a.backend_name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert!(err.attempts().iter().all(|a| a.error_detail.is_some()));
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn never_more_than_two_attempts() {
        let backends = [
            MockBackend::failing("a"),
            MockBackend::failing("b"),
            MockBackend::failing("c"),
        ];
        let c_calls = backends[2].counter();
        let dispatcher = backends
            .into_iter()
            .fold(TranslationDispatcher::new().with_strategy(FixedOrder), |d, b| {
                d.with_backend(b)
            });

        let err = dispatcher.translate("Hola", &en()).await.unwrap_err();
        assert_eq!(err.attempts().len(), MAX_ATTEMPTS);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_index_from_strategy_is_tried_once() {
        let a = MockBackend::failing("a");
        let b = MockBackend::ok("b", "Hello");
        let (a_calls, b_calls) = (a.counter(), b.counter());
        let dispatcher = TranslationDispatcher::new()
            .with_backend(a)
            .with_backend(b)
            .with_strategy(Repeating);

        let result = dispatcher.translate("Hola", &en()).await.unwrap();
        assert_eq!(result.provider.as_deref(), Some("b"));
        let names: Vec<_> = result.attempts.iter().map(|a| a.backend_name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_configured_backend_is_a_configuration_error() {
        let a = MockBackend::unconfigured("a");
        let calls = a.counter();
        let dispatcher = TranslationDispatcher::new().with_backend(a);

        let err = dispatcher.translate("Hola", &en()).await.unwrap_err();
        assert_eq!(err.code(), TranslationErrorCode::ConfigurationError);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn random_selection_eventually_starts_with_either() {
        let a = MockBackend::ok("a", "from a");
        let b = MockBackend::ok("b", "from b");
        let dispatcher = TranslationDispatcher::new().with_backend(a).with_backend(b);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let result = dispatcher.translate("Hola", &en()).await.unwrap();
            seen.insert(result.provider.unwrap_or_default());
            if seen.len() == 2 {
                break;
            }
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn random_selection_is_a_permutation() {
        let mut order = RandomSelection.order(5);
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn status_reports_every_backend() {
        let dispatcher = TranslationDispatcher::new()
            .with_backend(MockBackend::ok("groq", "x"))
            .with_backend(MockBackend::unconfigured("cerebras"));
        let status = dispatcher.status();
        assert_eq!(status.get("groq"), Some(&BackendHealth::Configured));
        assert_eq!(status.get("cerebras"), Some(&BackendHealth::Missing));
        assert_eq!(dispatcher.configured_names(), vec!["groq"]);
    }

    #[test]
    fn from_credentials_applies_threshold() {
        let dispatcher =
            TranslationDispatcher::from_credentials(Some("gsk_live_key".into()), Some("short".into()))
                .unwrap();
        assert_eq!(dispatcher.configured_names(), vec!["groq"]);
        assert!(dispatcher.has_configured_backend());
    }
}
