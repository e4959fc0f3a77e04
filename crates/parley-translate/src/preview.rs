//! Live translation preview for text that is still being typed.
//!
//! Every input change takes a new sequence number. A translation result is
//! applied only if it carries the latest number, so a slow response for an
//! old prefix can never overwrite the preview of newer text.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use parley_core::LanguageTag;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace};

use crate::backend::{BoxFuture, Translate};
use crate::dispatcher::Translation;
use crate::error::TranslationResult;

/// Work order for one preview translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTicket {
    /// Sequence number of the input change.
    pub seq: u64,
    /// Text to translate.
    pub text: String,
}

/// What the preview currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewSnapshot {
    /// Sequence number the snapshot belongs to.
    pub seq: u64,
    /// Translated preview, if any.
    pub text: Option<String>,
    /// Why the latest translation failed.
    pub error: Option<String>,
}

/// Sequence-guarded preview state.
#[derive(Debug, Default)]
pub struct LivePreview {
    latest: u64,
    snapshot: PreviewSnapshot,
}

impl LivePreview {
    /// Creates an empty preview.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an input change.
    ///
    /// Empty input clears the preview and returns `None`; anything else
    /// returns the ticket to translate.
    pub fn input(&mut self, text: &str) -> Option<PreviewTicket> {
        self.latest += 1;
        if text.trim().is_empty() {
            self.snapshot = PreviewSnapshot {
                seq: self.latest,
                ..PreviewSnapshot::default()
            };
            return None;
        }
        Some(PreviewTicket {
            seq: self.latest,
            text: text.to_string(),
        })
    }

    /// Applies a finished translation. Returns false if it was stale.
    pub fn apply(&mut self, seq: u64, result: TranslationResult<Translation>) -> bool {
        if seq != self.latest {
            trace!(seq, latest = self.latest, "discarding stale preview");
            return false;
        }
        self.snapshot = match result {
            Ok(translation) => PreviewSnapshot {
                seq,
                text: Some(translation.text).filter(|t| !t.is_empty()),
                error: None,
            },
            Err(err) => PreviewSnapshot {
                seq,
                text: None,
                error: Some(err.to_string()),
            },
        };
        true
    }

    /// Latest sequence number issued.
    pub fn latest_seq(&self) -> u64 {
        self.latest
    }

    /// The preview currently shown.
    pub fn snapshot(&self) -> &PreviewSnapshot {
        &self.snapshot
    }

    /// The translated preview text, if any.
    pub fn current(&self) -> Option<&str> {
        self.snapshot.text.as_deref()
    }
}

/// Drives a [`LivePreview`] from a stream of input changes.
pub struct DebouncedPreview {
    translator: Arc<dyn Translate>,
    target: LanguageTag,
    debounce: Duration,
}

impl DebouncedPreview {
    /// Default quiet period before a preview is requested.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

    /// Creates a driver translating into `target`.
    pub fn new(translator: Arc<dyn Translate>, target: LanguageTag) -> Self {
        Self {
            translator,
            target,
            debounce: Self::DEFAULT_DEBOUNCE,
        }
    }

    /// Sets the debounce period.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Runs until `input` closes, publishing every applied change.
    pub async fn run(
        self,
        mut input: mpsc::UnboundedReceiver<String>,
        output: watch::Sender<PreviewSnapshot>,
    ) {
        let mut preview = LivePreview::new();
        let mut pending: Option<(PreviewTicket, Instant)> = None;
        let mut in_flight: FuturesUnordered<BoxFuture<'static, (u64, TranslationResult<Translation>)>> =
            FuturesUnordered::new();

        loop {
            let deadline = pending.as_ref().map(|(_, at)| *at);

            tokio::select! {
                changed = input.recv() => {
                    let Some(text) = changed else {
                        debug!("preview input closed");
                        return;
                    };
                    match preview.input(&text) {
                        Some(ticket) => {
                            pending = Some((ticket, Instant::now() + self.debounce));
                        }
                        None => {
                            pending = None;
                            output.send_replace(preview.snapshot().clone());
                        }
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((ticket, _)) = pending.take() {
                        trace!(seq = ticket.seq, "requesting preview");
                        in_flight.push(self.request(ticket));
                    }
                }
                Some((seq, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    if preview.apply(seq, result) {
                        output.send_replace(preview.snapshot().clone());
                    }
                }
            }
        }
    }

    fn request(
        &self,
        ticket: PreviewTicket,
    ) -> BoxFuture<'static, (u64, TranslationResult<Translation>)> {
        let translator = Arc::clone(&self.translator);
        let target = self.target.clone();
        Box::pin(async move {
            let result = translator.translate(&ticket.text, &target).await;
            (ticket.seq, result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslationError;
    use std::sync::Mutex;

    /// Wraps input in angle brackets; texts starting with "slow" take 5s.
    #[derive(Default)]
    struct EchoTranslator {
        calls: Mutex<Vec<String>>,
    }

    impl Translate for EchoTranslator {
        fn translate<'a>(
            &'a self,
            text: &'a str,
            _target: &'a LanguageTag,
        ) -> BoxFuture<'a, TranslationResult<Translation>> {
            self.calls.lock().unwrap().push(text.to_string());
            Box::pin(async move {
                if text.starts_with("slow") {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok(Translation::from_provider(format!("<{text}>"), "echo"))
            })
        }
    }

    fn ok(text: &str) -> TranslationResult<Translation> {
        Ok(Translation::from_provider(text, "echo"))
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut preview = LivePreview::new();
        let old = preview.input("Ho").unwrap();
        let new = preview.input("Hola").unwrap();
        assert!(new.seq > old.seq);

        assert!(preview.apply(new.seq, ok("Hello")));
        assert!(!preview.apply(old.seq, ok("Hi")));
        assert_eq!(preview.current(), Some("Hello"));
    }

    #[test]
    fn empty_input_clears_and_invalidates() {
        let mut preview = LivePreview::new();
        let ticket = preview.input("Hola").unwrap();
        assert!(preview.apply(ticket.seq, ok("Hello")));

        let pending = preview.input("Hola amigo").unwrap();
        assert_eq!(preview.input("   "), None);
        assert_eq!(preview.current(), None);
        assert!(!preview.apply(pending.seq, ok("Hello friend")));
        assert_eq!(preview.current(), None);
    }

    #[test]
    fn failed_translation_shows_error() {
        let mut preview = LivePreview::new();
        let ticket = preview.input("Hola").unwrap();
        let err = TranslationError::Configuration("no translation backend configured".into());
        assert!(preview.apply(ticket.seq, Err(err)));
        assert_eq!(preview.current(), None);
        assert!(preview.snapshot().error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_requests_one_translation() {
        let translator = Arc::new(EchoTranslator::default());
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, mut output_rx) = watch::channel(PreviewSnapshot::default());
        let driver = DebouncedPreview::new(translator.clone(), LanguageTag::new("en"));
        let handle = tokio::spawn(driver.run(input_rx, output_tx));

        for text in ["H", "Ho", "Hol", "Hola"] {
            input_tx.send(text.to_string()).unwrap();
        }
        output_rx.changed().await.unwrap();

        assert_eq!(output_rx.borrow().text.as_deref(), Some("<Hola>"));
        assert_eq!(*translator.calls.lock().unwrap(), vec!["Hola".to_string()]);

        drop(input_tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_old_response_never_overwrites_newer_preview() {
        let translator = Arc::new(EchoTranslator::default());
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, mut output_rx) = watch::channel(PreviewSnapshot::default());
        let driver = DebouncedPreview::new(translator.clone(), LanguageTag::new("en"))
            .with_debounce(Duration::from_millis(100));
        let handle = tokio::spawn(driver.run(input_rx, output_tx));

        input_tx.send("slow hola".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        input_tx.send("fast hola".to_string()).unwrap();

        output_rx.changed().await.unwrap();
        assert_eq!(output_rx.borrow().text.as_deref(), Some("<fast hola>"));

        // let the slow request finish; it must be discarded
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(output_rx.borrow().text.as_deref(), Some("<fast hola>"));
        assert!(!output_rx.has_changed().unwrap());
        assert_eq!(translator.calls.lock().unwrap().len(), 2);

        drop(input_tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_input_publishes_empty_preview() {
        let translator = Arc::new(EchoTranslator::default());
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, mut output_rx) = watch::channel(PreviewSnapshot::default());
        let handle = tokio::spawn(
            DebouncedPreview::new(translator.clone(), LanguageTag::new("en")).run(input_rx, output_tx),
        );

        input_tx.send("Hola".to_string()).unwrap();
        output_rx.changed().await.unwrap();
        assert_eq!(output_rx.borrow_and_update().text.as_deref(), Some("<Hola>"));

        input_tx.send(String::new()).unwrap();
        output_rx.changed().await.unwrap();
        assert_eq!(output_rx.borrow().text, None);

        drop(input_tx);
        handle.await.unwrap();
    }
}
