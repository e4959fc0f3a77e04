//! Chat messages and the append-only message log.
//!
//! A [`ChatMessage`] is created once by the sending session and never
//! mutated afterwards. Both endpoints append it to their [`MessageLog`].

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::identity::{LanguageTag, PeerIdentity};

/// A time-ordered message identifier.
///
/// Ids are rendered as `<millis>-<counter>-<sender_id>` with the numeric
/// parts zero-padded, so string order equals creation order within one
/// generator and ids from the two endpoints of a session never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps an id received from the wire.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates unique, time-ordered message ids for one sender.
#[derive(Debug)]
pub struct MessageIdGenerator {
    sender_id: String,
    last_millis: i64,
    counter: u32,
}

impl MessageIdGenerator {
    /// Creates a generator for ids of messages sent by `sender_id`.
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            last_millis: 0,
            counter: 0,
        }
    }

    /// Returns the next id using the current wall clock.
    pub fn next_id(&mut self) -> MessageId {
        self.next_at(Utc::now().timestamp_millis())
    }

    /// Returns the next id for the given timestamp.
    ///
    /// A clock that goes backwards is clamped to the last seen value so ids
    /// keep increasing.
    pub fn next_at(&mut self, millis: i64) -> MessageId {
        if millis > self.last_millis {
            self.last_millis = millis;
            self.counter = 0;
        } else {
            self.counter += 1;
        }
        MessageId(format!(
            "{:013}-{:06}-{}",
            self.last_millis, self.counter, self.sender_id
        ))
    }
}

/// One chat message as exchanged between endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique per session, time-ordered.
    pub id: MessageId,
    /// Transport id of the sender.
    pub sender_id: String,
    /// Display name of the sender.
    pub sender_name: String,
    /// Text as typed by the sender.
    #[serde(rename = "text")]
    pub original_text: String,
    /// Text translated into the receiver's language, if translation ran
    /// and succeeded before the message was sent.
    #[serde(default)]
    pub translated_text: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Language of `original_text`.
    #[serde(rename = "originalLang")]
    pub original_language: LanguageTag,
    /// Language of `translated_text`.
    #[serde(
        rename = "targetLang",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_language: Option<LanguageTag>,
}

impl ChatMessage {
    /// Creates an untranslated message from `sender`.
    pub fn new(
        id: MessageId,
        sender: &PeerIdentity,
        text: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            sender_id: sender.id.clone(),
            sender_name: sender.display_name.clone(),
            original_text: text.into(),
            translated_text: None,
            timestamp,
            original_language: sender.native_language.clone(),
            target_language: None,
        }
    }

    /// Attaches a translation. Only used while building a message, before
    /// it is sent.
    pub fn with_translation(
        mut self,
        translated: impl Into<String>,
        target_language: LanguageTag,
    ) -> Self {
        self.translated_text = Some(translated.into());
        self.target_language = Some(target_language);
        self
    }

    /// Text to render for the receiver: the translation when present,
    /// otherwise the original.
    pub fn primary_text(&self) -> &str {
        self.translated_text
            .as_deref()
            .unwrap_or(&self.original_text)
    }

    /// Returns true if the message carries a translation.
    pub fn is_translated(&self) -> bool {
        self.translated_text.is_some()
    }

    /// Strict ownership check against the local transport-assigned id.
    pub fn is_from(&self, local_id: &str) -> bool {
        self.sender_id == local_id
    }
}

/// Ordered, append-only log of chat messages.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
}

impl MessageLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message at the end of the log.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Number of messages in the log.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in append order.
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    /// The most recently appended message.
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Looks up a message by id.
    pub fn get(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Borrows the log as a slice.
    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }
}
