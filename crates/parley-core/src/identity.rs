//! Peer identities and language tags.
//!
//! A [`PeerIdentity`] is created locally once the transport has assigned an
//! id, or received from the remote side's handshake frame. It never changes
//! after creation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A language tag such as `"es"` or `"en-US"`.
///
/// Tags are stored as given. Equality between tags used for translation
/// decisions is case-insensitive, see [`LanguageTag::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Creates a new language tag, trimming surrounding whitespace.
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self(tag.trim().to_string())
    }

    /// Returns the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison of the full tag.
    ///
    /// `"en-US"` and `"en-us"` match, `"en"` and `"en-US"` do not.
    pub fn matches(&self, other: &LanguageTag) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Returns true if the tag is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LanguageTag {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// The identity of one endpoint of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerIdentity {
    /// Opaque transport-assigned id.
    pub id: String,
    /// Name shown to the other side.
    #[serde(rename = "name")]
    pub display_name: String,
    /// The language this user reads and writes.
    #[serde(rename = "nativeLang")]
    pub native_language: LanguageTag,
}

impl PeerIdentity {
    /// Creates a new identity.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        native_language: impl Into<LanguageTag>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            native_language: native_language.into(),
        }
    }

    /// Returns true if messages from `self` must be translated for `other`.
    pub fn needs_translation_for(&self, other: &PeerIdentity) -> bool {
        !self.native_language.matches(&other.native_language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tag_trims_and_matches_case_insensitively() {
        let a = LanguageTag::new(" en-US ");
        assert_eq!(a.as_str(), "en-US");
        assert!(a.matches(&LanguageTag::new("en-us")));
        assert!(!a.matches(&LanguageTag::new("en")));
    }

    #[test]
    fn identity_wire_field_names() {
        let identity = PeerIdentity::new("peer-1", "Ana", "es");
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["id"], "peer-1");
        assert_eq!(json["name"], "Ana");
        assert_eq!(json["nativeLang"], "es");

        let parsed: PeerIdentity = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, identity);
    }

    #[test]
    fn translation_needed_only_when_languages_differ() {
        let ana = PeerIdentity::new("a", "Ana", "es");
        let bob = PeerIdentity::new("b", "Bob", "en");
        let eva = PeerIdentity::new("c", "Eva", "ES");

        assert!(ana.needs_translation_for(&bob));
        assert!(!ana.needs_translation_for(&eva));
    }
}
