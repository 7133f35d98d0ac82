//! UI-agnostic application state types
//!
//! This module contains data structures that are shared between the uploader
//! and the query console and don't depend on any specific UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a transcript entry's author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// An excerpt the backend returned to ground an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnippet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<SourceSnippet>,
    pub created_at: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            sources: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<SourceSnippet>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            sources,
            created_at: Utc::now(),
        }
    }
}

/// Append-only log of entries, oldest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a TranscriptEntry;
    type IntoIter = std::slice::Iter<'a, TranscriptEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Requested number of supporting snippets, always within `[MIN, MAX]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TopK(u32);

impl TopK {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 20;

    /// Out-of-range values are clamped, not rejected
    pub fn new(value: u32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn increment(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }

    pub fn decrement(self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }
}

impl Default for TopK {
    fn default() -> Self {
        Self(5)
    }
}

impl std::fmt::Display for TopK {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-component guard: at most one request of a kind is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Submission {
    #[default]
    Idle,
    InFlight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_is_clamped_to_range() {
        assert_eq!(TopK::new(0).get(), 1);
        assert_eq!(TopK::new(7).get(), 7);
        assert_eq!(TopK::new(99).get(), 20);
        assert_eq!(TopK::new(20).increment().get(), 20);
        assert_eq!(TopK::new(1).decrement().get(), 1);
        assert_eq!(TopK::default().increment().get(), 6);
    }

    #[test]
    fn transcript_iterates_oldest_first_every_time() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::user("first"));
        transcript.push(TranscriptEntry::assistant("second", Vec::new()));
        transcript.push(TranscriptEntry::user("third"));

        let render = |t: &Transcript| t.iter().map(|e| e.content.clone()).collect::<Vec<_>>();
        let once = render(&transcript);
        let twice = render(&transcript);
        assert_eq!(once, vec!["first", "second", "third"]);
        assert_eq!(once, twice);
        assert_eq!(transcript.last().map(|e| e.role), Some(ChatRole::User));
    }

    #[test]
    fn snippet_meta_is_optional_on_the_wire() {
        let snippet: SourceSnippet =
            serde_json::from_str(r#"{"id": "a1", "text": "..."}"#).unwrap();
        assert_eq!(snippet.id, "a1");
        assert_eq!(snippet.meta, None);

        let with_meta: SourceSnippet =
            serde_json::from_str(r#"{"id": "b2", "text": "t", "meta": {"page": 3}}"#).unwrap();
        assert_eq!(with_meta.meta, Some(serde_json::json!({"page": 3})));
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ChatRole::Assistant).unwrap(), "\"assistant\"");
    }
}
