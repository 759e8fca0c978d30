//! Bounded in-memory store of earlier replies, used by the offline fallback.
//!
//! Entries are keyed on the display language together with a hash of the
//! normalized prompt, so replies survive differences in case and spacing but
//! are never served in a language the caller did not ask for. The prompt is
//! the text the generation stage saw, which already includes any extracted
//! attachment text. Eviction is first-in first-out.

use crate::core::Language;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

/// A reply produced by an earlier successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedReply {
    /// The final response text.
    pub text: String,
    /// The language of `text`.
    pub language: Language,
    /// Recommendations delivered with the reply.
    pub recommendations: Vec<String>,
    /// When the reply was cached (RFC 3339).
    pub cached_at: String,
}

impl CachedReply {
    /// Creates a reply stamped with the current time.
    #[must_use]
    pub fn new(text: impl Into<String>, language: Language, recommendations: Vec<String>) -> Self {
        Self {
            text: text.into(),
            language,
            recommendations,
            cached_at: crate::utils::iso_timestamp(),
        }
    }
}

#[allow(clippy::expect_used)]
fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Lowercases and collapses whitespace.
#[must_use]
pub fn normalize_prompt(text: &str) -> String {
    whitespace()
        .replace_all(text.trim(), " ")
        .to_lowercase()
}

/// Hashes a display language and the normalized form of a prompt into a
/// cache key.
#[must_use]
pub fn cache_key(display: Language, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(display.tag().as_bytes());
    hasher.update([0x1f]);
    hasher.update(normalize_prompt(text).as_bytes());
    let result = hasher.finalize();
    format!("reply:{}", hex::encode(&result[..16]))
}

#[derive(Debug, Default)]
struct Entries {
    replies: HashMap<String, CachedReply>,
    order: VecDeque<String>,
}

/// Bounded reply cache shared by all runs.
#[derive(Debug)]
pub struct ResponseCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl ResponseCache {
    /// Creates a cache holding at most `capacity` replies.
    ///
    /// A capacity of zero disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of cached replies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().replies.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().replies.is_empty()
    }

    /// Stores a reply for a prompt and display language, replacing any
    /// earlier one.
    pub fn store(&self, display: Language, prompt: &str, reply: CachedReply) {
        if self.capacity == 0 || prompt.trim().is_empty() {
            return;
        }

        let key = cache_key(display, prompt);
        let mut entries = self.entries.lock();
        if entries.replies.insert(key.clone(), reply).is_none() {
            entries.order.push_back(key);
        }

        while entries.replies.len() > self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.replies.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Looks up the reply cached for a prompt in a display language.
    #[must_use]
    pub fn lookup(&self, display: Language, prompt: &str) -> Option<CachedReply> {
        self.entries
            .lock()
            .replies
            .get(&cache_key(display, prompt))
            .cloned()
    }

    /// Removes every cached reply.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.replies.clear();
        entries.order.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EN: Language = Language::English;

    fn reply(text: &str) -> CachedReply {
        CachedReply::new(text, EN, Vec::new())
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_prompt("  Explain\n\tPhotosynthesis  "), "explain photosynthesis");
        assert_eq!(
            cache_key(EN, "Explain photosynthesis"),
            cache_key(EN, "explain   PHOTOSYNTHESIS")
        );
        assert!(cache_key(EN, "a").starts_with("reply:"));
    }

    #[test]
    fn test_display_language_is_part_of_the_key() {
        assert_ne!(cache_key(Language::Bemba, "Lesa"), cache_key(Language::Nyanja, "Lesa"));

        let cache = ResponseCache::new(4);
        cache.store(
            Language::Bemba,
            "Lesa",
            CachedReply::new("Lesa alatemwa.", Language::Bemba, Vec::new()),
        );

        assert!(cache.lookup(Language::Bemba, "lesa").is_some());
        assert!(cache.lookup(Language::Nyanja, "Lesa").is_none());
    }

    #[test]
    fn test_store_and_lookup() {
        let cache = ResponseCache::new(4);
        cache.store(EN, "What is rain?", reply("Rain is water."));

        assert_eq!(cache.lookup(EN, "what is  rain?").unwrap().text, "Rain is water.");
        assert!(cache.lookup(EN, "What is snow?").is_none());
    }

    #[test]
    fn test_fifo_eviction() {
        let cache = ResponseCache::new(2);
        cache.store(EN, "one", reply("1"));
        cache.store(EN, "two", reply("2"));
        cache.store(EN, "three", reply("3"));

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(EN, "one").is_none());
        assert!(cache.lookup(EN, "three").is_some());
    }

    #[test]
    fn test_replacing_does_not_grow() {
        let cache = ResponseCache::new(2);
        cache.store(EN, "one", reply("1"));
        cache.store(EN, "ONE", reply("uno"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(EN, "one").unwrap().text, "uno");
    }

    #[test]
    fn test_zero_capacity_and_blank_prompts() {
        let disabled = ResponseCache::new(0);
        disabled.store(EN, "one", reply("1"));
        assert!(disabled.is_empty());

        let cache = ResponseCache::default();
        cache.store(EN, "   ", reply("x"));
        assert!(cache.is_empty());

        cache.store(EN, "one", reply("1"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
