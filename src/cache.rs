//! TTL result cache for summaries and answers.
//!
//! Two independent instances live in the engine: one keyed by a SHA-256
//! fingerprint of the document text ([`summary_key`]), one keyed by
//! document id and normalized question ([`answer_key`]). Entries expire
//! lazily on read; [`ResultCache::purge_expired`] sweeps the rest.
//!
//! Only successful generations are ever written, so a transient upstream
//! failure is retried on the next request instead of being replayed for a
//! week.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// One cached value with its insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        // A clock that went backwards counts as age zero.
        let age = (now - self.created_at).to_std().unwrap_or_default();
        age < ttl
    }
}

/// Thread-safe string cache with a fixed time-to-live.
pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a cached value. Returns None on miss or expired entry.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Utc::now())
    }

    /// [`get`](Self::get) against an explicit clock.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => Some(entry.value.clone()),
            Some(_) => {
                debug!("Cache entry expired: {}", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or overwrite a value.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.put_at(key, value, Utc::now());
    }

    /// [`put`](Self::put) with an explicit insertion time.
    pub fn put_at(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        created_at: DateTime<Utc>,
    ) {
        let key = key.into();
        let entry = CacheEntry {
            key: key.clone(),
            value: value.into(),
            created_at,
        };
        self.entries.lock().insert(key, entry);
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh(now, self.ttl));
        before - entries.len()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hex SHA-256 of the first `max_chars` characters of `text`.
///
/// Documents that agree on that prefix share a key.
pub fn summary_key(text: &str, max_chars: usize) -> String {
    content_key(crate::pipeline::select::truncate_chars(text, max_chars))
}

/// Hex SHA-256 of all of `text`.
pub fn content_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// `"{document_id}::{question}"` with the question lowercased and its
/// whitespace collapsed.
pub fn answer_key(document_id: &str, question: &str) -> String {
    let question = question
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    format!("{document_id}::{question}")
}
