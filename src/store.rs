//! In-memory registry of ingested documents.
//!
//! Documents are immutable once registered and handed out as
//! `Arc<Document>`, so a Q&A request keeps reading a consistent snapshot
//! even if the store evicts the entry mid-request. The store is bounded:
//! past `capacity` documents the least recently used one is dropped.

use crate::pipeline::chunk::Chunk;
use crate::pipeline::summary::word_count;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// A normalized, chunked document ready for question answering.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub page_count: usize,
    pub word_count: usize,
    pub chunks: Vec<Chunk>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Build a document with a fresh random id.
    pub fn new(text: String, page_count: usize, chunks: Vec<Chunk>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            word_count: word_count(&text),
            text,
            page_count,
            chunks,
            created_at: Utc::now(),
        }
    }
}

/// Bounded LRU map from document id to [`Document`].
pub struct DocumentStore {
    documents: Mutex<LruCache<String, Arc<Document>>>,
}

impl DocumentStore {
    /// A store holding at most `capacity` documents (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            documents: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Store `document` and return the shared handle.
    pub fn register(&self, document: Document) -> Arc<Document> {
        let document = Arc::new(document);
        let evicted = self
            .documents
            .lock()
            .push(document.id.clone(), Arc::clone(&document));
        if let Some((id, _)) = evicted.filter(|(id, _)| *id != document.id) {
            debug!("Document store full, evicted {}", id);
        }
        document
    }

    /// Look up a document, marking it as recently used.
    pub fn get(&self, id: &str) -> Option<Arc<Document>> {
        self.documents.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
