//! In-memory document store.
//!
//! Used by tests and as a scratch backend. Can be switched offline to
//! exercise error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rolematch_types::{Document, DocumentKey, now_millis};

use crate::error::{StoreError, StoreResult};
use crate::feed::{ChangeEvent, ChangeFeed, Subscription};
use crate::store::{DocumentStore, DocumentWrite};

/// Document store held in a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<DocumentKey, Document>>,
    feed: ChangeFeed,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, every fetch and upsert fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of upserts attempted, including rejected ones.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        self.check_online()?;
        Ok(self.docs.lock().get(key).cloned())
    }

    async fn upsert(&self, write: DocumentWrite) -> StoreResult<Document> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let stored = {
            let mut docs = self.docs.lock();
            let key = write.key.clone();
            let next = write.apply_to(docs.get(&key), now_millis())?;
            docs.insert(key, next.clone());
            next
        };

        tracing::debug!(key = %stored.key, version = stored.version, "memory store accepted write");
        self.feed.publish(ChangeEvent::new(stored.clone()));
        Ok(stored)
    }

    fn subscribe(&self, key: &DocumentKey) -> Subscription {
        self.feed.subscribe(key)
    }
}
