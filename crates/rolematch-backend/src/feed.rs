//! Change feed: broadcast of accepted document writes.
//!
//! Every store publishes each accepted write to its [`ChangeFeed`]. Editors
//! subscribe per document key; events for other keys are skipped inside
//! [`Subscription::recv`].
//!
//! # Example
//!
//! ```ignore
//! let feed = ChangeFeed::new(64);
//! let mut sub = feed.subscribe(&DocumentKey::main());
//!
//! feed.publish(ChangeEvent::new(stored_document));
//!
//! while let Some(event) = sub.recv().await {
//!     println!("v{} by {:?}", event.version(), event.author());
//! }
//! ```

use std::time::Instant;

use rolematch_types::{Document, DocumentKey, PrincipalId};
use tokio::sync::broadcast;

/// Default channel capacity for store feeds.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// A document write as seen by subscribers.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    /// The document as stored after the write.
    pub document: Document,
    /// When the event was published (local clock).
    pub published_at: Instant,
}

impl ChangeEvent {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            published_at: Instant::now(),
        }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.document.key
    }

    pub fn version(&self) -> u64 {
        self.document.version
    }

    /// Principal that made the write, if recorded.
    pub fn author(&self) -> Option<PrincipalId> {
        self.document.updated_by.as_ref().map(|p| p.id)
    }
}

/// Broadcast channel of [`ChangeEvent`]s.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
    capacity: usize,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event. Returns the number of receivers it reached.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to writes of one document key.
    pub fn subscribe(&self, key: &DocumentKey) -> Subscription {
        Subscription {
            key: key.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

/// Key-filtered receiver. Dropping it unsubscribes.
pub struct Subscription {
    key: DocumentKey,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Next event for this key. `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.key() == &self.key => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Later events carry the whole document, so skipping is safe.
                    tracing::warn!(key = %self.key, lagged = n, "change subscription lagged behind");
                }
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.key() == &self.key => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(key = %self.key, lagged = n, "change subscription lagged behind");
                }
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
