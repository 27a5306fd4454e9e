//! Document store trait.
//!
//! A store holds at most one [`Document`] per [`DocumentKey`]. Writes replace
//! the whole roster, are stamped with time and author, and bump the version
//! by one. The document row is created by the first write.

use async_trait::async_trait;
use rolematch_types::{Document, DocumentKey, Principal, Roster};

use crate::error::{StoreError, StoreResult};
use crate::feed::Subscription;

/// A whole-document write.
#[derive(Clone, Debug)]
pub struct DocumentWrite {
    pub key: DocumentKey,
    pub roster: Roster,
    pub author: Principal,
    /// Version the roster was derived from. `None` skips the check
    /// (last writer wins).
    pub expected_version: Option<u64>,
}

impl DocumentWrite {
    /// The document this write produces on top of `current`, or a conflict.
    ///
    /// Shared by every store so the version rules are identical.
    pub fn apply_to(self, current: Option<&Document>, now: u64) -> StoreResult<Document> {
        let actual = current.map(|d| d.version).unwrap_or(0);
        if let Some(expected) = self.expected_version {
            if expected != actual {
                return Err(StoreError::VersionConflict {
                    key: self.key,
                    expected,
                    actual,
                });
            }
        }
        Ok(Document {
            key: self.key,
            roster: self.roster,
            version: actual + 1,
            updated_at: Some(now),
            updated_by: Some(self.author),
        })
    }
}

/// Storage for shared documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the document stored under `key`, if any.
    async fn fetch(&self, key: &DocumentKey) -> StoreResult<Option<Document>>;

    /// Upsert a whole document. Returns the stored result.
    ///
    /// Accepted writes are published to subscribers of the key, including
    /// the writer's own subscription.
    async fn upsert(&self, write: DocumentWrite) -> StoreResult<Document>;

    /// Subscribe to accepted writes of `key`.
    fn subscribe(&self, key: &DocumentKey) -> Subscription;
}
