//! The stored document: a roster plus version and write provenance.

use serde::{Deserialize, Serialize};

use crate::ids::DocumentKey;
use crate::principal::Principal;
use crate::roster::Roster;

/// One shared record, as held by a document store.
///
/// `version` is 0 for a document that has never been written and increases
/// by exactly one per accepted write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub key: DocumentKey,
    pub roster: Roster,
    pub version: u64,
    /// Unix millis of the last accepted write.
    #[serde(default)]
    pub updated_at: Option<u64>,
    #[serde(default)]
    pub updated_by: Option<Principal>,
}

impl Document {
    /// An unwritten document holding `roster`.
    pub fn unwritten(key: DocumentKey, roster: Roster) -> Self {
        Self {
            key,
            roster,
            version: 0,
            updated_at: None,
            updated_by: None,
        }
    }

    pub fn is_written(&self) -> bool {
        self.version > 0
    }
}
