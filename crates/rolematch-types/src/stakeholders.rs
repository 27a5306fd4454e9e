//! The stakeholder pool: candidate names available for assignment.
//!
//! Names are unique under case-insensitive comparison and the pool is always
//! kept in case-insensitive lexicographic order. Both invariants also hold
//! for pools read back from storage: deserialization goes through
//! [`StakeholderPool::from`], which sorts and drops case-duplicates.
//!
//! Every operation is a pure transformation returning a new pool.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::StakeholderId;

/// A candidate person who can be assigned to roles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: StakeholderId,
    pub name: String,
}

/// Errors from pool operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("stakeholder name is empty")]
    EmptyName,

    /// The name matches an existing member case-insensitively.
    #[error("\"{name}\" is already in the stakeholder pool")]
    Duplicate { name: String, existing: StakeholderId },

    #[error("stakeholder not found: {0:?}")]
    Unknown(StakeholderId),
}

/// Outcome of a bulk add.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkAddReport {
    /// IDs of the names that were added, in input order.
    pub added: Vec<StakeholderId>,
    /// Entries dropped because they matched an existing name or an earlier
    /// entry of the same batch.
    pub duplicates: usize,
}

/// Case-insensitively unique, case-insensitively sorted set of stakeholders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Stakeholder>", into = "Vec<Stakeholder>")]
pub struct StakeholderPool {
    members: Vec<Stakeholder>,
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

fn pool_order(a: &Stakeholder, b: &Stakeholder) -> Ordering {
    fold(&a.name)
        .cmp(&fold(&b.name))
        .then_with(|| a.name.cmp(&b.name))
}

impl StakeholderPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Stakeholder> {
        self.members.iter()
    }

    /// Names in display order.
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn get(&self, id: StakeholderId) -> Option<&Stakeholder> {
        self.members.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: StakeholderId) -> bool {
        self.get(id).is_some()
    }

    /// Name for an ID, if the stakeholder is still in the pool.
    pub fn name_of(&self, id: StakeholderId) -> Option<&str> {
        self.get(id).map(|s| s.name.as_str())
    }

    /// Case-insensitive lookup by name (surrounding whitespace ignored).
    pub fn find(&self, name: &str) -> Option<&Stakeholder> {
        let needle = fold(name.trim());
        self.members.iter().find(|s| fold(&s.name) == needle)
    }

    /// Substring search used by assignment pickers.
    pub fn search(&self, query: &str) -> Vec<&Stakeholder> {
        let needle = fold(query.trim());
        self.members
            .iter()
            .filter(|s| fold(&s.name).contains(&needle))
            .collect()
    }

    /// Return a new pool with `name` added.
    ///
    /// The name is trimmed. Fails with [`PoolError::Duplicate`] if it matches
    /// an existing member case-insensitively; the pool is untouched.
    pub fn with_added(&self, name: &str) -> Result<(Self, StakeholderId), PoolError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PoolError::EmptyName);
        }
        if let Some(existing) = self.find(name) {
            return Err(PoolError::Duplicate {
                name: name.to_string(),
                existing: existing.id,
            });
        }

        let id = StakeholderId::new();
        let mut members = self.members.clone();
        members.push(Stakeholder {
            id,
            name: name.to_string(),
        });
        members.sort_by(pool_order);
        Ok((Self { members }, id))
    }

    /// Return a new pool without the given stakeholder.
    pub fn with_removed(&self, id: StakeholderId) -> Result<Self, PoolError> {
        if !self.contains(id) {
            return Err(PoolError::Unknown(id));
        }
        let members = self
            .members
            .iter()
            .filter(|s| s.id != id)
            .cloned()
            .collect();
        Ok(Self { members })
    }

    /// Return a new pool with every name from newline/comma separated text.
    ///
    /// Entries are trimmed and empties dropped. An entry matching an existing
    /// member or an earlier entry in the same batch (case-insensitively) is
    /// skipped and counted in [`BulkAddReport::duplicates`].
    pub fn with_bulk(&self, text: &str) -> (Self, BulkAddReport) {
        let mut members = self.members.clone();
        let mut seen: Vec<String> = members.iter().map(|s| fold(&s.name)).collect();
        let mut report = BulkAddReport::default();

        for entry in text.split(['\n', ',']).map(str::trim).filter(|e| !e.is_empty()) {
            let key = fold(entry);
            if seen.contains(&key) {
                report.duplicates += 1;
                continue;
            }
            let id = StakeholderId::new();
            members.push(Stakeholder {
                id,
                name: entry.to_string(),
            });
            seen.push(key);
            report.added.push(id);
        }

        members.sort_by(pool_order);
        (Self { members }, report)
    }
}

impl From<Vec<Stakeholder>> for StakeholderPool {
    fn from(mut members: Vec<Stakeholder>) -> Self {
        members.retain(|s| !s.name.trim().is_empty());
        members.sort_by(pool_order);
        members.dedup_by(|b, a| fold(&a.name) == fold(&b.name));
        Self { members }
    }
}

impl From<StakeholderPool> for Vec<Stakeholder> {
    fn from(pool: StakeholderPool) -> Self {
        pool.members
    }
}

// ============================================================================
// Tests
// ============================================================================
