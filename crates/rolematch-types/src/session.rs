//! Session metadata types.
//!
//! A `Session` records that a principal redeemed a login link. It is a birth
//! certificate: immutable once created, discarded on sign-out.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::principal::Principal;

/// A signed-in session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUIDv7, time-ordered).
    pub id: SessionId,
    /// Who signed in.
    pub principal: Principal,
    /// When this session was created (Unix millis).
    pub created_at: u64,
}

impl Session {
    /// Create a new session record for a principal.
    pub fn new(principal: Principal) -> Self {
        Self {
            id: SessionId::new(),
            principal,
            created_at: crate::now_millis(),
        }
    }

    /// Display string: short hex ID.
    pub fn display_name(&self) -> String {
        self.id.short()
    }
}
