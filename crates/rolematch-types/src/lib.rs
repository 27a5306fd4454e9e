//! Shared identity and roster types for rolematch.
//!
//! This crate is the relational foundation: typed IDs, principals, sessions,
//! the roster model, and the pure edits over it. It has **no internal
//! rolematch dependencies** and does no I/O.
//!
//! # Entity-Relationship Overview
//!
//! ```text
//! Document (DocumentKey) ← the one shared record
//!     └── version, updated_at, updated_by (Principal)
//!     └── Roster
//!         └── Group (GroupId) ← a "trio"
//!             └── RoleSlot (RoleId) → assignee: StakeholderId?
//!         └── ExtraRole (RoleId) → assignee: StakeholderId?
//!         └── StakeholderPool
//!             └── Stakeholder (StakeholderId)
//!
//! Principal (PrincipalId) ← signed-in person, keyed by email
//!     └── opens Session (SessionId)
//!     └── stamps Document writes
//! ```
//!
//! # Key Types
//!
//! |-----------------------|------------------------------------------------|
//! | Type                  | Purpose                                        |
//! |-----------------------|------------------------------------------------|
//! | [`Document`]          | Stored record (roster + version + provenance)  |
//! | [`Roster`]            | Groups, extra roles, stakeholder pool          |
//! | [`Edit`]              | One structured change to a roster              |
//! | [`StakeholderPool`]   | Sorted, case-insensitively unique names        |
//! | [`Principal`]         | Signed-in identity (id + email)                |
//! | [`Session`]           | Session birth certificate                      |
//! |-----------------------|------------------------------------------------|

pub mod ids;
pub mod principal;
pub mod session;
pub mod stakeholders;
pub mod roster;
pub mod edit;
pub mod defaults;
pub mod document;

// Re-export primary types at crate root for convenience.
pub use ids::{DocumentKey, GroupId, PrincipalId, RoleId, SessionId, StakeholderId};
pub use ids::{PrefixError, resolve_label};
pub use principal::Principal;
pub use session::Session;
pub use stakeholders::{BulkAddReport, PoolError, Stakeholder, StakeholderPool};
pub use roster::{ColorTag, ExtraRole, Group, Progress, RoleSlot, RoleType, Roster};
pub use edit::{Applied, Edit, EditError, EditOutcome};
pub use defaults::default_roster;
pub use document::Document;

/// Current time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
