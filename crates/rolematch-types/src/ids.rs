//! Typed identifiers for principals, sessions, groups, roles, and stakeholders.
//!
//! Runtime-created IDs wrap UUIDv7 (time-ordered, globally unique). IDs that
//! must agree across clients without coordination (built-in defaults,
//! principals derived from an email address) are UUIDv5 under fixed
//! namespaces. The `short()` form (first 8 hex chars) is for human-facing
//! output only, never used as a lookup key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A principal identifier (UUIDv5 of the lower-cased email, or UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(uuid::Uuid);

/// A sign-in session identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

/// A group ("trio") identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(uuid::Uuid);

/// A role identifier, shared by role slots and extra roles.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(uuid::Uuid);

/// A stakeholder identifier. Assignments reference stakeholders by this ID.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StakeholderId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal, $ns:expr) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Deterministic ID derived from a stable string key (UUIDv5).
            pub fn from_key(key: &str) -> Self {
                Self(uuid::Uuid::new_v5(&$ns, key.as_bytes()))
            }

            /// First 8 hex characters, for human display only.
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Full 32-character hex string (no hyphens).
            pub fn to_hex(&self) -> String {
                self.0.as_simple().to_string()
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// Check if a query string matches this ID by hex prefix.
            pub fn matches_hex_prefix(&self, prefix: &str) -> bool {
                !prefix.is_empty() && self.to_hex().starts_with(&prefix.to_ascii_lowercase())
            }

            /// The nil ID, used as a sentinel.
            pub fn nil() -> Self {
                Self(uuid::Uuid::nil())
            }

            /// Check if this is the nil ID.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$T> for uuid::Uuid {
            fn from(id: $T) -> uuid::Uuid {
                id.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

const PRINCIPAL_NS: uuid::Uuid = uuid::uuid!("3f6c2a9e-81d4-4b7a-9c05-d2e8a1f47b36");
const SESSION_NS: uuid::Uuid = uuid::uuid!("b1d7e402-5c3f-4a88-8e21-6f90c3a5d718");
const GROUP_NS: uuid::Uuid = uuid::uuid!("6a0f93c1-2e7b-4d56-a8f4-0b3c9e12d5a4");
const ROLE_NS: uuid::Uuid = uuid::uuid!("d48e1b27-9a6c-4f03-b5d2-7c1e8f60a943");
const STAKEHOLDER_NS: uuid::Uuid = uuid::uuid!("5e92c0d8-47a1-4b3e-91f6-a8d2c7b05e61");

impl_typed_id!(PrincipalId, "PrincipalId", PRINCIPAL_NS);
impl_typed_id!(SessionId, "SessionId", SESSION_NS);
impl_typed_id!(GroupId, "GroupId", GROUP_NS);
impl_typed_id!(RoleId, "RoleId", ROLE_NS);
impl_typed_id!(StakeholderId, "StakeholderId", STAKEHOLDER_NS);

impl PrincipalId {
    /// Stable principal for an email address.
    ///
    /// Case-insensitive: `Amy@Example.org` and `amy@example.org` are the same
    /// principal.
    pub fn for_email(email: &str) -> Self {
        Self::from_key(&email.trim().to_lowercase())
    }
}

// ── Document key ────────────────────────────────────────────────────────────

/// Key of the one shared document row.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The well-known key used when none is configured.
    pub fn main() -> Self {
        Self("main".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentKey {
    fn default() -> Self {
        Self::main()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentKey({})", self.0)
    }
}

// ── Label resolution ────────────────────────────────────────────────────────

/// Error from label or prefix resolution.
#[derive(Debug, thiserror::Error)]
pub enum PrefixError {
    #[error("no match for '{0}'")]
    NoMatch(String),
    #[error("ambiguous '{prefix}': matches {candidates:?}")]
    Ambiguous {
        prefix: String,
        candidates: Vec<String>,
    },
}

/// Resolve a user-typed query against labelled IDs.
///
/// Resolution order (labels compared case-insensitively):
/// 1. Exact label match
/// 2. Unique label prefix match
/// 3. Unique hex prefix match
/// 4. Error (no match or ambiguous)
pub fn resolve_label<'a, T>(
    entries: impl IntoIterator<Item = (T, &'a str)>,
    query: &str,
    hex_of: impl Fn(&T) -> String,
) -> Result<T, PrefixError>
where
    T: Copy,
{
    let entries: Vec<(T, &str)> = entries.into_iter().collect();
    let needle = query.trim().to_lowercase();

    if needle.is_empty() {
        return Err(PrefixError::NoMatch(query.to_string()));
    }

    if let Some(&(id, _)) = entries.iter().find(|(_, l)| l.to_lowercase() == needle) {
        return Ok(id);
    }

    let label_matches: Vec<(T, &str)> = entries
        .iter()
        .filter(|(_, l)| l.to_lowercase().starts_with(&needle))
        .copied()
        .collect();

    if label_matches.len() == 1 {
        return Ok(label_matches[0].0);
    }
    if label_matches.len() > 1 {
        return Err(PrefixError::Ambiguous {
            prefix: query.to_string(),
            candidates: label_matches.iter().map(|(_, l)| l.to_string()).collect(),
        });
    }

    let hex_matches: Vec<T> = entries
        .iter()
        .filter(|(id, _)| hex_of(id).starts_with(&needle))
        .map(|(id, _)| *id)
        .collect();

    match hex_matches.len() {
        0 => Err(PrefixError::NoMatch(query.to_string())),
        1 => Ok(hex_matches[0]),
        _ => Err(PrefixError::Ambiguous {
            prefix: query.to_string(),
            candidates: hex_matches.iter().map(|id| hex_of(id)[..8].to_string()).collect(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unique() {
        assert_ne!(GroupId::new(), GroupId::new());
        assert_ne!(StakeholderId::new(), StakeholderId::new());
    }

    #[test]
    fn test_from_key_is_deterministic() {
        assert_eq!(GroupId::from_key("trio-1"), GroupId::from_key("trio-1"));
        assert_ne!(GroupId::from_key("trio-1"), GroupId::from_key("trio-2"));
    }

    #[test]
    fn test_namespaces_are_distinct() {
        let g: uuid::Uuid = GroupId::from_key("x").into();
        let r: uuid::Uuid = RoleId::from_key("x").into();
        assert_ne!(g, r);
    }

    #[test]
    fn test_principal_for_email_ignores_case_and_whitespace() {
        assert_eq!(
            PrincipalId::for_email("Amy@Example.org "),
            PrincipalId::for_email("amy@example.org")
        );
        assert_ne!(
            PrincipalId::for_email("amy@example.org"),
            PrincipalId::for_email("bob@example.org")
        );
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = RoleId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let parsed: RoleId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_debug_shows_type_and_short() {
        let id = StakeholderId::new();
        let dbg = format!("{:?}", id);
        assert!(dbg.starts_with("StakeholderId("));
        assert!(dbg.contains(&id.short()));
    }

    #[test]
    fn test_hex_prefix_is_case_insensitive() {
        let id = GroupId::new();
        let prefix = id.short().to_uppercase();
        assert!(id.matches_hex_prefix(&prefix));
        assert!(!id.matches_hex_prefix(""));
    }

    #[test]
    fn test_document_key_default_is_main() {
        assert_eq!(DocumentKey::default().as_str(), "main");
        assert_eq!(DocumentKey::new("other").to_string(), "other");
    }

    // ── Label resolution ────────────────────────────────────────────────

    fn labelled() -> Vec<(GroupId, &'static str)> {
        vec![
            (GroupId::from_key("a"), "GME Trio"),
            (GroupId::from_key("b"), "CPD Trio"),
            (GroupId::from_key("c"), "Cross-Cutting Trio"),
        ]
    }

    #[test]
    fn test_resolve_exact_label_case_insensitive() {
        let got = resolve_label(labelled(), "gme trio", |id| id.to_hex()).unwrap();
        assert_eq!(got, GroupId::from_key("a"));
    }

    #[test]
    fn test_resolve_unique_label_prefix() {
        let got = resolve_label(labelled(), "cro", |id| id.to_hex()).unwrap();
        assert_eq!(got, GroupId::from_key("c"));
    }

    #[test]
    fn test_resolve_ambiguous_label_prefix() {
        let err = resolve_label(labelled(), "c", |id| id.to_hex()).unwrap_err();
        assert!(matches!(err, PrefixError::Ambiguous { .. }));
    }

    #[test]
    fn test_resolve_hex_prefix() {
        let target = GroupId::from_key("b");
        let got = resolve_label(labelled(), &target.to_hex()[..12], |id| id.to_hex()).unwrap();
        assert_eq!(got, target);
    }

    #[test]
    fn test_resolve_no_match() {
        let err = resolve_label(labelled(), "zzz", |id| id.to_hex()).unwrap_err();
        assert!(matches!(err, PrefixError::NoMatch(_)));
    }
}
