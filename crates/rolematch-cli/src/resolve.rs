//! Turn user-typed names into ids.
//!
//! Everything resolves through [`resolve_label`]: exact name, then unique
//! name prefix, then unique id-hex prefix, all case-insensitive.

use anyhow::{Context, Result};
use rolematch_types::{Group, GroupId, RoleId, RoleType, Roster, StakeholderId, resolve_label};

pub fn group(roster: &Roster, query: &str) -> Result<GroupId> {
    resolve_label(
        roster.groups.iter().map(|g| (g.id, g.name.as_str())),
        query,
        GroupId::to_hex,
    )
    .context("resolving trio")
}

/// A role type ("educator", "tech") picks that slot; otherwise the title.
pub fn role(group: &Group, query: &str) -> Result<RoleId> {
    if let Ok(role_type) = query.trim().parse::<RoleType>() {
        if let Some(slot) = group.role_of_type(role_type) {
            return Ok(slot.id);
        }
    }
    resolve_label(
        group.roles.iter().map(|r| (r.id, r.title.as_str())),
        query,
        RoleId::to_hex,
    )
    .with_context(|| format!("resolving role in {}", group.name))
}

pub fn extra_role(roster: &Roster, query: &str) -> Result<RoleId> {
    resolve_label(
        roster.extra_roles.iter().map(|r| (r.id, r.title.as_str())),
        query,
        RoleId::to_hex,
    )
    .context("resolving additional role")
}

pub fn person(roster: &Roster, query: &str) -> Result<StakeholderId> {
    resolve_label(
        roster.stakeholders.iter().map(|s| (s.id, s.name.as_str())),
        query,
        StakeholderId::to_hex,
    )
    .context("resolving stakeholder")
}
