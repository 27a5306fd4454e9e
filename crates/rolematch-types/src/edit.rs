//! Roster edits.
//!
//! All mutations to a [`Roster`] are expressed as [`Edit`] values. Applying an
//! edit never touches the input roster: [`Edit::apply`] returns a new roster
//! (or an error, in which case the caller keeps the old one). Edits are
//! serializable so they can be logged and replayed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{GroupId, RoleId, StakeholderId};
use crate::roster::{ColorTag, Group, Roster};
use crate::stakeholders::{BulkAddReport, PoolError};

/// A single structured change to the roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    RenameGroup { group: GroupId, name: String },
    /// An empty subtitle clears it.
    SetGroupSubtitle { group: GroupId, subtitle: String },
    SetGroupColor { group: GroupId, color: ColorTag },
    RenameRole { group: GroupId, role: RoleId, title: String },
    /// `None` clears the assignment.
    AssignRole {
        group: GroupId,
        role: RoleId,
        stakeholder: Option<StakeholderId>,
    },
    AssignExtraRole {
        role: RoleId,
        stakeholder: Option<StakeholderId>,
    },
    /// Append a templated group; colour picked from the palette by position.
    AddGroup,
    DeleteGroup { group: GroupId },
    AddStakeholder { name: String },
    /// Also clears every assignment that referenced the stakeholder.
    RemoveStakeholder { stakeholder: StakeholderId },
    /// Newline- or comma-separated names.
    BulkAddStakeholders { text: String },
}

/// Errors from applying an edit. The roster is unchanged when one occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("group not found: {0:?}")]
    UnknownGroup(GroupId),

    #[error("role {role:?} not found in group {group:?}")]
    UnknownRole { group: GroupId, role: RoleId },

    #[error("extra role not found: {0:?}")]
    UnknownExtraRole(RoleId),

    #[error("cannot assign {0:?}: not in the stakeholder pool")]
    UnknownStakeholder(StakeholderId),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// What an applied edit produced besides the new roster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EditOutcome {
    #[default]
    Done,
    GroupAdded(GroupId),
    StakeholderAdded(StakeholderId),
    /// Assignments cleared by a stakeholder removal.
    StakeholderRemoved { cleared: usize },
    BulkAdded(BulkAddReport),
}

/// Result of a successful [`Edit::apply`].
#[derive(Clone, Debug)]
pub struct Applied {
    pub roster: Roster,
    pub outcome: EditOutcome,
}

impl Applied {
    fn done(roster: Roster) -> Self {
        Self {
            roster,
            outcome: EditOutcome::Done,
        }
    }
}

impl Edit {
    /// Short operation name for logs and spans.
    pub fn name(&self) -> &'static str {
        match self {
            Edit::RenameGroup { .. } => "rename_group",
            Edit::SetGroupSubtitle { .. } => "set_group_subtitle",
            Edit::SetGroupColor { .. } => "set_group_color",
            Edit::RenameRole { .. } => "rename_role",
            Edit::AssignRole { .. } => "assign_role",
            Edit::AssignExtraRole { .. } => "assign_extra_role",
            Edit::AddGroup => "add_group",
            Edit::DeleteGroup { .. } => "delete_group",
            Edit::AddStakeholder { .. } => "add_stakeholder",
            Edit::RemoveStakeholder { .. } => "remove_stakeholder",
            Edit::BulkAddStakeholders { .. } => "bulk_add_stakeholders",
        }
    }

    /// Apply to `roster`, producing a new roster.
    pub fn apply(&self, roster: &Roster) -> Result<Applied, EditError> {
        match self {
            Edit::RenameGroup { group, name } => {
                map_group(roster, *group, |g| g.name = name.clone()).map(Applied::done)
            }
            Edit::SetGroupSubtitle { group, subtitle } => {
                let subtitle = Some(subtitle.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                map_group(roster, *group, |g| g.subtitle = subtitle.clone()).map(Applied::done)
            }
            Edit::SetGroupColor { group, color } => {
                map_group(roster, *group, |g| g.color = *color).map(Applied::done)
            }
            Edit::RenameRole { group, role, title } => {
                map_role(roster, *group, *role, |r| r.title = title.clone()).map(Applied::done)
            }
            Edit::AssignRole {
                group,
                role,
                stakeholder,
            } => {
                check_assignable(roster, *stakeholder)?;
                map_role(roster, *group, *role, |r| r.assignee = *stakeholder).map(Applied::done)
            }
            Edit::AssignExtraRole { role, stakeholder } => {
                check_assignable(roster, *stakeholder)?;
                if roster.extra_role(*role).is_none() {
                    return Err(EditError::UnknownExtraRole(*role));
                }
                let mut next = roster.clone();
                for r in next.extra_roles.iter_mut().filter(|r| r.id == *role) {
                    r.assignee = *stakeholder;
                }
                Ok(Applied::done(next))
            }
            Edit::AddGroup => {
                let group = Group::templated(ColorTag::nth(roster.groups.len()));
                let id = group.id;
                let mut next = roster.clone();
                next.groups.push(group);
                Ok(Applied {
                    roster: next,
                    outcome: EditOutcome::GroupAdded(id),
                })
            }
            Edit::DeleteGroup { group } => {
                if roster.group(*group).is_none() {
                    return Err(EditError::UnknownGroup(*group));
                }
                let mut next = roster.clone();
                next.groups.retain(|g| g.id != *group);
                Ok(Applied::done(next))
            }
            Edit::AddStakeholder { name } => {
                let (pool, id) = roster.stakeholders.with_added(name)?;
                let mut next = roster.clone();
                next.stakeholders = pool;
                Ok(Applied {
                    roster: next,
                    outcome: EditOutcome::StakeholderAdded(id),
                })
            }
            Edit::RemoveStakeholder { stakeholder } => {
                let pool = roster.stakeholders.with_removed(*stakeholder)?;
                let cleared = roster.assignments_of(*stakeholder).len();
                let mut next = roster.clone();
                next.stakeholders = pool;
                Ok(Applied {
                    roster: next.prune_dangling(),
                    outcome: EditOutcome::StakeholderRemoved { cleared },
                })
            }
            Edit::BulkAddStakeholders { text } => {
                let (pool, report) = roster.stakeholders.with_bulk(text);
                let mut next = roster.clone();
                next.stakeholders = pool;
                Ok(Applied {
                    roster: next,
                    outcome: EditOutcome::BulkAdded(report),
                })
            }
        }
    }
}

fn check_assignable(roster: &Roster, stakeholder: Option<StakeholderId>) -> Result<(), EditError> {
    match stakeholder {
        Some(id) if !roster.stakeholders.contains(id) => Err(EditError::UnknownStakeholder(id)),
        _ => Ok(()),
    }
}

fn map_group(
    roster: &Roster,
    group: GroupId,
    f: impl Fn(&mut Group),
) -> Result<Roster, EditError> {
    if roster.group(group).is_none() {
        return Err(EditError::UnknownGroup(group));
    }
    let mut next = roster.clone();
    next.groups.iter_mut().filter(|g| g.id == group).for_each(f);
    Ok(next)
}

fn map_role(
    roster: &Roster,
    group: GroupId,
    role: RoleId,
    f: impl Fn(&mut crate::roster::RoleSlot),
) -> Result<Roster, EditError> {
    let found = roster
        .group(group)
        .ok_or(EditError::UnknownGroup(group))?
        .role(role)
        .is_some();
    if !found {
        return Err(EditError::UnknownRole { group, role });
    }
    let mut next = roster.clone();
    next.groups
        .iter_mut()
        .filter(|g| g.id == group)
        .flat_map(|g| g.roles.iter_mut())
        .filter(|r| r.id == role)
        .for_each(f);
    Ok(next)
}

// ============================================================================
// Tests
// ============================================================================
