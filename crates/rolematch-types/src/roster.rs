//! Roster model: groups of role slots, extra roles, and the stakeholder pool.
//!
//! Assignees are references into the [`StakeholderPool`], never free text, so
//! an assignment cannot point at a name that has been removed. The roster is
//! treated as an immutable value: edits (see [`crate::edit`]) produce a new
//! roster rather than mutating in place.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString};

use crate::ids::{GroupId, RoleId, StakeholderId};
use crate::stakeholders::StakeholderPool;

/// Semantic type of a role slot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum RoleType {
    Educator,
    Learner,
    #[serde(rename = "Tech SME")]
    #[strum(to_string = "Tech SME", serialize = "tech", serialize = "tech-sme")]
    TechSme,
}

/// Colour tag of a group. Declaration order is the palette order used when
/// new groups are added.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ColorTag {
    Blue,
    Green,
    Purple,
    Amber,
    Rose,
    Teal,
    Slate,
    Indigo,
    Pink,
    Cyan,
}

impl ColorTag {
    pub const PALETTE: [ColorTag; ColorTag::COUNT] = [
        ColorTag::Blue,
        ColorTag::Green,
        ColorTag::Purple,
        ColorTag::Amber,
        ColorTag::Rose,
        ColorTag::Teal,
        ColorTag::Slate,
        ColorTag::Indigo,
        ColorTag::Pink,
        ColorTag::Cyan,
    ];

    /// Palette colour for the `n`th group, cycling.
    pub fn nth(n: usize) -> Self {
        Self::PALETTE[n % Self::PALETTE.len()]
    }
}

/// One assignable position within a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSlot {
    pub id: RoleId,
    pub title: String,
    #[serde(rename = "type")]
    pub role_type: RoleType,
    #[serde(default)]
    pub assignee: Option<StakeholderId>,
}

/// A named cluster of role slots ("trio").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub color: ColorTag,
    pub roles: Vec<RoleSlot>,
}

impl Group {
    /// A fresh group with the three templated slots.
    pub fn templated(color: ColorTag) -> Self {
        let id = GroupId::new();
        let slot = |role_type: RoleType, title: &str| RoleSlot {
            id: RoleId::new(),
            title: title.to_string(),
            role_type,
            assignee: None,
        };
        Self {
            id,
            name: "New Trio".to_string(),
            subtitle: None,
            color,
            roles: vec![
                slot(RoleType::Educator, "Educator Role"),
                slot(RoleType::Learner, "Learner Role"),
                slot(RoleType::TechSme, "Tech SME Role"),
            ],
        }
    }

    pub fn role(&self, id: RoleId) -> Option<&RoleSlot> {
        self.roles.iter().find(|r| r.id == id)
    }

    /// First slot of the given type.
    pub fn role_of_type(&self, role_type: RoleType) -> Option<&RoleSlot> {
        self.roles.iter().find(|r| r.role_type == role_type)
    }
}

/// A standalone assignable position outside any group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraRole {
    pub id: RoleId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee: Option<StakeholderId>,
}

/// Assignment progress over every role slot and extra role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub filled: usize,
    pub total: usize,
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.filled, self.total)
    }
}

/// The editable content of the shared document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub extra_roles: Vec<ExtraRole>,
    #[serde(default)]
    pub stakeholders: StakeholderPool,
}

impl Roster {
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn extra_role(&self, id: RoleId) -> Option<&ExtraRole> {
        self.extra_roles.iter().find(|r| r.id == id)
    }

    /// Display name of an assignee, if set and still in the pool.
    pub fn assignee_name(&self, assignee: Option<StakeholderId>) -> Option<&str> {
        assignee.and_then(|id| self.stakeholders.name_of(id))
    }

    pub fn progress(&self) -> Progress {
        let slots = self.groups.iter().flat_map(|g| g.roles.iter().map(|r| r.assignee));
        let extras = self.extra_roles.iter().map(|r| r.assignee);
        slots.chain(extras).fold(Progress::default(), |mut p, assignee| {
            p.total += 1;
            if assignee.is_some() {
                p.filled += 1;
            }
            p
        })
    }

    /// Every role slot and extra role assigned to a stakeholder.
    pub fn assignments_of(&self, stakeholder: StakeholderId) -> Vec<RoleId> {
        let slots = self
            .groups
            .iter()
            .flat_map(|g| g.roles.iter().map(|r| (r.id, r.assignee)));
        let extras = self.extra_roles.iter().map(|r| (r.id, r.assignee));
        slots
            .chain(extras)
            .filter(|(_, a)| *a == Some(stakeholder))
            .map(|(id, _)| id)
            .collect()
    }

    /// Drop assignments whose stakeholder is no longer in the pool.
    ///
    /// Used when adopting a roster from storage written by an older client.
    pub fn prune_dangling(mut self) -> Self {
        let pool = self.stakeholders.clone();
        let keep = |a: &mut Option<StakeholderId>| {
            if a.is_some_and(|id| !pool.contains(id)) {
                *a = None;
            }
        };
        for group in &mut self.groups {
            for role in &mut group.roles {
                keep(&mut role.assignee);
            }
        }
        for role in &mut self.extra_roles {
            keep(&mut role.assignee);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_type_display_and_parse() {
        assert_eq!(RoleType::TechSme.to_string(), "Tech SME");
        assert_eq!("tech".parse::<RoleType>().unwrap(), RoleType::TechSme);
        assert_eq!("educator".parse::<RoleType>().unwrap(), RoleType::Educator);
        assert!("wizard".parse::<RoleType>().is_err());
    }

    #[test]
    fn test_role_type_serde_matches_legacy_labels() {
        assert_eq!(serde_json::to_string(&RoleType::TechSme).unwrap(), "\"Tech SME\"");
        let parsed: RoleType = serde_json::from_str("\"Learner\"").unwrap();
        assert_eq!(parsed, RoleType::Learner);
    }

    #[test]
    fn test_color_palette_cycles() {
        assert_eq!(ColorTag::nth(0), ColorTag::Blue);
        assert_eq!(ColorTag::nth(6), ColorTag::Slate);
        assert_eq!(ColorTag::nth(10), ColorTag::Blue);
        assert_eq!("TEAL".parse::<ColorTag>().unwrap(), ColorTag::Teal);
        assert_eq!(ColorTag::Amber.to_string(), "amber");
    }

    #[test]
    fn test_palette_follows_declaration_order() {
        use strum::IntoEnumIterator;
        assert!(ColorTag::iter().eq(ColorTag::PALETTE));
        assert_eq!(ColorTag::nth(13), ColorTag::Amber);
        assert_eq!(ColorTag::nth(usize::MAX), ColorTag::PALETTE[usize::MAX % 10]);
    }

    #[test]
    fn test_templated_group() {
        let g = Group::templated(ColorTag::Pink);
        assert_eq!(g.name, "New Trio");
        assert_eq!(g.roles.len(), 3);
        assert_eq!(g.role_of_type(RoleType::TechSme).unwrap().title, "Tech SME Role");
        assert!(g.roles.iter().all(|r| r.assignee.is_none()));
    }

    #[test]
    fn test_progress_counts_slots_and_extras() {
        let (pool, alice) = StakeholderPool::new().with_added("Alice").unwrap();
        let mut group = Group::templated(ColorTag::Blue);
        group.roles[0].assignee = Some(alice);
        let roster = Roster {
            groups: vec![group],
            extra_roles: vec![ExtraRole {
                id: RoleId::new(),
                title: "Skeptic".into(),
                description: String::new(),
                assignee: Some(alice),
            }],
            stakeholders: pool,
        };
        assert_eq!(roster.progress(), Progress { filled: 2, total: 4 });
        assert_eq!(roster.assignments_of(alice).len(), 2);
        assert_eq!(roster.progress().to_string(), "2/4");
    }

    #[test]
    fn test_prune_dangling_clears_unknown_assignees() {
        let mut group = Group::templated(ColorTag::Blue);
        group.roles[1].assignee = Some(StakeholderId::new());
        let roster = Roster {
            groups: vec![group],
            ..Roster::default()
        }
        .prune_dangling();
        assert_eq!(roster.progress().filled, 0);
    }
}
