//! Built-in roster used when no document has been stored yet.
//!
//! IDs are derived from fixed string keys, so every client that starts from
//! defaults produces byte-identical rosters.

use crate::ids::{GroupId, RoleId};
use crate::roster::{ColorTag, ExtraRole, Group, RoleSlot, RoleType, Roster};
use crate::stakeholders::StakeholderPool;

struct GroupSeed {
    key: &'static str,
    name: &'static str,
    subtitle: Option<&'static str>,
    color: ColorTag,
    /// (key, title) for the educator, learner and tech SME slots.
    slots: [(&'static str, &'static str); 3],
}

const GROUPS: &[GroupSeed] = &[
    GroupSeed {
        key: "trio-1",
        name: "UME-MD Trio",
        subtitle: None,
        color: ColorTag::Blue,
        slots: [
            ("ume-educator", "Clinical Skills Director"),
            ("ume-learner", "MS3 Student"),
            ("ume-tech", "Medical Education Technologist"),
        ],
    },
    GroupSeed {
        key: "trio-2",
        name: "OPDP Trio",
        subtitle: Some("Other Professional Degree Programs"),
        color: ColorTag::Green,
        slots: [
            ("opdp-educator", "Program Director (SLP or AuD)"),
            ("opdp-learner", "MS-ACI Student"),
            ("opdp-tech", "IPE Coordinator with Tech Interest"),
        ],
    },
    GroupSeed {
        key: "trio-3",
        name: "GME Trio",
        subtitle: None,
        color: ColorTag::Purple,
        slots: [
            ("gme-educator", "Residency Program Director"),
            ("gme-learner", "PGY-2 Resident"),
            ("gme-tech", "Chief Resident with Informatics Interest"),
        ],
    },
    GroupSeed {
        key: "trio-4",
        name: "CPD Trio",
        subtitle: Some("Continuing Professional Development"),
        color: ColorTag::Amber,
        slots: [
            ("cpd-educator", "CPD Director"),
            ("cpd-learner", "Mid-career Faculty Member"),
            ("cpd-tech", "IT Clinical Liaison"),
        ],
    },
    GroupSeed {
        key: "trio-5",
        name: "Cross-Cutting Trio",
        subtitle: None,
        color: ColorTag::Rose,
        slots: [
            ("cross-educator", "Simulation Center Director"),
            ("cross-learner", "Fellow"),
            ("cross-tech", "EBL Director"),
        ],
    },
    GroupSeed {
        key: "trio-6",
        name: "Innovation Trio",
        subtitle: None,
        color: ColorTag::Teal,
        slots: [
            ("innov-educator", "Assessment Director"),
            ("innov-learner", "MS4 or DMP Student"),
            ("innov-tech", "Faculty AI Early Adopter"),
        ],
    },
];

const SLOT_TYPES: [RoleType; 3] = [RoleType::Educator, RoleType::Learner, RoleType::TechSme];

/// The six default trios, the skeptic role, and an empty pool.
pub fn default_roster() -> Roster {
    let groups = GROUPS
        .iter()
        .map(|seed| Group {
            id: GroupId::from_key(seed.key),
            name: seed.name.to_string(),
            subtitle: seed.subtitle.map(str::to_string),
            color: seed.color,
            roles: seed
                .slots
                .iter()
                .zip(SLOT_TYPES)
                .map(|((key, title), role_type)| RoleSlot {
                    id: RoleId::from_key(key),
                    title: title.to_string(),
                    role_type,
                    assignee: None,
                })
                .collect(),
        })
        .collect();

    let extra_roles = vec![ExtraRole {
        id: RoleId::from_key("skeptic"),
        title: "Integrated Skeptic".to_string(),
        description: "Senior faculty member known for thoughtful technology adoption \
                      (rotates through trios)"
            .to_string(),
        assignee: None,
    }];

    Roster {
        groups,
        extra_roles,
        stakeholders: StakeholderPool::new(),
    }
}
