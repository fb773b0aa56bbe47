//! Section catalog for the development-activity editor
//!
//! Every section the editor page can show, and the group that owns it. The
//! wire form (URL parameter, config files, jump requests) is kebab-case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coordinator::GroupConfig;
use crate::error::SectionError;
use crate::section::GroupLayout;
use crate::viewport::ActivationBand;

/// Sections of an activity record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionId {
    General,
    Identifiers,
    Dates,
    ParticipatingOrgs,
    Contacts,
    Sectors,
    Locations,
    PolicyMarkers,
    Budgets,
    PlannedDisbursements,
    Transactions,
    Commitments,
    Results,
    Beneficiaries,
    Documents,
    RelatedActivities,
}

impl SectionId {
    pub const ALL: [SectionId; 16] = [
        Self::General,
        Self::Identifiers,
        Self::Dates,
        Self::ParticipatingOrgs,
        Self::Contacts,
        Self::Sectors,
        Self::Locations,
        Self::PolicyMarkers,
        Self::Budgets,
        Self::PlannedDisbursements,
        Self::Transactions,
        Self::Commitments,
        Self::Results,
        Self::Beneficiaries,
        Self::Documents,
        Self::RelatedActivities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Identifiers => "identifiers",
            Self::Dates => "dates",
            Self::ParticipatingOrgs => "participating-orgs",
            Self::Contacts => "contacts",
            Self::Sectors => "sectors",
            Self::Locations => "locations",
            Self::PolicyMarkers => "policy-markers",
            Self::Budgets => "budgets",
            Self::PlannedDisbursements => "planned-disbursements",
            Self::Transactions => "transactions",
            Self::Commitments => "commitments",
            Self::Results => "results",
            Self::Beneficiaries => "beneficiaries",
            Self::Documents => "documents",
            Self::RelatedActivities => "related-activities",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::General => "General Information",
            Self::Identifiers => "Identifiers",
            Self::Dates => "Activity Dates",
            Self::ParticipatingOrgs => "Participating Organisations",
            Self::Contacts => "Contacts",
            Self::Sectors => "Sector Allocation",
            Self::Locations => "Locations",
            Self::PolicyMarkers => "Policy Markers",
            Self::Budgets => "Budgets",
            Self::PlannedDisbursements => "Planned Disbursements",
            Self::Transactions => "Transactions",
            Self::Commitments => "Commitments",
            Self::Results => "Results Framework",
            Self::Beneficiaries => "Beneficiaries",
            Self::Documents => "Documents & Images",
            Self::RelatedActivities => "Related Activities",
        }
    }

    /// Group that owns this section
    pub fn group(&self) -> GroupId {
        GroupId::ALL
            .into_iter()
            .find(|g| g.sections().contains(self))
            .unwrap_or(GroupId::Overview)
    }

    /// Typical rendered height in pixels, used by the page simulation
    pub fn default_height(&self) -> f64 {
        match self {
            Self::General => 900.0,
            Self::Identifiers | Self::Dates | Self::Contacts => 420.0,
            Self::ParticipatingOrgs => 640.0,
            Self::Sectors => 760.0,
            Self::Locations => 820.0,
            Self::PolicyMarkers => 480.0,
            Self::Budgets | Self::Transactions => 880.0,
            Self::PlannedDisbursements | Self::Commitments => 560.0,
            Self::Results => 960.0,
            Self::Beneficiaries => 380.0,
            Self::Documents => 700.0,
            Self::RelatedActivities => 360.0,
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = SectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| SectionError::Unknown { id: s.to_string() })
    }
}

/// Groups on the activity editor page, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupId {
    Overview,
    Partners,
    Geography,
    Finances,
    Results,
    Documents,
}

impl GroupId {
    pub const ALL: [GroupId; 6] = [
        Self::Overview,
        Self::Partners,
        Self::Geography,
        Self::Finances,
        Self::Results,
        Self::Documents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Partners => "partners",
            Self::Geography => "geography",
            Self::Finances => "finances",
            Self::Results => "results",
            Self::Documents => "documents",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Overview => "Activity Overview",
            Self::Partners => "Partners & Contacts",
            Self::Geography => "Sectors & Geography",
            Self::Finances => "Finances",
            Self::Results => "Results & Beneficiaries",
            Self::Documents => "Documents & Links",
        }
    }

    pub fn sections(&self) -> &'static [SectionId] {
        use SectionId::*;
        match self {
            Self::Overview => &[General, Identifiers, Dates],
            Self::Partners => &[ParticipatingOrgs, Contacts],
            Self::Geography => &[Sectors, Locations, PolicyMarkers],
            Self::Finances => &[Budgets, PlannedDisbursements, Transactions, Commitments],
            Self::Results => &[Results, Beneficiaries],
            Self::Documents => &[Documents, RelatedActivities],
        }
    }

    pub fn layout(&self) -> GroupLayout<SectionId> {
        GroupLayout::new(self.as_str(), self.sections().iter().copied())
    }

    /// Tunables each group ships with.
    ///
    /// Only the overview group preloads eagerly; the others activate as the
    /// user scrolls to them.
    pub fn default_config(&self) -> GroupConfig {
        let base = GroupConfig::default();
        match self {
            Self::Overview => GroupConfig {
                preload: true,
                preload_stagger_ms: 150,
                ..base
            },
            Self::Partners => GroupConfig {
                debounce_ms: 120,
                ..base
            },
            Self::Geography => GroupConfig {
                band: ActivationBand::new(96.0, 0.6),
                preload_grace_ms: 3500,
                preload_stagger_ms: 250,
                ..base
            },
            Self::Finances => GroupConfig {
                band: ActivationBand::new(80.0, 0.55),
                debounce_ms: 150,
                preload_grace_ms: 4000,
                preload_stagger_ms: 300,
                ..base
            },
            Self::Results => base,
            Self::Documents => GroupConfig {
                debounce_ms: 80,
                preload_stagger_ms: 100,
                ..base
            },
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupId {
    type Err = SectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| SectionError::UnknownGroup { id: s.to_string() })
    }
}
