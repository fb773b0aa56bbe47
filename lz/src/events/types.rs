//! Event types for group coordinator activity
//!
//! These events make every coordinator decision observable:
//! - Lifecycle (mount, reveal, unmount)
//! - Activation (which section, and which signal caused it)
//! - Navigation (active section changes, deep links)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which signal promoted a section from placeholder to real content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationCause {
    /// Initial seed set on reveal
    Seed,
    /// Section crossed the activation band
    Scroll,
    /// Page-wide jump request
    Jump,
    /// URL deep link on first mount
    DeepLink,
    /// Idle-time preloader
    Preload,
    /// Caller override outside the observation pipeline
    Forced,
}

/// Core event enum - the vocabulary of coordinator activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GroupEvent<K> {
    /// Coordinator task started
    Mounted { group: String },
    /// Gating prerequisite became true for the first time this mount
    Revealed { group: String },
    /// A section was promoted to real content
    SectionActivated {
        group: String,
        section: K,
        cause: ActivationCause,
    },
    /// The section in view changed
    ActiveSectionChanged { group: String, section: K },
    /// The deep-link scroll was performed
    DeepLinked { group: String, section: K },
    /// The idle preloader has nothing left to activate
    PreloadFinished { group: String, activated: usize },
    /// Coordinator task stopped; timers cancelled
    Unmounted { group: String },
}

impl<K> GroupEvent<K> {
    pub fn group(&self) -> &str {
        match self {
            Self::Mounted { group }
            | Self::Revealed { group }
            | Self::SectionActivated { group, .. }
            | Self::ActiveSectionChanged { group, .. }
            | Self::DeepLinked { group, .. }
            | Self::PreloadFinished { group, .. }
            | Self::Unmounted { group } => group,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Mounted { .. } => "Mounted",
            Self::Revealed { .. } => "Revealed",
            Self::SectionActivated { .. } => "SectionActivated",
            Self::ActiveSectionChanged { .. } => "ActiveSectionChanged",
            Self::DeepLinked { .. } => "DeepLinked",
            Self::PreloadFinished { .. } => "PreloadFinished",
            Self::Unmounted { .. } => "Unmounted",
        }
    }
}

/// Event wrapper with timestamp for persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry<K> {
    pub timestamp: DateTime<Utc>,
    pub event: GroupEvent<K>,
}

impl<K> EventLogEntry<K> {
    pub fn new(event: GroupEvent<K>) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
