//! Message types for the group coordinator

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::section::SectionState;
use crate::viewport::ViewportFrame;

/// Requests sent to a coordinator task through its handle
#[derive(Debug)]
pub enum GroupRequest<K> {
    /// Gating prerequisite changed (or was re-asserted)
    SetGate { open: bool },

    /// Raw viewport observation
    Observe { frame: ViewportFrame<K> },

    /// Override the active section outside the observation pipeline
    ForceActive { id: K },

    /// Scroll to and activate a section of this group
    ScrollTo { id: K },

    /// Get current state
    GetSnapshot {
        reply_tx: oneshot::Sender<GroupSnapshot<K>>,
    },

    /// Tear down observers and timers and stop the task
    Unmount,
}

/// Timer firings posted back into the coordinator task.
///
/// Every firing carries the mount epoch it was scheduled under; firings from
/// an older epoch are dropped.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TimerFired<K> {
    Debounce { epoch: u64, generation: u64 },
    ScrollLock { epoch: u64, generation: u64 },
    DeepLink { epoch: u64, id: K },
    PreloadTick { epoch: u64 },
}

impl<K> TimerFired<K> {
    pub(crate) fn epoch(&self) -> u64 {
        match self {
            Self::Debounce { epoch, .. }
            | Self::ScrollLock { epoch, .. }
            | Self::DeepLink { epoch, .. }
            | Self::PreloadTick { epoch } => *epoch,
        }
    }
}

/// One-shot deep-link guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeepLinkState {
    #[default]
    Idle,
    Consumed,
}

/// Reveal transition, once per mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevealState {
    #[default]
    Hidden,
    Revealed,
}

/// Point-in-time view of a coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot<K> {
    pub group: String,
    #[serde(rename = "gate-open")]
    pub gate_open: bool,
    pub reveal: RevealState,
    #[serde(rename = "deep-link")]
    pub deep_link: DeepLinkState,
    /// Whether viewport observations are being consumed
    pub observing: bool,
    #[serde(rename = "active-section")]
    pub active_section: Option<K>,
    /// Registry order with each section's state; empty while gated
    pub sections: Vec<(K, SectionState)>,
    /// Every activated section in activation order
    pub activated: Vec<K>,
    #[serde(rename = "pending-timers")]
    pub pending_timers: usize,
}

impl<K: PartialEq + Copy> GroupSnapshot<K> {
    pub fn state_of(&self, id: K) -> Option<SectionState> {
        self.sections.iter().find(|(k, _)| *k == id).map(|(_, s)| *s)
    }

    pub fn is_active(&self, id: K) -> bool {
        self.activated.contains(&id)
    }
}
