//! ActivationSet - which sections have been promoted to real content
//!
//! Membership only grows. Once a section's real content has mounted it stays
//! mounted, so there is no way to remove a member.

use std::collections::HashSet;

use tracing::debug;

use crate::section::{SectionKey, SectionState};

/// Monotonic set of active section ids
#[derive(Debug, Clone)]
pub struct ActivationSet<K> {
    members: HashSet<K>,
    /// Members in the order they were activated
    order: Vec<K>,
}

impl<K: SectionKey> ActivationSet<K> {
    /// Create a set seeded with an initial subset (normally the first section)
    pub fn new(seed: impl IntoIterator<Item = K>) -> Self {
        let mut set = Self {
            members: HashSet::new(),
            order: Vec::new(),
        };
        for id in seed {
            set.activate(id);
        }
        set
    }

    /// Mark a section active. Returns true only if membership changed.
    pub fn activate(&mut self, id: K) -> bool {
        if !self.members.insert(id) {
            debug!(%id, "ActivationSet::activate: already active");
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn is_active(&self, id: K) -> bool {
        self.members.contains(&id)
    }

    pub fn state(&self, id: K) -> SectionState {
        if self.is_active(id) {
            SectionState::Active
        } else {
            SectionState::Skeleton
        }
    }

    /// Current members in activation order
    pub fn all(&self) -> &[K] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K: SectionKey> Default for ActivationSet<K> {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}
