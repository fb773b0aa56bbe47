//! ViewportTracker - which registered section is currently in view
//!
//! The tracker is a synchronous state machine. It never sleeps: whenever it
//! needs time to pass (debounce window, scroll lock) it hands back a ticket
//! and the owner schedules a timer that reports the ticket's generation back.
//! Tickets from superseded generations are ignored.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use super::band::{ActivationBand, Rect, ViewportFrame};
use crate::section::{Anchor, SectionKey, SectionRegistry};

/// Tracker tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerOptions {
    pub band: ActivationBand,
    pub debounce: Duration,
    /// How long observation is ignored after an imperative scroll
    pub scroll_lock: Duration,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            band: ActivationBand::default(),
            debounce: Duration::from_millis(100),
            scroll_lock: Duration::from_millis(1000),
        }
    }
}

/// Request to call [`ViewportTracker::commit`] after `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTicket {
    pub generation: u64,
    pub delay: Duration,
}

/// Request to call [`ViewportTracker::release_lock`] after `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTicket {
    pub generation: u64,
    pub delay: Duration,
}

/// Result of an accepted [`ViewportTracker::scroll_to`]
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollCommand<K> {
    pub id: K,
    /// `None` when the section's region is not mounted
    pub anchor: Option<Anchor>,
    /// Whether the active section changed
    pub changed: bool,
    pub lock: LockTicket,
}

/// Maintains the debounced active section for one registry
#[derive(Debug)]
pub struct ViewportTracker<K> {
    registry: SectionRegistry<K>,
    options: TrackerOptions,
    active: Option<K>,
    pending: Option<K>,
    debounce_generation: u64,
    lock: Option<u64>,
    lock_generation: u64,
    /// Last candidate seen while locked, replayed on release
    locked_candidate: Option<K>,
}

impl<K: SectionKey> ViewportTracker<K> {
    pub fn new(registry: SectionRegistry<K>, options: TrackerOptions) -> Self {
        debug!(sections = registry.len(), "ViewportTracker::new: called");
        Self {
            registry,
            options,
            active: None,
            pending: None,
            debounce_generation: 0,
            lock: None,
            lock_generation: 0,
            locked_candidate: None,
        }
    }

    /// Tracker with nothing to track
    pub fn inert(options: TrackerOptions) -> Self {
        Self::new(SectionRegistry::empty(), options)
    }

    pub fn is_inert(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn active_section(&self) -> Option<K> {
        self.active
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Section currently crossing the activation band.
    /// Ties go to the earliest section in registry order.
    pub fn candidate(&self, frame: &ViewportFrame<K>) -> Option<K> {
        let rects: HashMap<K, &Rect> = frame.rects.iter().map(|(k, r)| (*k, r)).collect();
        self.registry.ids().find(|id| {
            rects
                .get(id)
                .is_some_and(|rect| self.options.band.intersects(rect, frame.viewport_height))
        })
    }

    /// Feed a raw observation. Returns a ticket when a commit should be
    /// attempted after the debounce window.
    pub fn observe(&mut self, frame: &ViewportFrame<K>) -> Option<DebounceTicket> {
        if self.is_inert() {
            return None;
        }
        let candidate = self.candidate(frame)?;

        if self.lock.is_some() {
            debug!(%candidate, "ViewportTracker::observe: locked, deferring candidate");
            self.locked_candidate = Some(candidate);
            return None;
        }
        self.submit(candidate)
    }

    fn submit(&mut self, candidate: K) -> Option<DebounceTicket> {
        if Some(candidate) == self.active {
            self.debounce_generation += 1;
            self.pending = None;
            return None;
        }
        // Already waiting on this candidate; the outstanding ticket stands
        if Some(candidate) == self.pending {
            return None;
        }

        self.debounce_generation += 1;
        debug!(%candidate, generation = self.debounce_generation, "ViewportTracker::submit: pending");
        self.pending = Some(candidate);
        Some(DebounceTicket {
            generation: self.debounce_generation,
            delay: self.options.debounce,
        })
    }

    /// Commit the pending candidate if `generation` is still current.
    /// Returns the newly active section when it changed.
    pub fn commit(&mut self, generation: u64) -> Option<K> {
        if generation != self.debounce_generation || self.lock.is_some() {
            debug!(generation, current = self.debounce_generation, "ViewportTracker::commit: stale");
            return None;
        }
        let candidate = self.pending.take()?;
        if Some(candidate) == self.active {
            return None;
        }
        self.active = Some(candidate);
        Some(candidate)
    }

    /// Begin an imperative scroll to `id`.
    ///
    /// The target becomes active immediately and observation is locked until
    /// the returned ticket is released, so the scroll motion itself never
    /// reads as organic input.
    pub fn scroll_to(&mut self, id: K) -> Option<ScrollCommand<K>> {
        if !self.registry.contains(id) {
            debug!(%id, "ViewportTracker::scroll_to: not registered");
            return None;
        }

        self.lock_generation += 1;
        self.lock = Some(self.lock_generation);
        self.locked_candidate = None;
        self.pending = None;
        self.debounce_generation += 1;

        let changed = self.active != Some(id);
        self.active = Some(id);

        Some(ScrollCommand {
            id,
            anchor: self.registry.anchor(id).cloned(),
            changed,
            lock: LockTicket {
                generation: self.lock_generation,
                delay: self.options.scroll_lock,
            },
        })
    }

    /// End a scroll lock. The last candidate seen during the lock goes back
    /// through the debounce path.
    pub fn release_lock(&mut self, generation: u64) -> Option<DebounceTicket> {
        if self.lock != Some(generation) {
            return None;
        }
        self.lock = None;
        let candidate = self.locked_candidate.take()?;
        self.submit(candidate)
    }

    /// Set the active section outside the observation pipeline.
    /// Returns true if it changed.
    pub fn force_active(&mut self, id: K) -> bool {
        if !self.registry.contains(id) {
            return false;
        }
        self.pending = None;
        self.debounce_generation += 1;
        if self.active == Some(id) {
            return false;
        }
        self.active = Some(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SectionId;
    use crate::section::Section;

    fn tracker() -> ViewportTracker<SectionId> {
        let registry = SectionRegistry::from_sections(&[
            Section::new(SectionId::Budgets, 0),
            Section::new(SectionId::PlannedDisbursements, 1),
            Section::new(SectionId::Transactions, 2).without_anchor(),
        ]);
        ViewportTracker::new(registry, TrackerOptions::default())
    }

    fn frame(rects: &[(SectionId, f64, f64)]) -> ViewportFrame<SectionId> {
        rects
            .iter()
            .fold(ViewportFrame::new(1000.0), |f, (id, top, bottom)| {
                f.with_rect(*id, Rect::new(*top, *bottom))
            })
    }

    #[test]
    fn test_observe_then_commit() {
        let mut t = tracker();
        let ticket = t
            .observe(&frame(&[(SectionId::PlannedDisbursements, 50.0, 600.0)]))
            .unwrap();
        assert_eq!(ticket.delay, Duration::from_millis(100));
        assert_eq!(t.active_section(), None);

        assert_eq!(t.commit(ticket.generation), Some(SectionId::PlannedDisbursements));
        assert_eq!(t.active_section(), Some(SectionId::PlannedDisbursements));
    }

    #[test]
    fn test_newer_observation_supersedes_ticket() {
        let mut t = tracker();
        let first = t.observe(&frame(&[(SectionId::Budgets, 50.0, 600.0)])).unwrap();
        let second = t
            .observe(&frame(&[(SectionId::PlannedDisbursements, 50.0, 600.0)]))
            .unwrap();

        assert_eq!(t.commit(first.generation), None);
        assert_eq!(t.commit(second.generation), Some(SectionId::PlannedDisbursements));
    }

    #[test]
    fn test_repeated_candidate_keeps_ticket() {
        let mut t = tracker();
        t.force_active(SectionId::Budgets);
        let f = frame(&[(SectionId::PlannedDisbursements, 50.0, 600.0)]);

        let ticket = t.observe(&f).unwrap();
        assert!(t.observe(&f).is_none());
        assert!(t.observe(&f).is_none());
        assert_eq!(t.commit(ticket.generation), Some(SectionId::PlannedDisbursements));
    }

    #[test]
    fn test_returning_to_active_cancels_pending() {
        let mut t = tracker();
        assert!(t.force_active(SectionId::Budgets));

        let ticket = t
            .observe(&frame(&[(SectionId::PlannedDisbursements, 50.0, 600.0)]))
            .unwrap();
        assert!(t.observe(&frame(&[(SectionId::Budgets, 50.0, 600.0)])).is_none());
        assert_eq!(t.commit(ticket.generation), None);
        assert_eq!(t.active_section(), Some(SectionId::Budgets));
    }

    #[test]
    fn test_tie_break_prefers_registry_order() {
        let t = tracker();
        // Both intersect; frame lists the later section first
        let f = frame(&[
            (SectionId::PlannedDisbursements, 100.0, 300.0),
            (SectionId::Budgets, -200.0, 100.0),
        ]);
        for _ in 0..10 {
            assert_eq!(t.candidate(&f), Some(SectionId::Budgets));
        }
    }

    #[test]
    fn test_no_candidate_keeps_state() {
        let mut t = tracker();
        t.force_active(SectionId::Budgets);
        assert!(t.observe(&frame(&[(SectionId::PlannedDisbursements, 700.0, 900.0)])).is_none());
        assert_eq!(t.active_section(), Some(SectionId::Budgets));
    }

    #[test]
    fn test_unregistered_rects_ignored() {
        let mut t = tracker();
        assert!(t.observe(&frame(&[(SectionId::General, 50.0, 600.0)])).is_none());
    }

    #[test]
    fn test_scroll_lock_suppresses_feedback() {
        let mut t = tracker();
        t.force_active(SectionId::Budgets);

        let cmd = t.scroll_to(SectionId::PlannedDisbursements).unwrap();
        assert!(cmd.changed);
        assert_eq!(cmd.anchor, Some(Anchor::new("planned-disbursements")));
        assert_eq!(t.active_section(), Some(SectionId::PlannedDisbursements));

        // Motion passes over budgets on the way
        assert!(t.observe(&frame(&[(SectionId::Budgets, 50.0, 600.0)])).is_none());
        assert_eq!(t.active_section(), Some(SectionId::PlannedDisbursements));

        // Landed on the target: releasing the lock replays nothing new
        assert!(t.observe(&frame(&[(SectionId::PlannedDisbursements, 80.0, 600.0)])).is_none());
        assert!(t.release_lock(cmd.lock.generation).is_none());
        assert!(!t.is_locked());
    }

    #[test]
    fn test_release_replays_divergent_candidate() {
        let mut t = tracker();
        let cmd = t.scroll_to(SectionId::Budgets).unwrap();
        t.observe(&frame(&[(SectionId::PlannedDisbursements, 50.0, 600.0)]));

        let ticket = t.release_lock(cmd.lock.generation).unwrap();
        assert_eq!(t.commit(ticket.generation), Some(SectionId::PlannedDisbursements));
    }

    #[test]
    fn test_stale_lock_release_ignored() {
        let mut t = tracker();
        let first = t.scroll_to(SectionId::Budgets).unwrap();
        let second = t.scroll_to(SectionId::PlannedDisbursements).unwrap();

        assert!(t.release_lock(first.lock.generation).is_none());
        assert!(t.is_locked());
        t.release_lock(second.lock.generation);
        assert!(!t.is_locked());
    }

    #[test]
    fn test_scroll_to_unmounted_anchor() {
        let mut t = tracker();
        let cmd = t.scroll_to(SectionId::Transactions).unwrap();
        assert_eq!(cmd.anchor, None);
        assert_eq!(t.active_section(), Some(SectionId::Transactions));
    }

    #[test]
    fn test_inert_tracker() {
        let mut t: ViewportTracker<SectionId> = ViewportTracker::inert(TrackerOptions::default());
        assert!(t.is_inert());
        assert!(t.observe(&frame(&[(SectionId::Budgets, 50.0, 600.0)])).is_none());
        assert!(t.scroll_to(SectionId::Budgets).is_none());
        assert!(!t.force_active(SectionId::Budgets));
        assert_eq!(t.active_section(), None);
    }

    #[test]
    fn test_force_active_is_idempotent() {
        let mut t = tracker();
        assert!(t.force_active(SectionId::Budgets));
        assert!(!t.force_active(SectionId::Budgets));
        assert!(!t.force_active(SectionId::General));
    }
}
