//! Event Bus - pub/sub for coordinator activity
//!
//! The EventBus uses a tokio broadcast channel to deliver events to all
//! subscribers. Coordinators emit through an [`EventEmitter`] bound to their
//! group; consumers (logger, simulation report, tests) subscribe.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::{ActivationCause, GroupEvent};
use crate::section::SectionKey;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Page-wide bus for group coordinator events
pub struct EventBus<K> {
    tx: broadcast::Sender<GroupEvent<K>>,
}

impl<K: SectionKey> EventBus<K> {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped.
    pub fn emit(&self, event: GroupEvent<K>) {
        debug!(event_type = event.event_type(), group = event.group(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<GroupEvent<K>> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter handle for one group
    pub fn emitter_for(&self, group: impl Into<String>) -> EventEmitter<K> {
        let group = group.into();
        debug!(%group, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            group,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<K: SectionKey> Default for EventBus<K> {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for a coordinator to emit events without owning the bus
#[derive(Clone)]
pub struct EventEmitter<K> {
    tx: broadcast::Sender<GroupEvent<K>>,
    group: String,
}

impl<K: SectionKey> EventEmitter<K> {
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn emit(&self, event: GroupEvent<K>) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    // === Convenience methods ===

    pub fn mounted(&self) {
        self.emit(GroupEvent::Mounted {
            group: self.group.clone(),
        });
    }

    pub fn revealed(&self) {
        self.emit(GroupEvent::Revealed {
            group: self.group.clone(),
        });
    }

    pub fn section_activated(&self, section: K, cause: ActivationCause) {
        self.emit(GroupEvent::SectionActivated {
            group: self.group.clone(),
            section,
            cause,
        });
    }

    pub fn active_section_changed(&self, section: K) {
        self.emit(GroupEvent::ActiveSectionChanged {
            group: self.group.clone(),
            section,
        });
    }

    pub fn deep_linked(&self, section: K) {
        self.emit(GroupEvent::DeepLinked {
            group: self.group.clone(),
            section,
        });
    }

    pub fn preload_finished(&self, activated: usize) {
        self.emit(GroupEvent::PreloadFinished {
            group: self.group.clone(),
            activated,
        });
    }

    pub fn unmounted(&self) {
        self.emit(GroupEvent::Unmounted {
            group: self.group.clone(),
        });
    }
}
