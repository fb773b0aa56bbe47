//! JumpBus - the page-wide "scroll to section" channel
//!
//! Any producer (sidebar navigation, a validation summary, another group)
//! may request a jump. Every coordinator on the page listens and acts only
//! on ids in its own registry.

use tokio::sync::broadcast;
use tracing::debug;

use crate::error::SectionError;
use crate::section::SectionKey;

/// Default channel capacity (jump requests)
pub const DEFAULT_JUMP_CAPACITY: usize = 64;

/// Typed broadcast of jump requests
#[derive(Clone)]
pub struct JumpBus<K> {
    tx: broadcast::Sender<K>,
}

impl<K: SectionKey> JumpBus<K> {
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "JumpBus::new: called");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Request a jump to `section`
    pub fn jump(&self, section: K) {
        debug!(%section, listeners = self.tx.receiver_count(), "JumpBus::jump");
        let _ = self.tx.send(section);
    }

    /// Request a jump named by a string from outside the page.
    /// Unknown names are rejected here, before they reach any coordinator.
    pub fn jump_str(&self, section: &str) -> Result<K, SectionError> {
        let id = section.parse::<K>().map_err(|_| SectionError::Unknown {
            id: section.to_string(),
        })?;
        self.jump(id);
        Ok(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<K> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<K: SectionKey> Default for JumpBus<K> {
    fn default() -> Self {
        Self::new(DEFAULT_JUMP_CAPACITY)
    }
}
