//! GroupHandle - client interface to a mounted coordinator

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use super::core::GroupCoordinator;
use super::messages::{GroupRequest, GroupSnapshot};
use crate::section::SectionKey;
use crate::viewport::ViewportFrame;

/// Handle to one mounted group
///
/// Dropping the handle without calling [`GroupHandle::unmount`] closes the
/// request channel, which also stops the task.
pub struct GroupHandle<K: SectionKey> {
    name: String,
    tx: mpsc::Sender<GroupRequest<K>>,
    task: JoinHandle<GroupCoordinator<K>>,
}

impl<K: SectionKey> GroupHandle<K> {
    pub(crate) fn new(name: String, tx: mpsc::Sender<GroupRequest<K>>, task: JoinHandle<GroupCoordinator<K>>) -> Self {
        debug!(%name, "GroupHandle::new: called");
        Self { name, tx, task }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, req: GroupRequest<K>) -> Result<()> {
        self.tx
            .send(req)
            .await
            .map_err(|_| eyre!("Coordinator channel closed for group {}", self.name))
    }

    /// Report the current value of the gating prerequisite
    pub async fn set_gate(&self, open: bool) -> Result<()> {
        debug!(group = %self.name, open, "GroupHandle::set_gate: called");
        self.send(GroupRequest::SetGate { open }).await
    }

    /// Feed one viewport observation
    pub async fn observe(&self, frame: ViewportFrame<K>) -> Result<()> {
        self.send(GroupRequest::Observe { frame }).await
    }

    pub async fn force_active(&self, id: K) -> Result<()> {
        debug!(group = %self.name, %id, "GroupHandle::force_active: called");
        self.send(GroupRequest::ForceActive { id }).await
    }

    /// Scroll to and activate a section of this group only
    pub async fn scroll_to(&self, id: K) -> Result<()> {
        debug!(group = %self.name, %id, "GroupHandle::scroll_to: called");
        self.send(GroupRequest::ScrollTo { id }).await
    }

    pub async fn snapshot(&self) -> Result<GroupSnapshot<K>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GroupRequest::GetSnapshot { reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| eyre!("Coordinator for group {} stopped before replying", self.name))
    }

    /// Stop the task, cancelling every timer, and take the coordinator back
    pub async fn unmount(self) -> Result<GroupCoordinator<K>> {
        debug!(group = %self.name, "GroupHandle::unmount: called");
        // A closed channel means the task is already finishing on its own
        let _ = self.tx.send(GroupRequest::Unmount).await;
        drop(self.tx);
        self.task
            .await
            .map_err(|e| eyre!("Coordinator task for group {} failed: {}", self.name, e))
    }
}
