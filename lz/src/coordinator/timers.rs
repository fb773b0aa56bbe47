//! Cancellable timers for the coordinator task
//!
//! Timers never touch coordinator state. Each one is a spawned sleep that
//! posts a [`TimerFired`] back into the coordinator's timer channel. At most
//! one timer of each kind is outstanding; scheduling a kind again aborts the
//! previous one.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::messages::TimerFired;
use crate::section::SectionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TimerKind {
    Debounce,
    ScrollLock,
    DeepLink,
    Preload,
}

pub(crate) struct Timers<K> {
    tx: mpsc::UnboundedSender<TimerFired<K>>,
    handles: HashMap<TimerKind, JoinHandle<()>>,
}

impl<K: SectionKey> Timers<K> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<TimerFired<K>>) -> Self {
        Self {
            tx,
            handles: HashMap::new(),
        }
    }

    /// Fire `fired` once after `delay`
    pub(crate) fn once(&mut self, kind: TimerKind, delay: Duration, fired: TimerFired<K>) {
        debug!(?kind, ?delay, "Timers::once: called");
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(fired);
        });
        self.replace(kind, handle);
    }

    /// Fire `fired` `ticks` times: first after `grace`, then every `stagger`
    pub(crate) fn staggered(
        &mut self,
        kind: TimerKind,
        grace: Duration,
        stagger: Duration,
        ticks: usize,
        fired: TimerFired<K>,
    ) {
        debug!(?kind, ?grace, ?stagger, ticks, "Timers::staggered: called");
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            for tick in 0..ticks {
                if tick > 0 {
                    tokio::time::sleep(stagger).await;
                }
                if tx.send(fired).is_err() {
                    break;
                }
            }
        });
        self.replace(kind, handle);
    }

    fn replace(&mut self, kind: TimerKind, handle: JoinHandle<()>) {
        if let Some(previous) = self.handles.insert(kind, handle) {
            previous.abort();
        }
    }

    pub(crate) fn cancel(&mut self, kind: TimerKind) {
        if let Some(handle) = self.handles.remove(&kind) {
            debug!(?kind, "Timers::cancel: aborting");
            handle.abort();
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for (kind, handle) in self.handles.drain() {
            debug!(?kind, "Timers::cancel_all: aborting");
            handle.abort();
        }
    }

    /// Timers that have not yet run to completion
    pub(crate) fn pending(&self) -> usize {
        self.handles.values().filter(|h| !h.is_finished()).count()
    }
}

impl<K> Drop for Timers<K> {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}
