//! Event Logger - persists coordinator events to a JSONL file
//!
//! The EventLogger subscribes to the EventBus and appends every event as one
//! JSON line, for debugging and replaying a page session.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{EventLogEntry, GroupEvent};
use crate::section::SectionKey;

/// Event logger that appends events to a JSONL file
pub struct EventLogger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl EventLogger {
    /// Open (or create) the log file for appending
    pub fn create(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "EventLogger::create: opening log file");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one event as a JSON line
    pub fn write_event<K: Serialize + Clone>(&mut self, event: &GroupEvent<K>) -> eyre::Result<()> {
        let entry = EventLogEntry::new(event.clone());
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Run the logger, consuming events from the bus until it closes
    ///
    /// This is meant to be spawned as a background task.
    pub async fn run<K: SectionKey + Serialize>(mut self, mut rx: broadcast::Receiver<GroupEvent<K>>) {
        debug!(path = ?self.path, "EventLogger::run: starting event logger");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.write_event(&event) {
                        error!(group = event.group(), error = %e, "EventLogger: failed to write event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventLogger: lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventLogger: channel closed, shutting down");
                    break;
                }
            }
        }

        let _ = self.writer.flush();
    }
}

/// Subscribe a logger to the bus and spawn it
///
/// The subscription is taken before spawning so no event emitted after this
/// call is missed.
pub fn spawn_event_logger<K: SectionKey + Serialize>(
    bus: &Arc<EventBus<K>>,
    path: impl AsRef<Path>,
) -> eyre::Result<JoinHandle<()>> {
    let logger = EventLogger::create(path)?;
    let rx = bus.subscribe();
    Ok(tokio::spawn(logger.run(rx)))
}

/// Read every entry from an event log
pub fn read_event_log<K: DeserializeOwned>(path: impl AsRef<Path>) -> eyre::Result<Vec<EventLogEntry<K>>> {
    let path = path.as_ref();
    debug!(?path, "read_event_log: reading log file");

    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(error = %e, "read_event_log: skipping malformed line"),
        }
    }

    Ok(entries)
}
