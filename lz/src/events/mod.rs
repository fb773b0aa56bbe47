//! Page-wide channels
//!
//! Two broadcast channels connect the coordinators on a page:
//!
//! ```text
//!   sidebar / other groups          coordinators
//!   ──────────────────────►  JumpBus  ──────────►  group A, group B, ...
//!
//!   group A, group B, ...  ──────────►  EventBus  ──────────►  logger, reports
//! ```
//!
//! - [`JumpBus`] carries "scroll to section" requests. The payload is the
//!   typed section id, so a coordinator only has to check registry
//!   membership.
//! - [`EventBus`] carries [`GroupEvent`]s describing every activation
//!   decision, for logging and inspection.

mod bus;
mod jump;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter};
pub use jump::{DEFAULT_JUMP_CAPACITY, JumpBus};
pub use logger::{EventLogger, read_event_log, spawn_event_logger};
pub use types::{ActivationCause, EventLogEntry, GroupEvent};
