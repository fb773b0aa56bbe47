//! lazysection - lazy section activation for long multi-group record editors
//!
//! A record editor page is split into named groups, each split into named
//! sections. Every section starts as a cheap placeholder and is switched to
//! its real content exactly once, when the user scrolls to it, jumps to it,
//! arrives at it by deep link, or when the idle preloader gets to it.
//!
//! # Modules
//!
//! - [`section`] - Section identity, group layouts and registries
//! - [`activation`] - Monotonic set of activated sections
//! - [`viewport`] - Activation band and the debounced viewport tracker
//! - [`coordinator`] - One task per group combining every activation signal
//! - [`events`] - Page-wide jump channel and the coordinator event bus
//! - [`location`] - The URL `section` parameter
//! - [`catalog`] - Sections and groups of the activity editor
//! - [`simulate`] - Deterministic whole-page simulation
//! - [`config`] - Page configuration types and loading
//! - [`cli`] - Command-line interface

pub mod activation;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod location;
pub mod render;
pub mod section;
pub mod simulate;
pub mod viewport;

pub use activation::ActivationSet;
pub use catalog::{GroupId, SectionId};
pub use config::PageConfig;
pub use coordinator::{GroupConfig, GroupContext, GroupCoordinator, GroupHandle, GroupSnapshot};
pub use error::{ConfigError, SectionError};
pub use events::{ActivationCause, EventBus, GroupEvent, JumpBus};
pub use location::{PageUrl, UrlState};
pub use section::{Anchor, GroupLayout, Section, SectionKey, SectionRegistry, SectionState};
pub use viewport::{ActivationBand, Rect, ViewportFrame, ViewportHost, ViewportTracker};
