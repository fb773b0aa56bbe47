//! GroupCoordinator - one lazily revealed group of sections
//!
//! Each coordinator is a task that folds four signals into one
//! `Skeleton -> Active` decision per section:
//! - **Scroll:** debounced viewport observation
//! - **Jump:** page-wide requests on the [`JumpBus`](crate::events::JumpBus)
//! - **Deep link:** the URL `section` parameter, honored once per instance
//! - **Preload:** idle-time staggered activation

mod config;
mod core;
mod handle;
mod messages;
mod timers;

pub use config::GroupConfig;
pub use core::{ActiveChangeFn, GroupContext, GroupCoordinator};
pub use handle::GroupHandle;
pub use messages::{DeepLinkState, GroupRequest, GroupSnapshot, RevealState};
