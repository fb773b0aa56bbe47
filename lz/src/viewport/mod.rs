//! Viewport observation
//!
//! - [`ActivationBand`] decides whether an anchor counts as "current"
//! - [`ViewportTracker`] debounces observations into one active section and
//!   locks itself during imperative scrolls
//! - [`ViewportHost`] is the page surface that actually scrolls

mod band;
mod host;
mod tracker;

pub use band::{ActivationBand, Rect, ViewportFrame};
pub use host::{DetachedViewport, ViewportHost};
pub use tracker::{DebounceTicket, LockTicket, ScrollCommand, TrackerOptions, ViewportTracker};
