//! ViewportHost - the page surface a coordinator scrolls and observes

use tracing::debug;

use crate::section::Anchor;

/// Imperative scrolling plus a capability probe for viewport observation
pub trait ViewportHost: Send + Sync {
    /// Smooth-scroll the anchored region into view
    fn scroll_into_view(&self, anchor: &Anchor);

    /// Whether the runtime can report anchor positions at all.
    ///
    /// When false, coordinators fall back to timers for every path that
    /// would otherwise wait on observation.
    fn observation_available(&self) -> bool {
        true
    }
}

/// Host with no scroll surface and no observation capability
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedViewport;

impl ViewportHost for DetachedViewport {
    fn scroll_into_view(&self, anchor: &Anchor) {
        debug!(%anchor, "DetachedViewport::scroll_into_view: ignored");
    }

    fn observation_available(&self) -> bool {
        false
    }
}
