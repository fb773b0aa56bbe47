//! Render contract between a group and its child section components
//!
//! The core only knows section ids and their [`SectionState`]. What a
//! section actually draws is the renderer's business.

use colored::Colorize;
use tracing::debug;

use crate::catalog::SectionId;
use crate::coordinator::GroupSnapshot;
use crate::section::{SectionKey, SectionState};

/// Width of the placeholder bar drawn by [`TextRenderer`]
pub const SKELETON_WIDTH: usize = 24;

/// What a group needs from the components it hosts
pub trait SectionRenderer<K> {
    type Output;

    /// Lightweight stand-in for a section that is not active yet
    fn placeholder(&self, id: K) -> Self::Output;

    /// Real content of an active section
    fn section(&self, id: K) -> Self::Output;

    /// Shown instead of every section while the gating prerequisite is false
    fn gate_notice(&self) -> Self::Output;
}

/// Render one group from a snapshot, in registry order
pub fn render_group<K, R>(snapshot: &GroupSnapshot<K>, renderer: &R) -> Vec<R::Output>
where
    K: SectionKey,
    R: SectionRenderer<K>,
{
    debug!(group = %snapshot.group, gate_open = snapshot.gate_open, "render_group: called");
    if !snapshot.gate_open {
        return vec![renderer.gate_notice()];
    }
    snapshot
        .sections
        .iter()
        .map(|(id, state)| match state {
            SectionState::Active => renderer.section(*id),
            SectionState::Skeleton => renderer.placeholder(*id),
        })
        .collect()
}

/// Plain-text renderer for the catalog sections
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer {
    color: bool,
}

impl TextRenderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl SectionRenderer<SectionId> for TextRenderer {
    type Output = String;

    fn placeholder(&self, id: SectionId) -> String {
        let bar = "░".repeat(SKELETON_WIDTH);
        let line = format!("  {} {}", bar, id);
        if self.color { line.dimmed().to_string() } else { line }
    }

    fn section(&self, id: SectionId) -> String {
        let title = id.title();
        if self.color {
            format!("  {} {}", "■".green(), title.bold())
        } else {
            format!("  ■ {}", title)
        }
    }

    fn gate_notice(&self) -> String {
        let notice = "  Complete the general information first to unlock this group";
        if self.color {
            notice.yellow().to_string()
        } else {
            notice.to_string()
        }
    }
}
