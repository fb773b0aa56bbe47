//! Page simulation
//!
//! Stacks the configured groups on one virtual page, mounts a coordinator
//! per group and plays the configured script against them. The viewport
//! reports a frame per group at a fixed interval while the script waits.
//! Run it on a paused tokio clock and it finishes instantly with the same
//! timeline every time.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::{GroupId, SectionId};
use crate::config::{PageConfig, Step};
use crate::coordinator::{GroupContext, GroupCoordinator, GroupHandle, GroupSnapshot};
use crate::events::{EventBus, GroupEvent, JumpBus, spawn_event_logger};
use crate::location::PageUrl;
use crate::render::{TextRenderer, render_group};
use crate::section::Anchor;
use crate::viewport::{Rect, ViewportFrame, ViewportHost};

#[derive(Debug, Clone, PartialEq)]
struct Placement {
    id: SectionId,
    top: f64,
    height: f64,
    anchored: bool,
}

/// Vertical layout of every section on the page plus a scroll offset
#[derive(Debug, Clone, PartialEq)]
pub struct PageModel {
    viewport_height: f64,
    scroll_offset: f64,
    placements: Vec<Placement>,
}

impl PageModel {
    /// Stack sections top to bottom; `(id, height, anchored)` in page order
    pub fn new(viewport_height: f64, sections: impl IntoIterator<Item = (SectionId, f64, bool)>) -> Self {
        let mut top = 0.0;
        let placements = sections
            .into_iter()
            .map(|(id, height, anchored)| {
                let placement = Placement {
                    id,
                    top,
                    height,
                    anchored,
                };
                top += height;
                placement
            })
            .collect();
        Self {
            viewport_height,
            scroll_offset: 0.0,
            placements,
        }
    }

    pub fn from_config(config: &PageConfig) -> Self {
        let sections = config.groups.iter().flat_map(|entry| {
            entry
                .placements()
                .into_iter()
                .map(|(id, section)| (id, section.height(), section.anchored))
        });
        Self::new(config.viewport_height, sections)
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn total_height(&self) -> f64 {
        self.placements.last().map(|p| p.top + p.height).unwrap_or(0.0)
    }

    /// Largest offset that still fills the viewport
    pub fn max_scroll(&self) -> f64 {
        (self.total_height() - self.viewport_height).max(0.0)
    }

    pub fn set_scroll_offset(&mut self, px: f64) {
        self.scroll_offset = px.clamp(0.0, self.max_scroll());
    }

    /// Page offset of a section's top edge
    pub fn top_of(&self, id: SectionId) -> Option<f64> {
        self.placements.iter().find(|p| p.id == id).map(|p| p.top)
    }

    /// Frame for the given sections, relative to the viewport top.
    /// Sections without a mounted anchor are not reported.
    pub fn frame_for(&self, ids: &[SectionId]) -> ViewportFrame<SectionId> {
        self.placements
            .iter()
            .filter(|p| p.anchored && ids.contains(&p.id))
            .fold(ViewportFrame::new(self.viewport_height), |frame, p| {
                frame.with_rect(p.id, Rect::from_height(p.top - self.scroll_offset, p.height))
            })
    }
}

/// Viewport host backed by a [`PageModel`]
///
/// Scrolling to an anchor moves the page so the section's top edge sits at
/// the top of the viewport.
pub struct SimulatedViewport {
    model: Arc<Mutex<PageModel>>,
    observation: bool,
    scrolls: Mutex<Vec<String>>,
}

impl SimulatedViewport {
    pub fn new(model: Arc<Mutex<PageModel>>, observation: bool) -> Self {
        Self {
            model,
            observation,
            scrolls: Mutex::new(Vec::new()),
        }
    }

    /// Every anchor scrolled to, in order
    pub fn scrolls(&self) -> Vec<String> {
        self.scrolls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

fn lock_model(model: &Mutex<PageModel>) -> MutexGuard<'_, PageModel> {
    model.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ViewportHost for SimulatedViewport {
    fn scroll_into_view(&self, anchor: &Anchor) {
        self.scrolls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(anchor.to_string());

        let Ok(id) = anchor.as_str().parse::<SectionId>() else {
            debug!(%anchor, "SimulatedViewport::scroll_into_view: anchor names no section");
            return;
        };
        let mut model = lock_model(&self.model);
        if let Some(top) = model.top_of(id) {
            model.set_scroll_offset(top);
            debug!(%anchor, offset = model.scroll_offset(), "SimulatedViewport::scroll_into_view: moved");
        }
    }

    fn observation_available(&self) -> bool {
        self.observation
    }
}

/// One event with its virtual-time offset from the start of the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(rename = "at-ms")]
    pub at_ms: u64,
    pub event: GroupEvent<SectionId>,
}

/// Everything a simulation run observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Final page URL
    pub url: String,
    #[serde(rename = "duration-ms")]
    pub duration_ms: u64,
    pub timeline: Vec<TimelineEntry>,
    /// Final state of each group, page order
    pub groups: Vec<GroupSnapshot<SectionId>>,
    /// Anchors scrolled to, in order
    pub scrolls: Vec<String>,
    /// Jump names the jump channel refused
    #[serde(rename = "rejected-jumps")]
    pub rejected_jumps: Vec<String>,
}

impl SimulationReport {
    pub fn group(&self, name: &str) -> Option<&GroupSnapshot<SectionId>> {
        self.groups.iter().find(|g| g.group == name)
    }

    pub fn is_active(&self, id: SectionId) -> bool {
        self.groups.iter().any(|g| g.is_active(id))
    }

    /// Events of one type, in timeline order
    pub fn events_of(&self, event_type: &str) -> Vec<&TimelineEntry> {
        self.timeline
            .iter()
            .filter(|entry| entry.event.event_type() == event_type)
            .collect()
    }

    /// Human-readable report
    pub fn render_text(&self, color: bool) -> String {
        let renderer = TextRenderer::new(color);
        let mut out = String::new();

        let _ = writeln!(out, "Timeline ({} ms)", self.duration_ms);
        for entry in &self.timeline {
            let _ = writeln!(
                out,
                "  +{:>6}ms  {:<10} {}",
                entry.at_ms,
                entry.event.group(),
                describe(&entry.event)
            );
        }

        let _ = writeln!(out, "\nGroups");
        for snapshot in &self.groups {
            let active = snapshot
                .active_section
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {} [{}/{} active, current: {}]",
                snapshot.group,
                snapshot.activated.len(),
                snapshot.sections.len(),
                active
            );
            for line in render_group(snapshot, &renderer) {
                let _ = writeln!(out, "  {}", line);
            }
        }

        let _ = writeln!(out, "\nURL: {}", self.url);
        if !self.scrolls.is_empty() {
            let _ = writeln!(out, "Scrolls: {}", self.scrolls.join(", "));
        }
        if !self.rejected_jumps.is_empty() {
            let _ = writeln!(out, "Rejected jumps: {}", self.rejected_jumps.join(", "));
        }
        out
    }
}

fn describe(event: &GroupEvent<SectionId>) -> String {
    match event {
        GroupEvent::SectionActivated { section, cause, .. } => {
            format!("activated {} ({:?})", section, cause).to_lowercase()
        }
        GroupEvent::ActiveSectionChanged { section, .. } => format!("current section {}", section),
        GroupEvent::DeepLinked { section, .. } => format!("deep-linked to {}", section),
        GroupEvent::PreloadFinished { activated, .. } => format!("preloading finished ({} preloaded)", activated),
        other => other.event_type().to_lowercase(),
    }
}

struct MountedGroup {
    group: GroupId,
    sections: Vec<SectionId>,
    handle: GroupHandle<SectionId>,
}

/// Runs one configured page script
pub struct Simulation {
    config: PageConfig,
    steps: Vec<Step>,
}

impl Simulation {
    pub fn new(config: PageConfig) -> Result<Self> {
        config.validate().context("Invalid page configuration")?;
        let steps = config.steps()?;
        Ok(Self { config, steps })
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Play the script, optionally appending every event to a JSONL log
    pub async fn run(&self, events_log: Option<&Path>) -> Result<SimulationReport> {
        let start = Instant::now();
        info!(groups = self.config.groups.len(), steps = self.steps.len(), "Simulation started");

        let events = Arc::new(EventBus::new(self.config.event_capacity));
        let logger = events_log.map(|path| spawn_event_logger(&events, path)).transpose()?;
        let collector = spawn_collector(events.subscribe(), start);

        let url = Arc::new(PageUrl::parse(&self.config.url).context("Invalid page URL")?);
        let model = Arc::new(Mutex::new(PageModel::from_config(&self.config)));
        let viewport = Arc::new(SimulatedViewport::new(model.clone(), self.config.observation));
        let jumps = JumpBus::default();

        let mut mounted = Vec::with_capacity(self.config.groups.len());
        for entry in &self.config.groups {
            let ctx = GroupContext::new(jumps.clone(), url.clone(), viewport.clone()).with_events(events.clone());
            let coordinator = GroupCoordinator::new(entry.layout(), entry.config(), ctx)?;
            mounted.push(MountedGroup {
                group: entry.group,
                sections: entry.placements().into_iter().map(|(id, _)| id).collect(),
                handle: coordinator.mount(entry.gate_open),
            });
        }

        let frame = Duration::from_millis(self.config.frame_ms);
        let mut rejected_jumps = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            debug!(index, ?step, "Simulation::run: step");
            match step {
                Step::Wait(duration) => feed_frames(&mounted, &model, *duration, frame).await?,
                Step::ScrollTo(px) => lock_model(&model).set_scroll_offset(*px),
                Step::Jump(name) => {
                    if let Err(e) = jumps.jump_str(name) {
                        warn!(error = %e, "Simulation: jump rejected");
                        rejected_jumps.push(name.clone());
                    }
                    tokio::task::yield_now().await;
                }
                Step::Gate { group, open } => {
                    let target = mounted
                        .iter()
                        .find(|m| m.group == *group)
                        .ok_or_else(|| eyre!("Group {} is not on the page", group))?;
                    target.handle.set_gate(*open).await?;
                    // Round trip so a following jump sees the new gate
                    target.handle.snapshot().await?;
                }
            }
        }

        let mut groups = Vec::with_capacity(mounted.len());
        for m in &mounted {
            groups.push(m.handle.snapshot().await?);
        }
        let duration_ms = start.elapsed().as_millis() as u64;

        for m in mounted {
            drop(m.handle.unmount().await?);
        }
        drop(events);

        let timeline = collector.await.map_err(|e| eyre!("Event collector failed: {}", e))?;
        if let Some(logger) = logger {
            logger.await.map_err(|e| eyre!("Event logger failed: {}", e))?;
        }

        info!(events = timeline.len(), duration_ms, "Simulation finished");
        Ok(SimulationReport {
            url: url.href(),
            duration_ms,
            timeline,
            groups,
            scrolls: viewport.scrolls(),
            rejected_jumps,
        })
    }
}

/// Let `duration` pass, reporting one frame per group every `frame`
async fn feed_frames(
    mounted: &[MountedGroup],
    model: &Mutex<PageModel>,
    duration: Duration,
    frame: Duration,
) -> Result<()> {
    let deadline = Instant::now() + duration;
    loop {
        let frames: Vec<_> = {
            let model = lock_model(model);
            mounted.iter().map(|m| model.frame_for(&m.sections)).collect()
        };
        for (m, f) in mounted.iter().zip(frames) {
            m.handle.observe(f).await?;
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        tokio::time::sleep(frame.min(deadline - now)).await;
    }
}

fn spawn_collector(mut rx: broadcast::Receiver<GroupEvent<SectionId>>, start: Instant) -> JoinHandle<Vec<TimelineEntry>> {
    tokio::spawn(async move {
        let mut timeline = Vec::new();
        loop {
            match rx.recv().await {
                Ok(event) => timeline.push(TimelineEntry {
                    at_ms: start.elapsed().as_millis() as u64,
                    event,
                }),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "Simulation: event collector lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        timeline
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroupEntry, ScriptStep, SectionEntry};
    use crate::coordinator::GroupConfig;
    use crate::events::ActivationCause;

    fn model() -> PageModel {
        PageModel::new(
            1000.0,
            [
                (SectionId::Budgets, 800.0, true),
                (SectionId::Transactions, 800.0, true),
                (SectionId::Commitments, 800.0, false),
            ],
        )
    }

    #[test]
    fn test_model_stacks_sections() {
        let m = model();
        assert_eq!(m.total_height(), 2400.0);
        assert_eq!(m.max_scroll(), 1400.0);
        assert_eq!(m.top_of(SectionId::Transactions), Some(800.0));
        assert_eq!(m.top_of(SectionId::General), None);
    }

    #[test]
    fn test_frame_is_relative_to_viewport() {
        let mut m = model();
        m.set_scroll_offset(700.0);
        let frame = m.frame_for(&[SectionId::Budgets, SectionId::Transactions, SectionId::Commitments]);
        assert_eq!(frame.rect(SectionId::Transactions), Some(&Rect::new(100.0, 900.0)));
        // Unanchored sections are never reported
        assert_eq!(frame.rect(SectionId::Commitments), None);

        m.set_scroll_offset(99_999.0);
        assert_eq!(m.scroll_offset(), 1400.0);
    }

    #[test]
    fn test_viewport_scrolls_model() {
        let model = Arc::new(Mutex::new(model()));
        let viewport = SimulatedViewport::new(model.clone(), true);
        viewport.scroll_into_view(&Anchor::new("transactions"));
        viewport.scroll_into_view(&Anchor::new("elsewhere"));

        assert_eq!(lock_model(&model).scroll_offset(), 800.0);
        assert_eq!(viewport.scrolls(), vec!["transactions".to_string(), "elsewhere".to_string()]);
    }

    fn finances_page(script: Vec<ScriptStep>) -> PageConfig {
        PageConfig {
            url: "https://aims.example/activities/9/edit".to_string(),
            viewport_height: 1000.0,
            groups: vec![
                GroupEntry::new(GroupId::Finances).with_tunables(GroupConfig::default()),
                GroupEntry::new(GroupId::Results).with_tunables(GroupConfig::default()),
            ],
            script,
            ..PageConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrolling_activates_sections() {
        // Budgets 880, planned disbursements 560: transactions starts at 1440
        let config = finances_page(vec![
            ScriptStep::wait(200),
            ScriptStep::scroll_to(1400.0),
            ScriptStep::wait(500),
        ]);
        let report = Simulation::new(config).unwrap().run(None).await.unwrap();

        assert!(report.is_active(SectionId::Transactions));
        assert!(!report.is_active(SectionId::PlannedDisbursements));
        assert!(!report.is_active(SectionId::Beneficiaries));
        assert_eq!(
            report.group("finances").unwrap().active_section,
            Some(SectionId::Transactions)
        );
        assert!(report.url.ends_with("?section=transactions"));
        assert!(report.scrolls.is_empty());
        assert_eq!(report.duration_ms, 700);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_reaches_owning_group_only() {
        let config = finances_page(vec![
            ScriptStep::jump("commitments"),
            ScriptStep::jump("budget-lines"),
            ScriptStep::wait(1500),
        ]);
        let report = Simulation::new(config).unwrap().run(None).await.unwrap();

        assert_eq!(report.scrolls, vec!["commitments".to_string()]);
        assert_eq!(report.rejected_jumps, vec!["budget-lines".to_string()]);
        let finances = report.group("finances").unwrap();
        assert_eq!(finances.active_section, Some(SectionId::Commitments));
        // Skipped over on the way down, never activated
        assert!(!finances.is_active(SectionId::Transactions));
        // The results group keeps its own state
        let results = report.group("results").unwrap();
        assert_eq!(results.activated, vec![SectionId::Results]);
        assert!(report.url.ends_with("section=commitments"));

        let jumped = report.timeline.iter().any(|entry| {
            matches!(
                entry.event,
                GroupEvent::SectionActivated {
                    section: SectionId::Commitments,
                    cause: ActivationCause::Jump,
                    ..
                }
            )
        });
        assert!(jumped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deep_link_on_first_mount() {
        let mut config = finances_page(vec![ScriptStep::wait(1000)]);
        config.url = "https://aims.example/activities/9/edit?section=commitments&tab=edit".to_string();
        let report = Simulation::new(config).unwrap().run(None).await.unwrap();

        assert_eq!(report.scrolls, vec!["commitments".to_string()]);
        let deep_linked = report.events_of("DeepLinked");
        assert_eq!(deep_linked.len(), 1);
        assert_eq!(deep_linked[0].at_ms, 300);
        assert!(report.url.contains("section=commitments"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_reveals_group() {
        let mut config = finances_page(vec![
            ScriptStep::wait(100),
            ScriptStep::gate(GroupId::Results, true),
            ScriptStep::wait(100),
        ]);
        config.groups[1] = GroupEntry::new(GroupId::Results).gated();
        let report = Simulation::new(config).unwrap().run(None).await.unwrap();

        let revealed: Vec<_> = report
            .events_of("Revealed")
            .into_iter()
            .map(|e| (e.event.group().to_string(), e.at_ms))
            .collect();
        assert_eq!(revealed, vec![("finances".to_string(), 0), ("results".to_string(), 100)]);
        assert!(report.is_active(SectionId::Results));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blind_viewport_preloads_everything() {
        let mut config = finances_page(vec![ScriptStep::wait(5000)]);
        config.observation = false;
        let report = Simulation::new(config).unwrap().run(None).await.unwrap();

        for id in [
            SectionId::Budgets,
            SectionId::PlannedDisbursements,
            SectionId::Transactions,
            SectionId::Commitments,
            SectionId::Results,
            SectionId::Beneficiaries,
        ] {
            assert!(report.is_active(id), "{id} should be preloaded");
        }
        assert_eq!(report.events_of("PreloadFinished").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanchored_section_absorbs_jump() {
        let mut config = finances_page(vec![ScriptStep::jump("transactions"), ScriptStep::wait(100)]);
        config.groups[0].sections = Some(vec![
            SectionEntry::new(SectionId::Budgets),
            SectionEntry {
                id: SectionId::Transactions,
                height: Some(500.0),
                anchored: false,
            },
        ]);
        let report = Simulation::new(config).unwrap().run(None).await.unwrap();

        assert!(report.scrolls.is_empty());
        assert!(report.is_active(SectionId::Transactions));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_log_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        let config = finances_page(vec![ScriptStep::wait(100)]);
        let report = Simulation::new(config).unwrap().run(Some(path.as_path())).await.unwrap();

        let logged: Vec<crate::events::EventLogEntry<SectionId>> = crate::events::read_event_log(&path).unwrap();
        assert_eq!(logged.len(), report.timeline.len());
    }

    #[test]
    fn test_render_text() {
        let report = SimulationReport {
            url: "https://aims.example/a?section=budgets".to_string(),
            duration_ms: 10,
            timeline: vec![TimelineEntry {
                at_ms: 0,
                event: GroupEvent::SectionActivated {
                    group: "finances".to_string(),
                    section: SectionId::Budgets,
                    cause: ActivationCause::Seed,
                },
            }],
            groups: Vec::new(),
            scrolls: vec!["budgets".to_string()],
            rejected_jumps: Vec::new(),
        };
        let text = report.render_text(false);
        assert!(text.contains("activated budgets (seed)"));
        assert!(text.contains("URL: https://aims.example/a?section=budgets"));
        assert!(text.contains("Scrolls: budgets"));
        assert!(!text.contains("Rejected"));
    }
}
