//! Integration tests for lazysection
//!
//! These tests drive whole pages of coordinators through the public API.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lazysection::config::{GroupEntry, ScriptStep};
use lazysection::coordinator::{DeepLinkState, GroupConfig, GroupContext, GroupCoordinator};
use lazysection::events::{EventLogEntry, read_event_log};
use lazysection::simulate::Simulation;
use lazysection::{
    Anchor, EventBus, GroupEvent, GroupId, GroupLayout, JumpBus, PageConfig, PageUrl, SectionId, SectionState,
    UrlState, ViewportHost,
};
use tempfile::TempDir;

/// Viewport that never moves but records scroll requests
#[derive(Default)]
struct StillViewport {
    scrolls: Mutex<Vec<String>>,
}

impl StillViewport {
    fn scrolls(&self) -> Vec<String> {
        self.scrolls.lock().unwrap().clone()
    }
}

impl ViewportHost for StillViewport {
    fn scroll_into_view(&self, anchor: &Anchor) {
        self.scrolls.lock().unwrap().push(anchor.to_string());
    }
}

// =============================================================================
// Multi-group page
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_page_with_three_groups() {
    let jumps = JumpBus::default();
    let url = Arc::new(PageUrl::parse("https://aims.example/activities/5/edit?section=locations&tab=edit").unwrap());
    let viewport = Arc::new(StillViewport::default());
    let events = Arc::new(EventBus::new(256));
    let mut rx = events.subscribe();

    let ctx = || GroupContext::new(jumps.clone(), url.clone(), viewport.clone()).with_events(events.clone());
    let mount = |group: GroupId, gate_open: bool| {
        GroupCoordinator::new(group.layout(), group.default_config(), ctx())
            .expect("catalog groups are valid")
            .mount(gate_open)
    };

    let overview = mount(GroupId::Overview, true);
    let geography = mount(GroupId::Geography, true);
    let finances = mount(GroupId::Finances, false);

    // Deep link honored by the owning group only, after the settle delay
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(viewport.scrolls(), vec!["locations".to_string()]);
    assert_eq!(
        url.href(),
        "https://aims.example/activities/5/edit?section=locations&tab=edit"
    );
    let geo = geography.snapshot().await.unwrap();
    assert_eq!(geo.active_section, Some(SectionId::Locations));
    assert_eq!(geo.state_of(SectionId::Locations), Some(SectionState::Active));
    assert_eq!(geo.state_of(SectionId::PolicyMarkers), Some(SectionState::Skeleton));

    // A jump into a gated group goes nowhere
    jumps.jump(SectionId::Transactions);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(viewport.scrolls().len(), 1);
    assert!(finances.snapshot().await.unwrap().activated.is_empty());

    // Once unlocked, the same jump lands
    finances.set_gate(true).await.unwrap();
    // Requests and jumps arrive on separate channels; let the gate land first
    assert!(finances.snapshot().await.unwrap().gate_open);
    jumps.jump(SectionId::Transactions);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(viewport.scrolls().last().map(String::as_str), Some("transactions"));
    assert_eq!(url.section().as_deref(), Some("transactions"));

    let fin = finances.snapshot().await.unwrap();
    assert_eq!(fin.deep_link, DeepLinkState::Consumed);
    assert_eq!(fin.activated, vec![SectionId::Budgets, SectionId::Transactions]);

    // Overview was never addressed
    let ov = overview.snapshot().await.unwrap();
    assert_eq!(ov.activated, vec![SectionId::General]);
    assert_eq!(ov.active_section, Some(SectionId::General));

    for handle in [overview, geography, finances] {
        handle.unmount().await.unwrap();
    }

    let mut revealed = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let GroupEvent::Revealed { group } = event {
            revealed.push(group);
        }
    }
    assert_eq!(revealed, vec!["overview", "geography", "finances"]);
}

#[tokio::test(start_paused = true)]
async fn test_remount_never_deep_links_twice() {
    let jumps = JumpBus::default();
    let url = Arc::new(PageUrl::parse("https://aims.example/activities/5/edit?section=beneficiaries").unwrap());
    let viewport = Arc::new(StillViewport::default());
    let ctx = GroupContext::new(jumps.clone(), url.clone(), viewport.clone());

    let mut coordinator =
        GroupCoordinator::new(GroupId::Results.layout(), GroupId::Results.default_config(), ctx).unwrap();
    for _ in 0..3 {
        let handle = coordinator.mount(true);
        tokio::time::sleep(Duration::from_secs(2)).await;
        coordinator = handle.unmount().await.unwrap();
    }

    assert_eq!(coordinator.mounts(), 3);
    assert_eq!(viewport.scrolls(), vec!["beneficiaries".to_string()]);
}

// =============================================================================
// Caller-defined section keys
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Chapter {
    Intro,
    Body,
    Appendix,
    Index,
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Intro => "intro",
            Self::Body => "body",
            Self::Appendix => "appendix",
            Self::Index => "index",
        };
        f.write_str(name)
    }
}

impl FromStr for Chapter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intro" => Ok(Self::Intro),
            "body" => Ok(Self::Body),
            "appendix" => Ok(Self::Appendix),
            "index" => Ok(Self::Index),
            other => Err(format!("no chapter {other}")),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_idle_preload_with_custom_keys() {
    let jumps: JumpBus<Chapter> = JumpBus::default();
    let url = Arc::new(PageUrl::parse("https://docs.example/book").unwrap());
    let viewport = Arc::new(StillViewport::default());
    let changes = Arc::new(Mutex::new(Vec::new()));
    let recorded = changes.clone();
    let ctx = GroupContext::new(jumps.clone(), url.clone(), viewport.clone())
        .with_on_active_change(move |chapter| recorded.lock().unwrap().push(chapter));

    let layout = GroupLayout::new(
        "book",
        [Chapter::Intro, Chapter::Body, Chapter::Appendix, Chapter::Index],
    );
    let config = GroupConfig {
        preload: true,
        preload_grace_ms: 3000,
        preload_stagger_ms: 200,
        ..GroupConfig::default()
    };
    let handle = GroupCoordinator::new(layout, config, ctx).unwrap().mount(true);

    let checkpoints = [
        (2950, vec![Chapter::Intro]),
        (3050, vec![Chapter::Intro, Chapter::Body]),
        (3250, vec![Chapter::Intro, Chapter::Body, Chapter::Appendix]),
        (
            3450,
            vec![Chapter::Intro, Chapter::Body, Chapter::Appendix, Chapter::Index],
        ),
    ];
    let mut elapsed = 0;
    for (at_ms, expected) in checkpoints {
        tokio::time::sleep(Duration::from_millis(at_ms - elapsed)).await;
        elapsed = at_ms;
        assert_eq!(handle.snapshot().await.unwrap().activated, expected, "at {at_ms}ms");
    }

    // Preloading never moves the current section or the URL
    assert!(changes.lock().unwrap().is_empty());
    assert_eq!(url.replacements(), 0);

    // Unknown names are refused before reaching the coordinator
    assert!(jumps.jump_str("epilogue").is_err());
    assert_eq!(jumps.jump_str("appendix"), Ok(Chapter::Appendix));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(viewport.scrolls(), vec!["appendix".to_string()]);
    assert_eq!(*changes.lock().unwrap(), vec![Chapter::Appendix]);
    assert_eq!(url.section().as_deref(), Some("appendix"));

    handle.unmount().await.unwrap();
}

// =============================================================================
// Simulation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_simulation_event_log_matches_report() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_path = temp_dir.path().join("logs").join("events.jsonl");

    let config = PageConfig {
        groups: vec![
            GroupEntry::new(GroupId::Overview),
            GroupEntry::new(GroupId::Partners).gated(),
            GroupEntry::new(GroupId::Documents),
        ],
        script: vec![
            ScriptStep::wait(100),
            ScriptStep::jump("related-activities"),
            ScriptStep::wait(1200),
            ScriptStep::gate(GroupId::Partners, true),
            ScriptStep::wait(100),
        ],
        ..PageConfig::default()
    };
    let report = Simulation::new(config).unwrap().run(Some(log_path.as_path())).await.unwrap();

    let logged: Vec<EventLogEntry<SectionId>> = read_event_log(&log_path).unwrap();
    let logged_types: Vec<_> = logged.iter().map(|e| e.event.event_type()).collect();
    let report_types: Vec<_> = report.timeline.iter().map(|e| e.event.event_type()).collect();
    assert_eq!(logged_types, report_types);

    assert_eq!(report.events_of("Revealed").len(), 3);
    assert_eq!(report.events_of("Unmounted").len(), 3);
    assert!(report.is_active(SectionId::RelatedActivities));
    assert!(report.is_active(SectionId::ParticipatingOrgs));
    assert_eq!(report.scrolls, vec!["related-activities".to_string()]);
    assert_eq!(report.duration_ms, 1400);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_page_is_rejected_before_mounting() {
    let config = PageConfig {
        script: vec![ScriptStep::gate(GroupId::Results, true)],
        groups: vec![GroupEntry::new(GroupId::Overview)],
        ..PageConfig::default()
    };
    let err = Simulation::new(config).err().expect("gate step for an absent group");
    assert!(format!("{err:#}").contains("not on the page"));
}
