//! GroupCoordinator task implementation

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::config::GroupConfig;
use super::handle::GroupHandle;
use super::messages::{DeepLinkState, GroupRequest, GroupSnapshot, RevealState, TimerFired};
use super::timers::{TimerKind, Timers};
use crate::activation::ActivationSet;
use crate::error::ConfigError;
use crate::events::{ActivationCause, EventBus, EventEmitter, JumpBus};
use crate::location::UrlState;
use crate::section::{GroupLayout, SectionKey, SectionRegistry};
use crate::viewport::{ViewportFrame, ViewportHost, ViewportTracker};

/// Callback invoked with the new active section
pub type ActiveChangeFn<K> = Arc<dyn Fn(K) + Send + Sync>;

/// Collaborators a coordinator shares with the rest of the page
#[derive(Clone)]
pub struct GroupContext<K> {
    pub jumps: JumpBus<K>,
    pub url: Arc<dyn UrlState>,
    pub viewport: Arc<dyn ViewportHost>,
    pub events: Option<Arc<EventBus<K>>>,
    pub on_active_change: Option<ActiveChangeFn<K>>,
}

impl<K: SectionKey> GroupContext<K> {
    pub fn new(jumps: JumpBus<K>, url: Arc<dyn UrlState>, viewport: Arc<dyn ViewportHost>) -> Self {
        Self {
            jumps,
            url,
            viewport,
            events: None,
            on_active_change: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus<K>>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_on_active_change(mut self, f: impl Fn(K) + Send + Sync + 'static) -> Self {
        self.on_active_change = Some(Arc::new(f));
        self
    }
}

/// One lazily revealed group of sections
///
/// The coordinator value outlives its mounts: [`GroupCoordinator::mount`]
/// moves it into a task and [`GroupHandle::unmount`] hands it back, with the
/// deep-link guard still consumed.
pub struct GroupCoordinator<K: SectionKey> {
    layout: GroupLayout<K>,
    config: GroupConfig,
    ctx: GroupContext<K>,
    emitter: Option<EventEmitter<K>>,
    deep_link: DeepLinkState,
    mounts: u32,
}

impl<K: SectionKey> GroupCoordinator<K> {
    /// Create a coordinator, validating its layout and tunables
    pub fn new(layout: GroupLayout<K>, config: GroupConfig, ctx: GroupContext<K>) -> Result<Self, ConfigError> {
        debug!(group = %layout.name, sections = layout.sections.len(), "GroupCoordinator::new: called");
        config.validate()?;
        layout.validate()?;
        let emitter = ctx.events.as_ref().map(|bus| bus.emitter_for(layout.name.clone()));
        Ok(Self {
            layout,
            config,
            ctx,
            emitter,
            deep_link: DeepLinkState::Idle,
            mounts: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.layout.name
    }

    pub fn layout(&self) -> &GroupLayout<K> {
        &self.layout
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    pub fn deep_link_state(&self) -> DeepLinkState {
        self.deep_link
    }

    /// Completed and running mounts so far
    pub fn mounts(&self) -> u32 {
        self.mounts
    }

    /// Spawn the coordinator task and return its handle
    ///
    /// The URL and the jump channel are read here, before the task starts, so
    /// a sibling that rewrites the URL or jumps right after this call cannot
    /// be missed.
    pub fn mount(mut self, gate_open: bool) -> GroupHandle<K> {
        let deep_link = self.take_deep_link(gate_open);
        let jumps = self.ctx.jumps.subscribe();
        let (tx, rx) = mpsc::channel(self.config.channel_buffer);
        let name = self.layout.name.clone();
        debug!(group = %name, gate_open, ?deep_link, "GroupCoordinator::mount: spawning");
        let task = tokio::spawn(self.run(gate_open, deep_link, rx, jumps));
        GroupHandle::new(name, tx, task)
    }

    /// Consume the deep-link guard, returning the section to honor
    fn take_deep_link(&mut self, gate_open: bool) -> Option<K> {
        if self.deep_link == DeepLinkState::Consumed {
            debug!(group = %self.layout.name, "take_deep_link: guard already consumed");
            return None;
        }
        self.deep_link = DeepLinkState::Consumed;

        if !gate_open {
            debug!(group = %self.layout.name, "take_deep_link: gate closed at first mount");
            return None;
        }
        let raw = self.ctx.url.section()?;
        let Ok(id) = raw.parse::<K>() else {
            debug!(group = %self.layout.name, %raw, "take_deep_link: unknown section");
            return None;
        };
        let registry = self.layout.registry();
        if !registry.contains(id) {
            debug!(group = %self.layout.name, %id, "take_deep_link: section belongs to another group");
            return None;
        }
        if registry.first() == Some(id) {
            debug!(group = %self.layout.name, %id, "take_deep_link: default section, nothing to do");
            return None;
        }
        info!(group = %self.layout.name, %id, "Deep link accepted");
        Some(id)
    }

    /// Run the coordinator task until unmounted or every handle is dropped
    async fn run(
        mut self,
        gate_open: bool,
        deep_link: Option<K>,
        mut rx: mpsc::Receiver<GroupRequest<K>>,
        mut jumps: broadcast::Receiver<K>,
    ) -> Self {
        self.mounts += 1;
        let (timer_tx, mut timer_rx) = mpsc::unbounded_channel();
        let mut mount = Mount::new(&self, timer_tx);

        info!(group = %self.layout.name, mount = self.mounts, "GroupCoordinator started");
        if let Some(emitter) = &self.emitter {
            emitter.mounted();
        }
        if gate_open {
            mount.open_gate();
        }
        if let Some(id) = deep_link {
            mount.begin_deep_link(id);
        }

        let mut listening = true;
        loop {
            tokio::select! {
                biased;

                Some(fired) = timer_rx.recv() => mount.handle_timer(fired),

                jump = jumps.recv(), if listening => match jump {
                    Ok(id) => mount.jump_to(id),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(group = %self.layout.name, missed = n, "Jump listener lagged, missed requests");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(group = %self.layout.name, "Jump channel closed");
                        listening = false;
                    }
                },

                req = rx.recv() => match req {
                    Some(GroupRequest::Unmount) | None => break,
                    Some(req) => mount.handle_request(req),
                },
            }
        }

        mount.teardown();
        info!(group = %self.layout.name, mount = self.mounts, "GroupCoordinator stopped");
        self
    }
}

/// State that lives exactly as long as one mount
struct Mount<K: SectionKey> {
    name: String,
    layout: GroupLayout<K>,
    config: GroupConfig,
    ctx: GroupContext<K>,
    emitter: Option<EventEmitter<K>>,
    deep_link: DeepLinkState,

    registry: SectionRegistry<K>,
    activation: ActivationSet<K>,
    tracker: ViewportTracker<K>,
    reveal: RevealState,
    gate_open: bool,
    observing: bool,
    /// Frames are ignored until the deep-link scroll has happened or was superseded
    deep_link_pending: bool,
    /// Bumped on every gate change and on teardown; older timers are stale
    epoch: u64,
    preloaded: usize,
    preload_finished: bool,
    timers: Timers<K>,
}

impl<K: SectionKey> Mount<K> {
    fn new(coordinator: &GroupCoordinator<K>, timer_tx: mpsc::UnboundedSender<TimerFired<K>>) -> Self {
        Self {
            name: coordinator.layout.name.clone(),
            layout: coordinator.layout.clone(),
            config: coordinator.config.clone(),
            ctx: coordinator.ctx.clone(),
            emitter: coordinator.emitter.clone(),
            deep_link: coordinator.deep_link,
            registry: SectionRegistry::empty(),
            activation: ActivationSet::default(),
            tracker: ViewportTracker::inert(coordinator.config.tracker_options()),
            reveal: RevealState::Hidden,
            gate_open: false,
            observing: false,
            deep_link_pending: false,
            epoch: 0,
            preloaded: 0,
            preload_finished: false,
            timers: Timers::new(timer_tx),
        }
    }

    fn handle_request(&mut self, req: GroupRequest<K>) {
        match req {
            GroupRequest::SetGate { open } => {
                if open {
                    self.open_gate();
                } else {
                    self.close_gate();
                }
            }
            GroupRequest::Observe { frame } => self.observe(&frame),
            GroupRequest::ForceActive { id } => self.force_active(id),
            GroupRequest::ScrollTo { id } => self.jump_to(id),
            GroupRequest::GetSnapshot { reply_tx } => {
                let _ = reply_tx.send(self.snapshot());
            }
            GroupRequest::Unmount => {}
        }
    }

    /// Gating prerequisite became true
    fn open_gate(&mut self) {
        if self.gate_open {
            debug!(group = %self.name, "open_gate: already open");
            return;
        }
        self.gate_open = true;
        self.epoch += 1;
        self.registry = self.layout.registry();
        if self.registry.is_empty() {
            debug!(group = %self.name, "open_gate: no sections declared");
            return;
        }

        if self.reveal == RevealState::Hidden {
            self.reveal = RevealState::Revealed;
            info!(group = %self.name, "Group revealed");
            if let Some(emitter) = &self.emitter {
                emitter.revealed();
            }
        }

        for id in self.layout.seed_set() {
            self.activate(id, ActivationCause::Seed);
        }

        self.tracker = ViewportTracker::new(self.registry.clone(), self.config.tracker_options());
        // The first section is current until the first observation lands
        if let Some(first) = self.registry.first() {
            self.tracker.force_active(first);
        }

        self.observing = self.ctx.viewport.observation_available();
        if !self.observing {
            warn!(group = %self.name, "Viewport observation unavailable, preloading every section");
        }
        self.schedule_preload();
    }

    /// Gating prerequisite went back to false
    fn close_gate(&mut self) {
        if !self.gate_open {
            debug!(group = %self.name, "close_gate: already closed");
            return;
        }
        info!(group = %self.name, "Gate closed, detaching tracker");
        self.gate_open = false;
        self.epoch += 1;
        self.timers.cancel_all();
        self.registry = SectionRegistry::empty();
        self.tracker = ViewportTracker::inert(self.config.tracker_options());
        self.observing = false;
        self.deep_link_pending = false;
    }

    fn observe(&mut self, frame: &ViewportFrame<K>) {
        if !self.gate_open || !self.observing || self.deep_link_pending {
            debug!(group = %self.name, "observe: not observing, frame dropped");
            return;
        }
        if let Some(ticket) = self.tracker.observe(frame) {
            self.timers.once(
                TimerKind::Debounce,
                ticket.delay,
                TimerFired::Debounce {
                    epoch: self.epoch,
                    generation: ticket.generation,
                },
            );
        }
    }

    fn force_active(&mut self, id: K) {
        if !self.gate_open || !self.registry.contains(id) {
            debug!(group = %self.name, %id, "force_active: ignored");
            return;
        }
        self.supersede_deep_link(id);
        self.activate(id, ActivationCause::Forced);
        if self.tracker.force_active(id) {
            self.notify(id);
        }
    }

    /// Page-wide jump or direct scroll request
    fn jump_to(&mut self, id: K) {
        if !self.gate_open {
            debug!(group = %self.name, %id, "jump_to: gate closed");
            return;
        }
        if !self.registry.contains(id) {
            debug!(group = %self.name, %id, "jump_to: not in this group");
            return;
        }
        info!(group = %self.name, %id, "Jumping to section");
        self.supersede_deep_link(id);
        self.activate(id, ActivationCause::Jump);
        self.scroll(id);
    }

    fn begin_deep_link(&mut self, id: K) {
        if !self.registry.contains(id) {
            return;
        }
        self.activate(id, ActivationCause::DeepLink);
        if self.tracker.force_active(id) {
            self.notify(id);
        }
        self.deep_link_pending = true;
        self.timers.once(
            TimerKind::DeepLink,
            self.config.deep_link_settle(),
            TimerFired::DeepLink { epoch: self.epoch, id },
        );
    }

    /// An explicit request before the settle delay wins; the deep-link scroll never happens
    fn supersede_deep_link(&mut self, id: K) {
        if !self.deep_link_pending {
            return;
        }
        debug!(group = %self.name, %id, "Deep link superseded before its scroll");
        self.timers.cancel(TimerKind::DeepLink);
        self.deep_link_pending = false;
    }

    fn handle_timer(&mut self, fired: TimerFired<K>) {
        if fired.epoch() != self.epoch || !self.gate_open {
            debug!(group = %self.name, ?fired, epoch = self.epoch, "handle_timer: stale, dropped");
            return;
        }
        match fired {
            TimerFired::Debounce { generation, .. } => {
                if let Some(id) = self.tracker.commit(generation) {
                    self.activate(id, ActivationCause::Scroll);
                    self.notify(id);
                }
            }
            TimerFired::ScrollLock { generation, .. } => {
                if let Some(ticket) = self.tracker.release_lock(generation)
                    && self.observing
                {
                    self.timers.once(
                        TimerKind::Debounce,
                        ticket.delay,
                        TimerFired::Debounce {
                            epoch: self.epoch,
                            generation: ticket.generation,
                        },
                    );
                }
            }
            TimerFired::DeepLink { id, .. } => {
                self.deep_link_pending = false;
                self.scroll(id);
                if let Some(emitter) = &self.emitter {
                    emitter.deep_linked(id);
                }
            }
            TimerFired::PreloadTick { .. } => self.preload_next(),
        }
    }

    fn scroll(&mut self, id: K) {
        let Some(cmd) = self.tracker.scroll_to(id) else {
            return;
        };
        match &cmd.anchor {
            Some(anchor) => self.ctx.viewport.scroll_into_view(anchor),
            None => debug!(group = %self.name, %id, "scroll: anchor not mounted"),
        }
        self.timers.once(
            TimerKind::ScrollLock,
            cmd.lock.delay,
            TimerFired::ScrollLock {
                epoch: self.epoch,
                generation: cmd.lock.generation,
            },
        );
        if cmd.changed {
            self.notify(id);
        }
    }

    fn schedule_preload(&mut self) {
        self.preload_finished = false;
        if !self.config.preload && self.observing {
            debug!(group = %self.name, "schedule_preload: preloading disabled");
            return;
        }
        let remaining = self.registry.ids().filter(|id| !self.activation.is_active(*id)).count();
        if remaining == 0 {
            self.finish_preload();
            return;
        }
        self.timers.staggered(
            TimerKind::Preload,
            self.config.preload_grace(),
            self.config.preload_stagger(),
            remaining,
            TimerFired::PreloadTick { epoch: self.epoch },
        );
    }

    /// Activate the next skeleton section in registry order
    fn preload_next(&mut self) {
        let next = self.registry.ids().find(|id| !self.activation.is_active(*id));
        if let Some(id) = next {
            self.activate(id, ActivationCause::Preload);
            self.preloaded += 1;
        }
        if self.registry.ids().all(|id| self.activation.is_active(id)) {
            self.timers.cancel(TimerKind::Preload);
            self.finish_preload();
        }
    }

    fn finish_preload(&mut self) {
        if self.preload_finished {
            return;
        }
        self.preload_finished = true;
        info!(group = %self.name, preloaded = self.preloaded, "Preloading finished");
        if let Some(emitter) = &self.emitter {
            emitter.preload_finished(self.preloaded);
        }
    }

    fn activate(&mut self, id: K, cause: ActivationCause) {
        if self.activation.activate(id) {
            debug!(group = %self.name, %id, ?cause, "Section activated");
            if let Some(emitter) = &self.emitter {
                emitter.section_activated(id, cause);
            }
        }
    }

    /// Active section changed
    fn notify(&self, id: K) {
        debug!(group = %self.name, %id, "Active section changed");
        if let Some(callback) = &self.ctx.on_active_change {
            callback(id);
        }
        self.ctx.url.replace_section(&id.to_string());
        if let Some(emitter) = &self.emitter {
            emitter.active_section_changed(id);
        }
    }

    fn snapshot(&self) -> GroupSnapshot<K> {
        GroupSnapshot {
            group: self.name.clone(),
            gate_open: self.gate_open,
            reveal: self.reveal,
            deep_link: self.deep_link,
            observing: self.observing,
            active_section: self.tracker.active_section(),
            sections: self
                .registry
                .ids()
                .map(|id| (id, self.activation.state(id)))
                .collect(),
            activated: self.activation.all().to_vec(),
            pending_timers: self.timers.pending(),
        }
    }

    fn teardown(mut self) {
        self.epoch += 1;
        self.timers.cancel_all();
        if let Some(emitter) = &self.emitter {
            emitter.unmounted();
        }
    }
}
