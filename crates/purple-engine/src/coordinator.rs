#![forbid(unsafe_code)]

//! Mutation Coordinator.
//!
//! Turns the document's change stream into coalesced repaint passes. The
//! coordinator is host-driven: hosts push [`Change`] records and pointer
//! events in, drain [`Wakeup`] requests out, and call back into
//! [`Coordinator::flush`] or [`Coordinator::run`] when a wakeup fires.
//!
//! ```text
//!   Idle ──first pending node──▶ FlushScheduled ──flush()──▶ Idle
//!                                   │  ▲
//!                                   └──┘ further nodes join the same pass
//! ```
//!
//! # Invariants
//!
//! 1. At most one animation-frame wakeup is outstanding.
//! 2. Every pass runs suppressed: changes the pass makes are discarded
//!    and never scheduled.
//! 3. Pending nodes are processed once each, in first-insertion order;
//!    nodes detached by the time the pass runs are skipped.
//! 4. Changes the page made before a pass started are re-observed after
//!    it, never lost.

use std::time::Duration;

use purple_core::ThemeConfig;
use purple_dom::{AssetResolver, Change, Dom};
use tracing::{debug, debug_span, info, trace};
use web_time::Instant;

use crate::engine::Engine;
use crate::painter::PaintReport;
use crate::pending::PendingSet;
use crate::suppress::Suppressor;

/// Pointer events the host forwards (capture phase, document level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Click,
    Up,
    Leave,
}

/// Deferred work the host schedules on a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task<N> {
    /// Re-append the active-nav fragment, repaint active tabs and the title.
    RefreshActive,
    /// Clean up hover residue around a node.
    ScrubAround(N),
}

/// A request for the host to call back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wakeup<N> {
    /// Call [`Coordinator::flush`] on the next animation frame.
    AnimationFrame,
    /// Call [`Coordinator::run`] with `task` after `delay`.
    After { delay: Duration, task: Task<N> },
}

/// What one coalesced pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Pending nodes drained.
    pub nodes: usize,
    /// Drained nodes no longer in the document.
    pub detached: usize,
    pub paint: PaintReport,
    /// Inline declarations removed by the scrubber.
    pub scrubbed: usize,
    /// Whether logo and favicons were re-checked.
    pub identity: bool,
    pub title_changed: bool,
}

/// What one periodic tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Fragments that had gone missing and were re-inserted.
    pub fragments_restored: usize,
    pub active_writes: usize,
    pub title_changed: bool,
}

/// Running totals across coalesced passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub passes: u64,
    pub nodes_painted: u64,
    pub overrides: u64,
    pub scrubbed: u64,
    pub last_pass: Duration,
}

impl PassStats {
    fn record(&mut self, report: &PassReport, elapsed: Duration) {
        self.passes += 1;
        self.nodes_painted += report.paint.visited as u64;
        self.overrides += report.paint.overrides as u64;
        self.scrubbed += report.scrubbed as u64;
        self.last_pass = elapsed;
    }
}

pub struct Coordinator<D: Dom> {
    engine: Engine,
    pending: PendingSet<D::Node>,
    flush_scheduled: bool,
    suppressor: Suppressor,
    wakeups: Vec<Wakeup<D::Node>>,
    stats: PassStats,
    tick_interval: Duration,
    hover_settle: Duration,
}

impl<D: Dom> Coordinator<D> {
    pub fn new(config: &ThemeConfig, assets: impl AssetResolver + 'static) -> Self {
        Self {
            engine: Engine::new(config, assets),
            pending: PendingSet::new(),
            flush_scheduled: false,
            suppressor: Suppressor::new(),
            wakeups: Vec::new(),
            stats: PassStats::default(),
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            hover_settle: Duration::from_millis(config.hover_settle_ms),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// A handle observing this coordinator's suppression depth.
    #[must_use]
    pub fn suppressor(&self) -> Suppressor {
        self.suppressor.clone()
    }

    #[must_use]
    pub fn stats(&self) -> PassStats {
        self.stats
    }

    #[must_use]
    pub fn is_flush_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Period of the fallback [`tick`](Self::tick).
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Drain the wakeups requested since the last call.
    pub fn take_wakeups(&mut self) -> Vec<Wakeup<D::Node>> {
        std::mem::take(&mut self.wakeups)
    }

    /// Initial full-document pass.
    pub fn start(&mut self, dom: &mut D) -> PassReport {
        let started = Instant::now();
        let report = self.suppressed(dom, |engine, dom| {
            let mut report = PassReport {
                identity: true,
                ..PassReport::default()
            };
            engine.ensure_rules(dom);
            engine.refresh_rules(dom);
            if let Some(root) = dom.document_element() {
                report.nodes = 1;
                report.paint = engine.painter().paint_subtree(dom, &root);
                report.scrubbed = engine.scrubber().scrub_contained(dom, &root);
            }
            let logo = engine.replace_logo(dom);
            trace!(?logo, "logo");
            engine.upsert_favicons(dom);
            report.title_changed = engine.rewrite_title(dom);
            engine.paint_active(dom);
            report
        });
        info!(
            visited = report.paint.visited,
            overrides = report.paint.overrides,
            elapsed_us = started.elapsed().as_micros() as u64,
            "purple engine started"
        );
        report
    }

    /// Run `f` with observation suppressed.
    ///
    /// Changes queued before `f` runs are stashed and re-observed once the
    /// guard is released; changes `f` makes are discarded.
    pub fn suppressed<R>(&mut self, dom: &mut D, f: impl FnOnce(&Engine, &mut D) -> R) -> R {
        let backlog = dom.take_changes();
        let out = {
            let _guard = self.suppressor.enter();
            let out = f(&self.engine, dom);
            let own = dom.take_changes();
            trace!(discarded = own.len(), "dropped self-originated changes");
            out
        };
        for change in backlog {
            self.observe(dom, change);
        }
        out
    }

    fn enqueue(&mut self, dom: &D, node: D::Node) -> bool {
        let key = dom.node_key(&node);
        if !self.pending.insert(key, node) || self.flush_scheduled {
            return false;
        }
        self.flush_scheduled = true;
        self.wakeups.push(Wakeup::AnimationFrame);
        true
    }

    fn defer(&mut self, delay: Duration, task: Task<D::Node>) {
        self.wakeups.push(Wakeup::After { delay, task });
    }

    /// Feed one change record. Returns `true` if a flush was requested.
    pub fn observe(&mut self, dom: &D, change: Change<D::Node>) -> bool {
        if self.suppressor.is_active() {
            return false;
        }
        match change {
            Change::Children { added, .. } => {
                let mut requested = false;
                for node in added {
                    requested |= self.enqueue(dom, node);
                }
                requested
            }
            Change::Attribute { target, name } => {
                self.engine.theme().observes_attribute(&name) && self.enqueue(dom, target)
            }
        }
    }

    /// Feed a batch of change records.
    pub fn observe_all(
        &mut self,
        dom: &D,
        changes: impl IntoIterator<Item = Change<D::Node>>,
    ) -> bool {
        let mut requested = false;
        for change in changes {
            requested |= self.observe(dom, change);
        }
        requested
    }

    /// Run the coalesced pass over everything pending.
    pub fn flush(&mut self, dom: &mut D) -> PassReport {
        self.flush_scheduled = false;
        let nodes = self.pending.drain();
        if nodes.is_empty() {
            return PassReport::default();
        }
        let _span = debug_span!("coalesced_pass", nodes = nodes.len()).entered();
        let started = Instant::now();

        let report = self.suppressed(dom, |engine, dom| {
            let mut report = PassReport {
                nodes: nodes.len(),
                ..PassReport::default()
            };
            let painter = engine.painter();
            let scrubber = engine.scrubber();
            for node in &nodes {
                if !dom.is_connected(node) {
                    report.detached += 1;
                    continue;
                }
                report.paint += painter.paint_subtree(dom, node);
                report.scrubbed += scrubber.scrub_enclosing(dom, node);
                report.scrubbed += scrubber.scrub_contained(dom, node);
                report.identity |= engine.touches_identity(dom, node);
            }
            if report.identity {
                engine.replace_logo(dom);
                engine.upsert_favicons(dom);
            }
            report.title_changed = engine.rewrite_title(dom);
            report
        });

        let elapsed = started.elapsed();
        self.stats.record(&report, elapsed);
        debug!(
            nodes = report.nodes,
            detached = report.detached,
            visited = report.paint.visited,
            overrides = report.paint.overrides,
            scrubbed = report.scrubbed,
            identity = report.identity,
            elapsed_us = elapsed.as_micros() as u64,
            "coalesced pass"
        );
        report
    }

    /// Periodic fallback: heal dropped fragments and repaint active tabs.
    pub fn tick(&mut self, dom: &mut D) -> TickReport {
        let report = self.suppressed(dom, |engine, dom| {
            let fragments_restored = engine.ensure_rules(dom);
            engine.refresh_rules(dom);
            TickReport {
                fragments_restored,
                active_writes: engine.paint_active(dom),
                title_changed: engine.rewrite_title(dom),
            }
        });
        if report.fragments_restored > 0 {
            debug!(restored = report.fragments_restored, "style fragments restored");
        }
        report
    }

    /// Forward a pointer event whose target is `target`.
    pub fn pointer(&mut self, dom: &mut D, kind: PointerKind, target: Option<D::Node>) {
        match (kind, target) {
            (PointerKind::Click, target) => {
                if let Some(target) = target {
                    self.enqueue(dom, target);
                }
                self.defer(Duration::ZERO, Task::RefreshActive);
            }
            (PointerKind::Up, Some(target)) => self.run(dom, Task::ScrubAround(target)),
            (PointerKind::Leave, Some(target)) => {
                self.defer(self.hover_settle, Task::ScrubAround(target));
            }
            (PointerKind::Up | PointerKind::Leave, None) => {}
        }
    }

    /// History navigation: the active tab may have changed without a click.
    pub fn navigated(&mut self) {
        self.defer(Duration::ZERO, Task::RefreshActive);
    }

    /// Execute a deferred task.
    pub fn run(&mut self, dom: &mut D, task: Task<D::Node>) {
        match task {
            Task::RefreshActive => {
                let writes = self.suppressed(dom, |engine, dom| {
                    engine.refresh_rules(dom);
                    engine.rewrite_title(dom);
                    engine.paint_active(dom)
                });
                trace!(writes, "active tabs refreshed");
            }
            Task::ScrubAround(target) => {
                if !dom.is_connected(&target) {
                    return;
                }
                let removed = self.suppressed(dom, |engine, dom| {
                    engine.scrubber().scrub_around(dom, &target)
                });
                self.stats.scrubbed += removed as u64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use purple_dom::{MemoryDom, NodeId, PrefixResolver, Priority};

    fn coordinator() -> Coordinator<MemoryDom> {
        Coordinator::new(&ThemeConfig::default(), PrefixResolver::default())
    }

    fn started() -> (MemoryDom, Coordinator<MemoryDom>) {
        let mut dom = MemoryDom::new();
        let mut c = coordinator();
        c.start(&mut dom);
        c.take_wakeups();
        (dom, c)
    }

    fn add(dom: &mut MemoryDom, markup: &str) -> Vec<NodeId> {
        let body = dom.body().unwrap();
        dom.append_markup(body, markup).unwrap()
    }

    #[test]
    fn first_change_schedules_single_frame() {
        let (mut dom, mut c) = started();
        add(&mut dom, "<div/>");
        add(&mut dom, "<div/>");
        let changes = dom.take_changes();
        assert!(c.observe_all(&dom, changes));
        assert_eq!(c.take_wakeups(), vec![Wakeup::AnimationFrame]);
        assert!(c.is_flush_scheduled());
        assert_eq!(c.pending_len(), 2);
    }

    #[test]
    fn duplicate_nodes_are_coalesced() {
        let (mut dom, mut c) = started();
        let div = add(&mut dom, "<div/>")[0];
        dom.set_attribute(&div, "class", "a").unwrap();
        dom.set_attribute(&div, "class", "b").unwrap();
        let changes = dom.take_changes();
        c.observe_all(&dom, changes);
        assert_eq!(c.pending_len(), 1);
        let report = c.flush(&mut dom);
        assert_eq!(report.nodes, 1);
        assert!(!c.is_flush_scheduled());
        assert_eq!(c.stats().passes, 1);
    }

    #[test]
    fn unlisted_attributes_are_ignored() {
        let (mut dom, mut c) = started();
        let div = add(&mut dom, "<div/>")[0];
        dom.take_changes();
        dom.set_style(&div, "color", "red", Priority::Normal).unwrap();
        dom.set_attribute(&div, "fill", "red").unwrap();
        let changes = dom.take_changes();
        assert!(!c.observe_all(&dom, changes));
        assert_eq!(c.pending_len(), 0);
    }

    #[test]
    fn changes_during_suppression_are_ignored() {
        let (mut dom, mut c) = started();
        let div = add(&mut dom, "<div/>")[0];
        dom.take_changes();
        let _guard = c.suppressor().enter();
        assert!(!c.observe(
            &dom,
            Change::Children {
                target: div,
                added: vec![div]
            }
        ));
        assert_eq!(c.pending_len(), 0);
    }

    #[test]
    fn pass_writes_do_not_reschedule() {
        let (mut dom, mut c) = started();
        let div = add(&mut dom, "<div/>")[0];
        dom.set_computed(div, "color", "rgb(29, 155, 240)").unwrap();
        let changes = dom.take_changes();
        c.observe_all(&dom, changes);
        c.take_wakeups();

        let report = c.flush(&mut dom);

        assert_eq!(report.paint.overrides, 1);
        assert_eq!(dom.pending_changes(), 0);
        assert!(c.take_wakeups().is_empty());
        assert!(!c.is_flush_scheduled());
    }

    #[test]
    fn detached_nodes_are_skipped() {
        let (mut dom, mut c) = started();
        let div = add(&mut dom, "<div/>")[0];
        let changes = dom.take_changes();
        c.observe_all(&dom, changes);
        dom.remove(&div).unwrap();
        dom.take_changes();
        let report = c.flush(&mut dom);
        assert_eq!(report.detached, 1);
        assert_eq!(report.paint.visited, 0);
    }

    #[test]
    fn backlog_is_reobserved_after_suppressed_scope() {
        let (mut dom, mut c) = started();
        let div = add(&mut dom, "<div/>")[0];
        let ran = c.suppressed(&mut dom, |_, dom| {
            dom.set_attribute(&div, "class", "ours").unwrap();
            7
        });
        assert_eq!(ran, 7);
        assert_eq!(c.pending_len(), 1);
        assert_eq!(c.take_wakeups(), vec![Wakeup::AnimationFrame]);
        assert!(!c.suppressor().is_active());
    }

    #[test]
    fn pointer_events_map_to_wakeups() {
        let (mut dom, mut c) = started();
        let div = add(&mut dom, "<div/>")[0];
        dom.take_changes();

        c.pointer(&mut dom, PointerKind::Click, Some(div));
        c.pointer(&mut dom, PointerKind::Leave, Some(div));
        c.pointer(&mut dom, PointerKind::Leave, None);
        c.navigated();

        assert_eq!(
            c.take_wakeups(),
            vec![
                Wakeup::AnimationFrame,
                Wakeup::After {
                    delay: Duration::ZERO,
                    task: Task::RefreshActive
                },
                Wakeup::After {
                    delay: Duration::from_millis(60),
                    task: Task::ScrubAround(div)
                },
                Wakeup::After {
                    delay: Duration::ZERO,
                    task: Task::RefreshActive
                },
            ]
        );
    }

    #[test]
    fn tick_restores_dropped_fragments() {
        let (mut dom, mut c) = started();
        let style = dom.element_by_id("purple-hover-leak").unwrap();
        dom.remove(&style).unwrap();
        let report = c.tick(&mut dom);
        assert_eq!(report.fragments_restored, 1);
        assert_eq!(c.tick(&mut dom).fragments_restored, 0);
    }

    #[test]
    fn empty_flush_is_cheap() {
        let (mut dom, mut c) = started();
        assert_eq!(c.flush(&mut dom), PassReport::default());
        assert_eq!(c.stats().passes, 0);
    }
}
