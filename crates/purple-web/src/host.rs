#![forbid(unsafe_code)]

//! Host loop: feeds the coordinator and turns its wakeups into timers.
//!
//! The browser host implements [`Scheduler`] with `requestAnimationFrame`
//! and `setTimeout`; tests implement it with a queue.

use std::time::Duration;

use purple_dom::{Change, Dom};
use purple_engine::{Coordinator, PassReport, PointerKind, Task, TickReport, Wakeup};
use tracing::trace;

/// Where the host sends the coordinator's wakeup requests.
pub trait Scheduler<N> {
    /// Call [`Host::frame`] before the next repaint.
    fn request_frame(&mut self);

    /// Call [`Host::timer`] with `task` after `delay`.
    fn schedule(&mut self, delay: Duration, task: Task<N>);
}

/// A coordinator bound to a scheduler.
pub struct Host<D: Dom, S> {
    coordinator: Coordinator<D>,
    scheduler: S,
}

impl<D: Dom, S: Scheduler<D::Node>> Host<D, S> {
    pub fn new(coordinator: Coordinator<D>, scheduler: S) -> Self {
        Self {
            coordinator,
            scheduler,
        }
    }

    #[must_use]
    pub fn coordinator(&self) -> &Coordinator<D> {
        &self.coordinator
    }

    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    fn dispatch(&mut self) {
        for wakeup in self.coordinator.take_wakeups() {
            match wakeup {
                Wakeup::AnimationFrame => self.scheduler.request_frame(),
                Wakeup::After { delay, task } => {
                    trace!(?delay, ?task, "task scheduled");
                    self.scheduler.schedule(delay, task);
                }
            }
        }
    }

    pub fn start(&mut self, dom: &mut D) -> PassReport {
        let report = self.coordinator.start(dom);
        self.dispatch();
        report
    }

    /// A batch of observer records arrived.
    pub fn mutations(&mut self, dom: &D, changes: Vec<Change<D::Node>>) {
        self.coordinator.observe_all(dom, changes);
        self.dispatch();
    }

    /// The animation frame requested through [`Scheduler::request_frame`].
    pub fn frame(&mut self, dom: &mut D) -> PassReport {
        let report = self.coordinator.flush(dom);
        self.dispatch();
        report
    }

    /// A task scheduled through [`Scheduler::schedule`] came due.
    pub fn timer(&mut self, dom: &mut D, task: Task<D::Node>) {
        self.coordinator.run(dom, task);
        self.dispatch();
    }

    pub fn tick(&mut self, dom: &mut D) -> TickReport {
        let report = self.coordinator.tick(dom);
        self.dispatch();
        report
    }

    pub fn pointer(&mut self, dom: &mut D, kind: PointerKind, target: Option<D::Node>) {
        self.coordinator.pointer(dom, kind, target);
        self.dispatch();
    }

    pub fn navigated(&mut self) {
        self.coordinator.navigated();
        self.dispatch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use purple_core::ThemeConfig;
    use purple_dom::{MemoryDom, NodeId, PrefixResolver, Priority};

    const BLUE: &str = "rgb(29, 155, 240)";

    #[derive(Debug, Default)]
    struct Queue {
        frames: usize,
        timers: Vec<(Duration, Task<NodeId>)>,
    }

    impl Scheduler<NodeId> for Queue {
        fn request_frame(&mut self) {
            self.frames += 1;
        }

        fn schedule(&mut self, delay: Duration, task: Task<NodeId>) {
            self.timers.push((delay, task));
        }
    }

    fn host() -> (MemoryDom, Host<MemoryDom, Queue>) {
        let mut dom = MemoryDom::new();
        let coordinator = Coordinator::new(&ThemeConfig::default(), PrefixResolver::default());
        let mut host = Host::new(coordinator, Queue::default());
        host.start(&mut dom);
        (dom, host)
    }

    #[test]
    fn mutations_request_one_frame() {
        let (mut dom, mut host) = host();
        let body = dom.body().unwrap();
        let added = dom.append_markup(body, "<div/><div/>").unwrap();
        for node in &added {
            dom.set_computed(*node, "color", BLUE).unwrap();
        }
        let changes = dom.take_changes();
        host.mutations(&dom, changes);
        assert_eq!(host.scheduler().frames, 1);

        let report = host.frame(&mut dom);
        assert_eq!(report.paint.overrides, 2);
        assert_eq!(host.scheduler().frames, 1);
        assert!(!host.coordinator().is_flush_scheduled());
    }

    #[test]
    fn leave_schedules_settle_timer() {
        let (mut dom, mut host) = host();
        let body = dom.body().unwrap();
        let chip = dom.append_element(body, "span").unwrap();
        dom.set_style(&chip, "background-color", "#8B5CF6", Priority::Important)
            .unwrap();
        dom.take_changes();

        host.pointer(&mut dom, PointerKind::Leave, Some(chip));
        assert_eq!(
            host.scheduler().timers,
            vec![(Duration::from_millis(60), Task::ScrubAround(chip))]
        );
    }

    #[test]
    fn navigation_schedules_immediate_refresh() {
        let (mut dom, mut host) = host();
        host.navigated();
        assert_eq!(
            host.scheduler().timers,
            vec![(Duration::ZERO, Task::RefreshActive)]
        );
        host.timer(&mut dom, Task::RefreshActive);
        assert_eq!(dom.pending_changes(), 0);
        assert_eq!(host.scheduler().frames, 0);
    }
}
