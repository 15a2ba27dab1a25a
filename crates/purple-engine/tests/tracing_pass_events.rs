#![forbid(unsafe_code)]

//! The coordinator reports each coalesced pass as one `debug` event inside a
//! `coalesced_pass` span, and never logs above `info` during normal work.
//!
//! Run:
//!   cargo test -p purple-engine --test tracing_pass_events

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use purple_core::ThemeConfig;
use purple_dom::{Dom, MemoryDom, PrefixResolver};
use purple_engine::Coordinator;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: Level,
    message: String,
    fields: HashMap<String, String>,
    span: Option<String>,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let value = format!("{value:?}");
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_owned(), value);
        }
    }
}

#[derive(Clone, Default)]
struct Capture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> Layer<S> for Capture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let span = ctx.event_span(event).map(|s| s.name().to_owned());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
            span,
        });
    }
}

fn run_session(capture: &Capture) {
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, || {
        let mut dom = MemoryDom::new();
        let mut engine = Coordinator::new(&ThemeConfig::default(), PrefixResolver::default());
        engine.start(&mut dom);

        let body = dom.body().unwrap();
        let added = dom.append_markup(body, "<div><span/></div>").unwrap();
        dom.set_computed(added[0], "color", "rgb(29, 155, 240)").unwrap();
        let changes = dom.take_changes();
        engine.observe_all(&dom, changes);
        engine.take_wakeups();
        engine.flush(&mut dom);
        engine.tick(&mut dom);
    });
}

#[test]
fn each_pass_emits_one_debug_event_in_its_span() {
    let capture = Capture::default();
    run_session(&capture);
    let events = capture.events.lock().unwrap().clone();

    let passes: Vec<&CapturedEvent> = events
        .iter()
        .filter(|e| e.message == "coalesced pass")
        .collect();
    assert_eq!(passes.len(), 1);
    let pass = passes[0];
    assert_eq!(pass.level, Level::DEBUG);
    assert_eq!(pass.span.as_deref(), Some("coalesced_pass"));
    assert_eq!(pass.fields.get("nodes").map(String::as_str), Some("1"));
    assert_eq!(pass.fields.get("visited").map(String::as_str), Some("2"));
    assert_eq!(pass.fields.get("overrides").map(String::as_str), Some("1"));
    assert!(pass.fields.contains_key("elapsed_us"));
}

#[test]
fn startup_is_announced_once_at_info() {
    let capture = Capture::default();
    run_session(&capture);
    let events = capture.events.lock().unwrap().clone();

    let started: Vec<&CapturedEvent> = events
        .iter()
        .filter(|e| e.message == "purple engine started")
        .collect();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].level, Level::INFO);
    assert!(
        events
            .iter()
            .all(|e| e.level != Level::WARN && e.level != Level::ERROR),
        "{events:#?}"
    );
}
