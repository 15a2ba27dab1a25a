#![forbid(unsafe_code)]

//! `wasm-bindgen` exports: `bootEarly` and `bootContent`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use js_sys::{Array, Function, Reflect};
use purple_core::{Palette, ThemeConfig};
use purple_dom::Dom;
use purple_engine::{Coordinator, PointerKind, Task, early};
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{AddEventListenerOptions, Element, Event, MutationObserver, MutationObserverInit};
use web_time::Instant;

use crate::assets::ChromeAssets;
use crate::boot::{BootLatch, load_config, timer_millis};
use crate::host::{Host, Scheduler};
use crate::logging;
use crate::web_dom::{WebDom, changes_from_records, js_error};

thread_local! {
    static RUNTIME: RefCell<Option<Rc<RefCell<Runtime>>>> = const { RefCell::new(None) };
    static BOOT: BootLatch = const { BootLatch::new() };
}

fn console(method: &str, message: &str) {
    let global = js_sys::global();
    if let Ok(console) = Reflect::get(&global, &"console".into())
        && let Ok(f) = Reflect::get(&console, &method.into())
        && let Ok(f) = f.dyn_into::<Function>()
    {
        let _ = f.call1(&console, &JsValue::from_str(message));
    }
}

fn console_log(line: &str) {
    console("log", line);
}

fn install_panic_hook() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| console("error", &format!("{info}"))));
    });
}

fn install_logging(directive: &str) {
    if !logging::install(directive, console_log) {
        debug!("subscriber already installed");
    }
}

/// Schedules wakeups on the page's event loop and calls back into the runtime.
struct WebScheduler {
    window: web_sys::Window,
    runtime: Weak<RefCell<Runtime>>,
}

impl WebScheduler {
    fn callback(&self, f: impl FnOnce(&mut Runtime) + 'static) -> JsValue {
        let runtime = self.runtime.clone();
        Closure::once_into_js(move || with_runtime(&runtime, f))
    }
}

impl Scheduler<Element> for WebScheduler {
    fn request_frame(&mut self) {
        let callback = self.callback(Runtime::frame);
        if let Err(err) = self.window.request_animation_frame(callback.unchecked_ref()) {
            debug!(error = %js_error(err), "requestAnimationFrame failed");
        }
    }

    fn schedule(&mut self, delay: Duration, task: Task<Element>) {
        let callback = self.callback(move |runtime| runtime.timer(task));
        if let Err(err) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                timer_millis(delay),
            )
        {
            debug!(error = %js_error(err), "setTimeout failed");
        }
    }
}

fn with_runtime(runtime: &Weak<RefCell<Runtime>>, f: impl FnOnce(&mut Runtime)) {
    let Some(runtime) = runtime.upgrade() else {
        return;
    };
    match runtime.try_borrow_mut() {
        Ok(mut runtime) => f(&mut runtime),
        Err(_) => debug!("runtime busy, callback dropped"),
    };
}

struct Runtime {
    dom: WebDom,
    host: Host<WebDom, WebScheduler>,
}

impl Runtime {
    fn frame(&mut self) {
        self.host.frame(&mut self.dom);
    }

    fn timer(&mut self, task: Task<Element>) {
        self.host.timer(&mut self.dom, task);
    }

    fn mutations(&mut self, records: &Array) {
        self.host.mutations(&self.dom, changes_from_records(records));
    }

    fn tick(&mut self) {
        self.host.tick(&mut self.dom);
    }

    fn pointer(&mut self, kind: PointerKind, event: &Event) {
        let target = event.target().and_then(|t| t.dyn_into::<Element>().ok());
        self.host.pointer(&mut self.dom, kind, target);
    }

    fn navigated(&mut self) {
        self.host.navigated();
    }
}

fn observe(
    runtime: &Rc<RefCell<Runtime>>,
    config: &ThemeConfig,
) -> Result<MutationObserver, JsValue> {
    let weak = Rc::downgrade(runtime);
    let on_records = Closure::<dyn FnMut(Array, MutationObserver)>::new(
        move |records: Array, _observer: MutationObserver| {
            with_runtime(&weak, |runtime| runtime.mutations(&records));
        },
    );
    let observer = MutationObserver::new(on_records.as_ref().unchecked_ref())?;
    on_records.forget();

    let filter: Array = config
        .observed_attributes
        .iter()
        .map(|name| JsValue::from_str(name))
        .collect();
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    init.set_attributes(true);
    init.set_attribute_filter(&filter);

    let root = runtime
        .borrow()
        .dom
        .document_element()
        .ok_or_else(|| JsValue::from_str("document has no root element"))?;
    observer.observe_with_options(&root, &init)?;
    Ok(observer)
}

fn listen(
    runtime: &Rc<RefCell<Runtime>>,
    target: &web_sys::EventTarget,
    event: &str,
    capture: bool,
    mut on_event: impl FnMut(&mut Runtime, &Event) + 'static,
) -> Result<(), JsValue> {
    let weak = Rc::downgrade(runtime);
    let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        with_runtime(&weak, |runtime| on_event(runtime, &event));
    });
    let options = AddEventListenerOptions::new();
    options.set_capture(capture);
    options.set_passive(true);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        closure.as_ref().unchecked_ref(),
        &options,
    )?;
    closure.forget();
    Ok(())
}

fn wire(runtime: &Rc<RefCell<Runtime>>, config: &ThemeConfig) -> Result<(), JsValue> {
    let (window, document) = {
        let rt = runtime.borrow();
        (rt.dom.window().clone(), rt.dom.document().clone())
    };

    let observer = observe(runtime, config)?;
    runtime.borrow_mut().dom.attach_observer(observer);

    for (event, kind) in [
        ("click", PointerKind::Click),
        ("pointerup", PointerKind::Up),
        ("pointerleave", PointerKind::Leave),
    ] {
        listen(runtime, &document, event, true, move |rt, event| {
            rt.pointer(kind, event);
        })?;
    }
    listen(runtime, &window, "popstate", false, |rt, _| rt.navigated())?;

    let weak = Rc::downgrade(runtime);
    let tick = Closure::<dyn FnMut()>::new(move || with_runtime(&weak, Runtime::tick));
    let interval = runtime.borrow().host.coordinator().tick_interval();
    window.set_interval_with_callback_and_timeout_and_arguments_0(
        tick.as_ref().unchecked_ref(),
        timer_millis(interval),
    )?;
    tick.forget();
    Ok(())
}

fn start(config: ThemeConfig) -> Result<(), JsValue> {
    if RUNTIME.with(|slot| slot.borrow().is_some()) {
        warn!("content script already running");
        return Ok(());
    }
    let started = Instant::now();
    let dom = WebDom::new().map_err(|err| JsValue::from_str(&err.to_string()))?;
    let window = dom.window().clone();
    let coordinator = Coordinator::new(&config, ChromeAssets::new());
    let runtime = Rc::new_cyclic(|weak| {
        RefCell::new(Runtime {
            dom,
            host: Host::new(
                coordinator,
                WebScheduler {
                    window,
                    runtime: weak.clone(),
                },
            ),
        })
    });

    {
        let mut rt = runtime.borrow_mut();
        let Runtime { dom, host } = &mut *rt;
        host.start(dom);
    }
    wire(&runtime, &config)?;
    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime));
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "content script running"
    );
    Ok(())
}

/// Early phase, injected at `document_start`: favicons and splash fragment.
#[wasm_bindgen(js_name = bootEarly)]
pub fn boot_early() -> Result<(), JsValue> {
    install_panic_hook();
    install_logging(logging::FALLBACK_DIRECTIVE);
    let mut dom = WebDom::new().map_err(|err| JsValue::from_str(&err.to_string()))?;
    match early::run(&mut dom, &Palette::default(), &ChromeAssets::new()) {
        Ok(report) => debug!(?report, "early boot"),
        Err(err) => warn!(error = %err, "early boot incomplete"),
    }
    Ok(())
}

/// Content phase: start the engine once the document has been parsed.
///
/// `config_json` is an optional JSON `ThemeConfig`; anything invalid falls
/// back to the defaults.
#[wasm_bindgen(js_name = bootContent)]
pub fn boot_content(config_json: Option<String>) -> Result<(), JsValue> {
    install_panic_hook();
    let config = load_config(config_json.as_deref());
    install_logging(&config.log_level);

    if !BOOT.with(BootLatch::claim) {
        warn!("content script already booting");
        return Ok(());
    }

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    if document.ready_state() != "loading" {
        return start(config).inspect_err(|_| BOOT.with(BootLatch::release));
    }

    let ready = Closure::once_into_js(move || {
        if let Err(err) = start(config) {
            BOOT.with(BootLatch::release);
            warn!(error = ?err, "content boot failed");
        }
    });
    let options = AddEventListenerOptions::new();
    options.set_once(true);
    document.add_event_listener_with_callback_and_add_event_listener_options(
        "DOMContentLoaded",
        ready.unchecked_ref(),
        &options,
    )
}

/// Running pass totals as JSON, `null` before `bootContent` has started.
#[wasm_bindgen(js_name = passStats)]
pub fn pass_stats() -> JsValue {
    RUNTIME.with(|slot| {
        let slot = slot.borrow();
        let Some(runtime) = slot.as_ref() else {
            return JsValue::NULL;
        };
        let Ok(runtime) = runtime.try_borrow() else {
            return JsValue::NULL;
        };
        let stats = runtime.host.coordinator().stats();
        let json = serde_json::json!({
            "passes": stats.passes,
            "nodesPainted": stats.nodes_painted,
            "overrides": stats.overrides,
            "scrubbed": stats.scrubbed,
            "lastPassUs": stats.last_pass.as_micros() as u64,
        });
        JsValue::from_str(&json.to_string())
    })
}
