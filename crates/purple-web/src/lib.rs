#![forbid(unsafe_code)]

//! Browser content-script host for the purple engine.
//!
//! The portable half ([`host`], [`logging`], [`boot`]) drives a
//! [`purple_engine::Coordinator`] through a [`host::Scheduler`] and is
//! tested natively against `MemoryDom`. On `wasm32` the crate adds a
//! `web-sys` backed [`purple_dom::Dom`] and exports two entry points:
//!
//! - `bootEarly()` at `document_start`: favicons and the splash fragment.
//! - `bootContent(configJson?)` once the document is parsed: the full
//!   engine, wired to a `MutationObserver`, `requestAnimationFrame`,
//!   timers and capture-phase pointer listeners.

pub mod boot;
pub mod host;
pub mod logging;

#[cfg(target_arch = "wasm32")]
mod assets;
#[cfg(target_arch = "wasm32")]
mod wasm;
#[cfg(target_arch = "wasm32")]
pub mod web_dom;

#[cfg(target_arch = "wasm32")]
pub use assets::ChromeAssets;
#[cfg(target_arch = "wasm32")]
pub use web_dom::WebDom;
