#![forbid(unsafe_code)]

use js_sys::{Function, Reflect};
use purple_dom::AssetResolver;
use wasm_bindgen::{JsCast, JsValue};

/// Resolves packaged assets with `chrome.runtime.getURL`.
///
/// Outside an extension context the logical path is returned unchanged.
#[derive(Debug, Clone)]
pub struct ChromeAssets {
    runtime: JsValue,
    get_url: Option<Function>,
}

impl ChromeAssets {
    #[must_use]
    pub fn new() -> Self {
        let runtime = Reflect::get(&js_sys::global(), &"chrome".into())
            .and_then(|chrome| Reflect::get(&chrome, &"runtime".into()))
            .unwrap_or(JsValue::UNDEFINED);
        let get_url = Reflect::get(&runtime, &"getURL".into())
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok());
        Self { runtime, get_url }
    }

    /// Whether `chrome.runtime.getURL` is reachable.
    #[must_use]
    pub fn is_extension(&self) -> bool {
        self.get_url.is_some()
    }
}

impl Default for ChromeAssets {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetResolver for ChromeAssets {
    fn resolve(&self, path: &str) -> String {
        self.get_url
            .as_ref()
            .and_then(|f| f.call1(&self.runtime, &JsValue::from_str(path)).ok())
            .and_then(|url| url.as_string())
            .unwrap_or_else(|| path.to_owned())
    }
}
