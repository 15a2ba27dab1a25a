#![forbid(unsafe_code)]

//! Boot-time configuration.

use std::cell::Cell;

use purple_core::ThemeConfig;
use tracing::warn;

/// Resolve the configuration handed to `bootContent`.
///
/// Absent or blank input selects the defaults. Input that fails to parse or
/// validate also selects the defaults and is reported at `warn`.
#[must_use]
pub fn load_config(json: Option<&str>) -> ThemeConfig {
    let Some(json) = json.map(str::trim).filter(|json| !json.is_empty()) else {
        return ThemeConfig::default();
    };
    ThemeConfig::from_json(json).unwrap_or_else(|err| {
        warn!(error = %err, "config rejected, using defaults");
        ThemeConfig::default()
    })
}

/// Milliseconds for a browser timer, clamped to what `setTimeout` accepts.
#[must_use]
pub fn timer_millis(duration: std::time::Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)
}

/// One-shot claim on starting the content engine.
///
/// Claimed when `bootContent` first runs, before any wait for
/// `DOMContentLoaded`, so a second call during loading is turned away too.
#[derive(Debug, Default)]
pub struct BootLatch {
    claimed: Cell<bool>,
}

impl BootLatch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            claimed: Cell::new(false),
        }
    }

    /// Returns `true` for the first caller only.
    pub fn claim(&self) -> bool {
        !self.claimed.replace(true)
    }

    /// Give the claim back after a failed start.
    pub fn release(&self) {
        self.claimed.set(false);
    }

    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.claimed.get()
    }
}
