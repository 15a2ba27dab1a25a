#![forbid(unsafe_code)]

//! Runtime configuration: palette, region selectors and scheduling knobs.
//!
//! Every field has a default matching the live page at the time of writing,
//! so an empty JSON object (or no config at all) yields a working theme.
//! Hosts may override any subset:
//!
//! ```
//! use purple_core::ThemeConfig;
//!
//! let config = ThemeConfig::from_json(r##"{ "palette": { "accent": "#7c3aed" } }"##).unwrap();
//! assert_eq!(config.palette.accent, "#7c3aed");
//! assert_eq!(config.tick_interval_ms, 1000);
//! ```

use serde::{Deserialize, Serialize};

use crate::color::{Category, classify, parse_css_color};

/// Default accent used for every override.
pub const DEFAULT_ACCENT: &str = "#8B5CF6";

/// Attribute names whose changes are worth a re-paint.
pub const DEFAULT_OBSERVED_ATTRIBUTES: [&str; 5] =
    ["class", "title", "aria-selected", "aria-current", "data-testid"];

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Colors written by overrides and stylesheet fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Replacement for every blueish value.
    pub accent: String,
    /// Translucent accent for hover backgrounds.
    pub accent_hover: String,
    /// Accent for disabled controls.
    pub accent_disabled: String,
    /// Neutral icon color restored inside action bars and post headers.
    pub neutral: String,
    /// Text color on filled accent buttons.
    pub on_accent: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            accent: DEFAULT_ACCENT.to_owned(),
            accent_hover: "rgba(139, 92, 246, 0.1)".to_owned(),
            accent_disabled: "rgba(139, 92, 246, 0.5)".to_owned(),
            neutral: "rgb(113, 118, 123)".to_owned(),
            on_accent: "rgb(255, 255, 255)".to_owned(),
        }
    }
}

/// Selector lists describing the regions of the page the engine treats
/// specially. Lists are joined with `", "` before being handed to the DOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSelectors {
    /// Elements the painter never touches.
    pub excluded: Vec<String>,
    /// Regions where background-color is never overridden.
    pub background_sensitive: Vec<String>,
    /// Root of a post's action bar.
    pub action_bar: String,
    /// Buttons in a post header (overflow caret, grok, etc).
    pub header_button: String,
    /// Regions whose arrival means the logo may have been re-rendered.
    pub identity: String,
    /// Active navigation items and selected tabs.
    pub active_tab: Vec<String>,
    /// Logo candidates, tried in order.
    pub logo_candidates: Vec<String>,
}

impl Default for RegionSelectors {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();
        Self {
            excluded: owned(&[
                "[role=\"progressbar\"]",
                "[role=\"progressbar\"] *",
                "[data-testid=\"app-text-transition-container\"]",
                "[data-testid=\"app-text-transition-container\"] *",
                "article [role=\"group\"] [role=\"button\"]",
                "article [role=\"group\"] [role=\"button\"] *",
                "article [role=\"group\"] a[href$=\"/analytics\"]",
                "article [role=\"group\"] a[href$=\"/analytics\"] *",
                "[data-testid=\"caret\"]",
                "[data-testid=\"caret\"] *",
            ]),
            background_sensitive: owned(&[
                "[data-testid=\"sidebarColumn\"]",
                "[data-testid=\"trend\"]",
                "[aria-label=\"Timeline: Trending now\"]",
                "[role=\"menu\"]",
                "[data-testid=\"Dropdown\"]",
                "[data-testid=\"HoverCard\"]",
            ]),
            action_bar: "article [role=\"group\"]".to_owned(),
            header_button: "article [data-testid=\"caret\"]".to_owned(),
            identity: "header, nav, a[href=\"/home\"]".to_owned(),
            active_tab: owned(&[
                "nav a[role=\"link\"][aria-current=\"page\"]",
                "nav a[role=\"link\"][aria-selected=\"true\"]",
                "nav [data-testid^=\"AppTabBar_\"][aria-current=\"page\"]",
                "nav [data-testid^=\"AppTabBar_\"][aria-selected=\"true\"]",
                "[role=\"tab\"][aria-selected=\"true\"]",
                "[data-selected=\"true\"]",
            ]),
            logo_candidates: owned(&[
                "a[aria-label=\"X\"] svg",
                "[data-testid=\"AppTabBar_Logo\"] svg",
                "header a[href=\"/home\"] svg",
                "a[href=\"/home\"][role=\"link\"] svg",
            ]),
        }
    }
}

/// Top-level configuration handed to the engine at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub palette: Palette,
    pub selectors: RegionSelectors,
    /// Attribute allow-list for the change subscription.
    pub observed_attributes: Vec<String>,
    /// Period of the fallback refresh timer.
    pub tick_interval_ms: u64,
    /// Delay before cleaning up after a pointer leaves an element.
    pub hover_settle_ms: u64,
    /// `tracing` filter directive used by the web host.
    pub log_level: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            selectors: RegionSelectors::default(),
            observed_attributes: DEFAULT_OBSERVED_ATTRIBUTES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            tick_interval_ms: 1000,
            hover_settle_ms: 60,
            log_level: "info".to_owned(),
        }
    }
}

impl ThemeConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs that would make the engine fight itself.
    ///
    /// A blueish accent would be re-classified and re-painted on every pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if parse_css_color(&self.palette.accent).is_none() {
            return Err(ConfigError::Invalid(format!(
                "accent {:?} is not an rgb() or hex color",
                self.palette.accent
            )));
        }
        if classify(&self.palette.accent) == Category::Blueish {
            return Err(ConfigError::Invalid(format!(
                "accent {:?} is itself blueish",
                self.palette.accent
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be > 0".to_owned()));
        }
        if self.selectors.logo_candidates.is_empty() {
            return Err(ConfigError::Invalid("logo_candidates must not be empty".to_owned()));
        }
        Ok(())
    }

    #[must_use]
    pub fn observes_attribute(&self, name: &str) -> bool {
        self.observed_attributes.iter().any(|attr| attr == name)
    }
}

/// Join a selector list into one comma-separated selector.
#[must_use]
pub fn selector_list(items: &[String]) -> String {
    items.join(", ")
}
