#![forbid(unsafe_code)]

//! [`ThemeConfig`] resolved into the joined selectors the DOM consumes.

use purple_core::{Palette, ThemeConfig, selector_list};

/// Immutable, pre-joined view of a [`ThemeConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub palette: Palette,
    /// Exclusion list joined with `", "`; empty disables exclusion.
    pub excluded: String,
    pub background_sensitive: String,
    pub action_bar: String,
    pub header_button: String,
    pub identity: String,
    pub active_tab: String,
    pub logo_candidates: Vec<String>,
    pub observed_attributes: Vec<String>,
}

impl Theme {
    #[must_use]
    pub fn new(config: &ThemeConfig) -> Self {
        let selectors = &config.selectors;
        Self {
            palette: config.palette.clone(),
            excluded: selector_list(&selectors.excluded),
            background_sensitive: selector_list(&selectors.background_sensitive),
            action_bar: selectors.action_bar.clone(),
            header_button: selectors.header_button.clone(),
            identity: selectors.identity.clone(),
            active_tab: selector_list(&selectors.active_tab),
            logo_candidates: selectors.logo_candidates.clone(),
            observed_attributes: config.observed_attributes.clone(),
        }
    }

    #[must_use]
    pub fn observes_attribute(&self, name: &str) -> bool {
        self.observed_attributes.iter().any(|attr| attr == name)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(&ThemeConfig::default())
    }
}

impl From<&ThemeConfig> for Theme {
    fn from(config: &ThemeConfig) -> Self {
        Self::new(config)
    }
}

/// `dom.matches` that treats an empty selector as matching nothing.
pub(crate) fn matches_any<D: purple_dom::Dom>(dom: &D, node: &D::Node, selector: &str) -> bool {
    !selector.is_empty() && dom.matches(node, selector)
}

/// `dom.closest` that treats an empty selector as matching nothing.
pub(crate) fn closest_any<D: purple_dom::Dom>(
    dom: &D,
    node: &D::Node,
    selector: &str,
) -> Option<D::Node> {
    if selector.is_empty() {
        return None;
    }
    dom.closest(node, selector)
}
