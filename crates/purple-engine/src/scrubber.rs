#![forbid(unsafe_code)]

//! Scrubber: removes inline overrides from regions the stylesheet fragments
//! own, so their `!important` rules are not shadowed by a stale inline
//! declaration. Also cleans up background overrides captured mid-hover.

use purple_dom::Dom;
use tracing::trace;

use crate::mutator::Mutator;
use crate::theme::{Theme, closest_any};

/// Inline properties removed from scrubbed regions.
pub const SCRUBBED_PROPERTIES: [&str; 9] = [
    "color",
    "fill",
    "stroke",
    "border-color",
    "background-color",
    "font-weight",
    "filter",
    "text-shadow",
    "-webkit-text-fill-color",
];

/// Clear [`SCRUBBED_PROPERTIES`] from `root` and every descendant.
/// Returns the number of declarations removed.
pub fn scrub_region<D: Dom>(dom: &mut D, root: &D::Node) -> usize {
    let mut nodes = vec![root.clone()];
    nodes.extend(dom.descendants(root));
    let mut mutator = Mutator::new(dom);
    for node in &nodes {
        for property in SCRUBBED_PROPERTIES {
            mutator.clear(node, property);
        }
    }
    mutator.writes()
}

/// Region-aware scrubbing driven by a [`Theme`].
#[derive(Debug, Clone, Copy)]
pub struct Scrubber<'t> {
    theme: &'t Theme,
}

impl<'t> Scrubber<'t> {
    #[must_use]
    pub const fn new(theme: &'t Theme) -> Self {
        Self { theme }
    }

    fn regions(&self) -> [&'t str; 2] {
        [
            self.theme.action_bar.as_str(),
            self.theme.header_button.as_str(),
        ]
    }

    /// Scrub the action-bar or header-button region that encloses `node`.
    pub fn scrub_enclosing<D: Dom>(&self, dom: &mut D, node: &D::Node) -> usize {
        let mut removed = 0;
        for selector in self.regions() {
            if let Some(region) = closest_any(dom, node, selector) {
                removed += scrub_region(dom, &region);
            }
        }
        removed
    }

    /// Scrub every action-bar or header-button region inside `node`.
    pub fn scrub_contained<D: Dom>(&self, dom: &mut D, node: &D::Node) -> usize {
        let mut removed = 0;
        for selector in self.regions() {
            if selector.is_empty() {
                continue;
            }
            for region in dom.query_selector_all(Some(node), selector) {
                removed += scrub_region(dom, &region);
            }
        }
        removed
    }

    /// Clean up after a pointer interaction on `target`.
    ///
    /// Scrubs the enclosing region, then drops any `background-color`
    /// override between `target` and the background-sensitive region root
    /// it sits in.
    pub fn scrub_around<D: Dom>(&self, dom: &mut D, target: &D::Node) -> usize {
        let mut removed = self.scrub_enclosing(dom, target);
        if let Some(region) = closest_any(dom, target, &self.theme.background_sensitive) {
            let mut chain = vec![target.clone()];
            let mut cursor = target.clone();
            while cursor != region {
                match dom.parent(&cursor) {
                    Some(parent) => {
                        chain.push(parent.clone());
                        cursor = parent;
                    }
                    None => break,
                }
            }
            let mut mutator = Mutator::new(dom);
            for node in &chain {
                mutator.clear(node, "background-color");
            }
            removed += mutator.writes();
        }
        if removed > 0 {
            trace!(removed, "scrubbed around pointer target");
        }
        removed
    }
}
