#![forbid(unsafe_code)]

//! Inline painting of active navigation items and selected tabs.
//!
//! The `purple-active-nav` fragment covers the common case; this pass
//! backs it up with inline declarations for items whose page rules are
//! more specific than any stylesheet can reach.
//!
//! Painted items carry [`ACTIVE_MARKER`]. Once an item stops matching the
//! active-tab list its overrides are released and the subtree is handed
//! back to the ordinary painter.

use purple_core::{Category, classify_opt};
use purple_dom::Dom;
use tracing::trace;

use crate::mutator::Mutator;
use crate::painter::Painter;
use crate::theme::Theme;

/// Attribute set to `"true"` on items whose subtree carries active overrides.
pub const ACTIVE_MARKER: &str = "data-purple-active";

/// Inline `filter` values that would wash out the accent.
const WASHOUT_FILTERS: [&str; 4] = ["brightness", "invert", "grayscale", "contrast"];

/// Every property this pass forces, `filter` aside.
const ACTIVE_PROPERTIES: [&str; 7] = [
    "color",
    "font-weight",
    "-webkit-text-fill-color",
    "background-color",
    "fill",
    "stroke",
    "border-color",
];

/// Paint every element matching the active-tab list and release items that
/// no longer match. Returns writes made.
pub fn paint_active<D: Dom>(dom: &mut D, theme: &Theme) -> usize {
    let actives = if theme.active_tab.is_empty() {
        Vec::new()
    } else {
        dom.query_selector_all(None, &theme.active_tab)
    };
    let stale: Vec<D::Node> = dom
        .query_selector_all(None, &format!("[{ACTIVE_MARKER}=\"true\"]"))
        .into_iter()
        .filter(|node| !actives.contains(node))
        .collect();

    let mut writes = 0;
    for node in &stale {
        writes += release(dom, node);
        writes += Painter::new(theme).paint_subtree(dom, node).overrides;
    }
    if !stale.is_empty() {
        trace!(released = stale.len(), "stale active items released");
    }

    let accent = theme.palette.accent.as_str();
    let mut m = Mutator::new(dom);
    for active in &actives {
        m.set_attribute(active, ACTIVE_MARKER, "true");
        m.force(active, "color", accent);
        m.force(active, "font-weight", "700");
        m.force(active, "-webkit-text-fill-color", accent);
        m.force(active, "background-color", "transparent");

        for node in m.dom().descendants(active) {
            let color = m.dom().computed_style(&node, "color");
            if classify_opt(color.as_deref()) == Category::Whiteish {
                continue;
            }
            for property in ["color", "fill", "stroke", "-webkit-text-fill-color", "border-color"] {
                m.force(&node, property, accent);
            }
            m.force(&node, "background-color", "transparent");
            let washed_out = m.dom().inline_style(&node, "filter").is_some_and(|decl| {
                WASHOUT_FILTERS.iter().any(|f| decl.value.contains(f))
            });
            if washed_out {
                m.force(&node, "filter", "none");
            }
        }
    }
    writes + m.writes()
}

/// Drop the overrides [`paint_active`] wrote on `item` and below.
fn release<D: Dom>(dom: &mut D, item: &D::Node) -> usize {
    let mut nodes = vec![item.clone()];
    nodes.extend(dom.descendants(item));

    let mut m = Mutator::new(dom);
    for node in &nodes {
        for property in ACTIVE_PROPERTIES {
            m.clear(node, property);
        }
        let reset_filter = m
            .dom()
            .inline_style(node, "filter")
            .is_some_and(|decl| decl.value == "none");
        if reset_filter {
            m.clear(node, "filter");
        }
    }
    m.set_attribute(item, ACTIVE_MARKER, "false");
    m.writes()
}
