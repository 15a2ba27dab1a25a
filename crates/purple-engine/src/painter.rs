#![forbid(unsafe_code)]

//! Subtree Painter.
//!
//! Walks a root and its element descendants in document order and forces
//! the accent onto every color-bearing property whose computed value is
//! blueish. The painter never adds or removes nodes.
//!
//! # Invariants
//!
//! 1. Elements matching the exclusion list are visited but never written.
//! 2. Inside a background-sensitive region `background-color` is left to
//!    the page; other properties are still painted.
//! 3. A second pass over an unchanged subtree performs zero writes: every
//!    value the painter writes classifies as non-blueish.

use core::ops::AddAssign;

use purple_core::{Category, classify_opt};
use purple_dom::Dom;
use tracing::trace;

use crate::mutator::{Mutator, SvgPaint};
use crate::theme::{Theme, closest_any, matches_any};

/// Replaced elements whose pixels come from outside CSS.
const REPLACED_ELEMENTS: [&str; 3] = ["img", "video", "canvas"];

/// Color-bearing properties inspected on every non-replaced element.
pub const COLOR_PROPERTIES: [&str; 8] = [
    "color",
    "background-color",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "outline-color",
    "caret-color",
];

/// Outcome of one painter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintReport {
    /// Elements inspected, including excluded ones.
    pub visited: usize,
    /// Elements skipped by the exclusion list.
    pub skipped: usize,
    /// Inline declarations and presentation attributes written.
    pub overrides: usize,
}

impl AddAssign for PaintReport {
    fn add_assign(&mut self, rhs: Self) {
        self.visited += rhs.visited;
        self.skipped += rhs.skipped;
        self.overrides += rhs.overrides;
    }
}

/// Paints subtrees according to a [`Theme`].
#[derive(Debug, Clone, Copy)]
pub struct Painter<'t> {
    theme: &'t Theme,
}

impl<'t> Painter<'t> {
    #[must_use]
    pub const fn new(theme: &'t Theme) -> Self {
        Self { theme }
    }

    /// Paint `root` and every element below it.
    pub fn paint_subtree<D: Dom>(&self, dom: &mut D, root: &D::Node) -> PaintReport {
        let mut nodes = vec![root.clone()];
        nodes.extend(dom.descendants(root));

        let mut report = PaintReport::default();
        let mut mutator = Mutator::new(dom);
        for node in &nodes {
            report.visited += 1;
            if matches_any(mutator.dom(), node, &self.theme.excluded) {
                report.skipped += 1;
                continue;
            }
            self.paint_element(&mut mutator, node);
        }
        report.overrides = mutator.writes();
        trace!(
            visited = report.visited,
            skipped = report.skipped,
            overrides = report.overrides,
            "subtree painted"
        );
        report
    }

    fn paint_element<D: Dom>(&self, m: &mut Mutator<'_, D>, node: &D::Node) {
        let accent = self.theme.palette.accent.as_str();
        let name = m.dom().local_name(node);

        if !REPLACED_ELEMENTS.contains(&name.as_str()) {
            let keep_background =
                closest_any(m.dom(), node, &self.theme.background_sensitive).is_some();
            for property in COLOR_PROPERTIES {
                if keep_background && property == "background-color" {
                    continue;
                }
                let computed = m.dom().computed_style(node, property);
                if classify_opt(computed.as_deref()) == Category::Blueish {
                    m.force(node, property, accent);
                }
            }
        }

        if m.dom().is_svg(node) {
            if name == "svg" {
                for inner in m.dom().descendants(node) {
                    if !matches_any(m.dom(), &inner, &self.theme.excluded) {
                        self.paint_svg(m, &inner);
                    }
                }
            } else {
                self.paint_svg(m, node);
            }
        }
    }

    fn paint_svg<D: Dom>(&self, m: &mut Mutator<'_, D>, node: &D::Node) {
        let accent = self.theme.palette.accent.as_str();
        for which in SvgPaint::ALL {
            if classify_opt(m.svg_paint(node, which).as_deref()) != Category::Blueish {
                continue;
            }
            m.set_svg_paint(node, which, accent);
            // A stylesheet rule outranks the presentation attribute.
            let computed = m.dom().computed_style(node, which.as_str());
            if classify_opt(computed.as_deref()) == Category::Blueish {
                m.force(node, which.as_str(), accent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use purple_dom::{MemoryDom, NodeId, Priority};

    const BLUE: &str = "rgb(29, 155, 240)";

    fn setup(markup: &str) -> (MemoryDom, NodeId) {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        dom.append_markup(body, markup).unwrap();
        dom.take_changes();
        (dom, body)
    }

    #[test]
    fn blue_background_becomes_accent() {
        let (mut dom, body) = setup(r#"<div id="pill"/>"#);
        let pill = dom.element_by_id("pill").unwrap();
        dom.set_computed(pill, "background-color", BLUE).unwrap();
        let theme = Theme::default();

        let report = Painter::new(&theme).paint_subtree(&mut dom, &body);

        assert_eq!(report.overrides, 1);
        let decl = dom.inline_style(&pill, "background-color").unwrap();
        assert_eq!(decl.value, "#8B5CF6");
        assert_eq!(decl.priority, Priority::Important);
    }

    #[test]
    fn second_pass_writes_nothing() {
        let (mut dom, body) = setup(r##"<div id="a"><span id="b"/><svg><path fill="#1d9bf0" stroke="#1d9bf0"/></svg></div>"##);
        for id in ["a", "b"] {
            let node = dom.element_by_id(id).unwrap();
            dom.set_computed(node, "color", BLUE).unwrap();
            dom.set_computed(node, "border-left-color", BLUE).unwrap();
        }
        let theme = Theme::default();
        let painter = Painter::new(&theme);

        let first = painter.paint_subtree(&mut dom, &body);
        assert!(first.overrides > 0);
        let snapshot: Vec<_> = dom
            .descendants(&body)
            .into_iter()
            .map(|n| dom.inline_declarations(n))
            .collect();

        let second = painter.paint_subtree(&mut dom, &body);
        assert_eq!(second.overrides, 0);
        let after: Vec<_> = dom
            .descendants(&body)
            .into_iter()
            .map(|n| dom.inline_declarations(n))
            .collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn excluded_regions_are_untouched() {
        let (mut dom, body) = setup(
            r#"<article><div role="group"><div role="button" id="like"><span id="count"/></div></div></article><div role="progressbar" id="bar"/>"#,
        );
        for id in ["like", "count", "bar"] {
            let node = dom.element_by_id(id).unwrap();
            dom.set_computed(node, "color", BLUE).unwrap();
        }
        let theme = Theme::default();

        let report = Painter::new(&theme).paint_subtree(&mut dom, &body);

        assert_eq!(report.overrides, 0);
        assert_eq!(report.skipped, 3);
        for id in ["like", "count", "bar"] {
            let node = dom.element_by_id(id).unwrap();
            assert!(dom.inline_declarations(node).is_empty(), "{id}");
        }
    }

    #[test]
    fn background_sensitive_regions_keep_background() {
        let (mut dom, body) = setup(
            r#"<div data-testid="sidebarColumn"><div id="trend"/></div>"#,
        );
        let trend = dom.element_by_id("trend").unwrap();
        dom.set_computed(trend, "background-color", BLUE).unwrap();
        dom.set_computed(trend, "color", BLUE).unwrap();
        let theme = Theme::default();

        Painter::new(&theme).paint_subtree(&mut dom, &body);

        assert_eq!(dom.inline_style(&trend, "background-color"), None);
        assert_eq!(dom.inline_style(&trend, "color").unwrap().value, "#8B5CF6");
    }

    #[test]
    fn replaced_elements_keep_css_colors() {
        let (mut dom, body) = setup(r#"<img id="avatar"/>"#);
        let img = dom.element_by_id("avatar").unwrap();
        dom.set_computed(img, "border-top-color", BLUE).unwrap();
        let theme = Theme::default();

        let report = Painter::new(&theme).paint_subtree(&mut dom, &body);

        assert_eq!(report.overrides, 0);
    }

    #[test]
    fn svg_root_paints_descendant_attributes() {
        let (mut dom, body) =
            setup(r##"<svg><g><path id="p" fill="#1d9bf0" stroke="none"/></g></svg>"##);
        let theme = Theme::default();

        Painter::new(&theme).paint_subtree(&mut dom, &body);

        let path = dom.element_by_id("p").unwrap();
        assert_eq!(dom.attribute(&path, "fill").as_deref(), Some("#8B5CF6"));
        assert_eq!(dom.attribute(&path, "stroke").as_deref(), Some("none"));
        assert_eq!(dom.inline_style(&path, "fill"), None);
    }

    #[test]
    fn svg_leaf_painted_on_its_own() {
        let (mut dom, _) = setup(r#"<svg><circle id="c"/></svg>"#);
        let circle = dom.element_by_id("c").unwrap();
        dom.set_computed(circle, "stroke", BLUE).unwrap();
        let theme = Theme::default();

        let report = Painter::new(&theme).paint_subtree(&mut dom, &circle);

        assert_eq!(report.visited, 1);
        assert_eq!(dom.attribute(&circle, "stroke").as_deref(), Some("#8B5CF6"));
    }

    #[test]
    fn neutral_and_white_values_are_ignored() {
        let (mut dom, body) = setup(r#"<p id="t"/>"#);
        let p = dom.element_by_id("t").unwrap();
        dom.set_computed(p, "color", "rgb(255, 255, 255)").unwrap();
        dom.set_computed(p, "background-color", "rgba(0, 0, 0, 0)").unwrap();
        dom.set_computed(p, "outline-color", "rgb(113, 118, 123)").unwrap();
        let theme = Theme::default();

        let report = Painter::new(&theme).paint_subtree(&mut dom, &body);

        assert_eq!(report.overrides, 0);
    }

    #[test]
    fn reports_accumulate() {
        let mut total = PaintReport::default();
        total += PaintReport {
            visited: 3,
            skipped: 1,
            overrides: 2,
        };
        total += PaintReport {
            visited: 1,
            skipped: 0,
            overrides: 0,
        };
        assert_eq!(
            total,
            PaintReport {
                visited: 4,
                skipped: 1,
                overrides: 2
            }
        );
    }
}
