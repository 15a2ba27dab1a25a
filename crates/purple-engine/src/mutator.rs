#![forbid(unsafe_code)]

//! Style Mutator: the only place inline overrides are written or removed.
//!
//! Failures from the backend are logged and swallowed; a rejected write
//! simply leaves the page's own styling in place.

use purple_core::parse_css_color;
use purple_dom::{Dom, Priority};
use tracing::{debug, trace};

/// Whether an inline value already says `wanted`.
///
/// CSSOM serializes `#8B5CF6` as `rgb(139, 92, 246)`, so opaque colors
/// compare by channel. Translucent colors only match textually.
fn same_value(current: &str, wanted: &str) -> bool {
    if current.eq_ignore_ascii_case(wanted) {
        return true;
    }
    let opaque = |value: &str| {
        let value = value.trim();
        let rgba = value
            .get(..4)
            .is_some_and(|head| head.eq_ignore_ascii_case("rgba"));
        let hex_alpha = value.starts_with('#') && matches!(value.len(), 5 | 9);
        !(rgba || hex_alpha || value.contains('/'))
    };
    opaque(current)
        && opaque(wanted)
        && parse_css_color(current).is_some_and(|rgb| parse_css_color(wanted) == Some(rgb))
}

/// SVG paint channels carried as presentation attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SvgPaint {
    Fill,
    Stroke,
}

impl SvgPaint {
    pub const ALL: [Self; 2] = [Self::Fill, Self::Stroke];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Stroke => "stroke",
        }
    }
}

/// Write-counting wrapper over a [`Dom`].
pub struct Mutator<'d, D: Dom> {
    dom: &'d mut D,
    writes: usize,
}

impl<'d, D: Dom> Mutator<'d, D> {
    pub fn new(dom: &'d mut D) -> Self {
        Self { dom, writes: 0 }
    }

    /// Read access to the wrapped document.
    #[must_use]
    pub fn dom(&self) -> &D {
        self.dom
    }

    /// Writes and removals that reached the document.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// Set `property: value !important` inline.
    ///
    /// Returns `false` without writing when the same important value is
    /// already present.
    pub fn force(&mut self, node: &D::Node, property: &str, value: &str) -> bool {
        self.set(node, property, value, Priority::Important)
    }

    /// Set an inline declaration with explicit priority.
    pub fn set(&mut self, node: &D::Node, property: &str, value: &str, priority: Priority) -> bool {
        if let Some(existing) = self.dom.inline_style(node, property)
            && existing.priority == priority
            && same_value(&existing.value, value)
        {
            return false;
        }
        match self.dom.set_style(node, property, value, priority) {
            Ok(()) => {
                self.writes += 1;
                trace!(property, value, "override");
                true
            }
            Err(err) => {
                debug!(%err, property, "override rejected");
                false
            }
        }
    }

    /// Remove an inline declaration so page rules apply again.
    pub fn clear(&mut self, node: &D::Node, property: &str) -> bool {
        match self.dom.remove_style(node, property) {
            Ok(removed) => {
                if removed {
                    self.writes += 1;
                }
                removed
            }
            Err(err) => {
                debug!(%err, property, "clear rejected");
                false
            }
        }
    }

    /// Effective SVG paint: the presentation attribute when present,
    /// otherwise the computed style.
    #[must_use]
    pub fn svg_paint(&self, node: &D::Node, which: SvgPaint) -> Option<String> {
        self.dom
            .attribute(node, which.as_str())
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.dom.computed_style(node, which.as_str()))
    }

    /// Write the presentation attribute for `which`.
    pub fn set_svg_paint(&mut self, node: &D::Node, which: SvgPaint, value: &str) -> bool {
        self.set_attribute(node, which.as_str(), value)
    }

    /// Set an attribute unless it already holds `value`.
    pub fn set_attribute(&mut self, node: &D::Node, name: &str, value: &str) -> bool {
        if self
            .dom
            .attribute(node, name)
            .is_some_and(|current| current.eq_ignore_ascii_case(value))
        {
            return false;
        }
        match self.dom.set_attribute(node, name, value) {
            Ok(()) => {
                self.writes += 1;
                trace!(attribute = name, value, "attribute");
                true
            }
            Err(err) => {
                debug!(%err, attribute = name, "attribute rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use purple_dom::MemoryDom;

    fn dom_with_path() -> (MemoryDom, purple_dom::NodeId) {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        dom.append_markup(body, r##"<svg><path fill="#1d9bf0"/></svg>"##)
            .unwrap();
        let path = dom.query_selector(None, "path").unwrap();
        (dom, path)
    }

    #[test]
    fn force_skips_identical_important_value() {
        let (mut dom, path) = dom_with_path();
        let mut m = Mutator::new(&mut dom);
        assert!(m.force(&path, "color", "#8B5CF6"));
        assert!(!m.force(&path, "color", "#8b5cf6"));
        assert!(m.force(&path, "color", "red"));
        assert_eq!(m.writes(), 2);
    }

    #[test]
    fn force_skips_the_same_color_in_another_notation() {
        let (mut dom, path) = dom_with_path();
        dom.set_style(&path, "color", "rgb(139, 92, 246)", Priority::Important)
            .unwrap();
        let mut m = Mutator::new(&mut dom);
        assert!(!m.force(&path, "color", "#8B5CF6"));
        assert_eq!(m.writes(), 0);
        assert!(m.force(&path, "color", "rgba(139, 92, 246, 0.5)"));
        assert!(m.force(&path, "color", "#8B5CF6"));
    }

    #[test]
    fn normal_priority_is_upgraded_by_force() {
        let (mut dom, path) = dom_with_path();
        let mut m = Mutator::new(&mut dom);
        assert!(m.set(&path, "width", "24px", Priority::Normal));
        assert!(!m.set(&path, "width", "24px", Priority::Normal));
        assert!(m.force(&path, "width", "24px"));
    }

    #[test]
    fn clear_counts_only_real_removals() {
        let (mut dom, path) = dom_with_path();
        let mut m = Mutator::new(&mut dom);
        assert!(!m.clear(&path, "color"));
        m.force(&path, "color", "red");
        assert!(m.clear(&path, "color"));
        assert_eq!(m.writes(), 2);
        assert_eq!(dom.inline_style(&path, "color"), None);
    }

    #[test]
    fn svg_paint_prefers_attribute() {
        let (mut dom, path) = dom_with_path();
        dom.set_computed(path, "stroke", "rgb(29, 155, 240)").unwrap();
        let mut m = Mutator::new(&mut dom);
        assert_eq!(m.svg_paint(&path, SvgPaint::Fill).as_deref(), Some("#1d9bf0"));
        assert_eq!(
            m.svg_paint(&path, SvgPaint::Stroke).as_deref(),
            Some("rgb(29, 155, 240)")
        );
        assert!(m.set_svg_paint(&path, SvgPaint::Fill, "#8B5CF6"));
        assert!(!m.set_svg_paint(&path, SvgPaint::Fill, "#8b5cf6"));
        assert_eq!(m.svg_paint(&path, SvgPaint::Fill).as_deref(), Some("#8B5CF6"));
    }

    #[test]
    fn rejected_writes_are_not_counted() {
        let (_, foreign) = dom_with_path();
        let mut dom = MemoryDom::new();
        let mut m = Mutator::new(&mut dom);
        assert!(!m.force(&foreign, "color", "red"));
        assert!(!m.set_svg_paint(&foreign, SvgPaint::Fill, "red"));
        assert!(!m.clear(&foreign, "color"));
        assert_eq!(m.writes(), 0);
    }
}
