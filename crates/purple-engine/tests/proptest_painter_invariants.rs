//! Property-based invariants for the painter over generated pages.
//!
//! ## Invariants
//!
//! 1. Idempotence: a second pass over an unchanged subtree writes nothing.
//! 2. Convergence: after one pass no painted property of a non-excluded,
//!    non-replaced element computes to a blueish color.
//! 3. Exclusion: excluded elements end the pass with no inline declarations.
//! 4. The painter never changes the element set.

use proptest::prelude::*;
use purple_core::{Category, classify_opt};
use purple_dom::{Dom, MemoryDom, NodeId};
use purple_engine::painter::COLOR_PROPERTIES;
use purple_engine::{Painter, Theme};

// ── Strategies ────────────────────────────────────────────────────────────

fn arb_color() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("rgb(29, 155, 240)".to_owned()),
        Just("#1d9bf0".to_owned()),
        Just("rgba(29, 161, 242, 0.5)".to_owned()),
        Just("rgb(255, 255, 255)".to_owned()),
        Just("rgb(15, 20, 25)".to_owned()),
        Just("transparent".to_owned()),
        (0u8..=255, 0u8..=255, 0u8..=255).prop_map(|(r, g, b)| format!("rgb({r}, {g}, {b})")),
    ]
}

fn arb_tag() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("div"),
        Just("span"),
        Just("a"),
        Just("img"),
        Just("article"),
        Just("nav"),
    ]
}

#[derive(Debug, Clone)]
struct Spec {
    /// Index of the parent among earlier elements; `None` attaches to body.
    parent: Option<usize>,
    tag: &'static str,
    role: Option<&'static str>,
    colors: Vec<(usize, String)>,
}

fn arb_spec() -> impl Strategy<Value = Spec> {
    (
        prop::option::of(0usize..32),
        arb_tag(),
        prop::option::of(prop_oneof![Just("group"), Just("button"), Just("progressbar")]),
        prop::collection::vec((0..COLOR_PROPERTIES.len(), arb_color()), 0..4),
    )
        .prop_map(|(parent, tag, role, colors)| Spec {
            parent,
            tag,
            role,
            colors,
        })
}

fn build(specs: &[Spec]) -> (MemoryDom, NodeId, Vec<NodeId>) {
    let mut dom = MemoryDom::new();
    let body = dom.body().unwrap();
    let mut nodes: Vec<NodeId> = Vec::new();
    for spec in specs {
        let parent = match spec.parent {
            Some(idx) if !nodes.is_empty() => nodes[idx % nodes.len()],
            _ => body,
        };
        let node = dom.append_element(parent, spec.tag).unwrap();
        if let Some(role) = spec.role {
            dom.set_attribute(&node, "role", role).unwrap();
        }
        for (prop, color) in &spec.colors {
            dom.set_computed(node, COLOR_PROPERTIES[*prop], color).unwrap();
        }
        nodes.push(node);
    }
    dom.take_changes();
    (dom, body, nodes)
}

fn arb_page() -> impl Strategy<Value = Vec<Spec>> {
    prop::collection::vec(arb_spec(), 1..24)
}

proptest! {
    #[test]
    fn second_pass_is_a_noop(specs in arb_page()) {
        let (mut dom, body, _) = build(&specs);
        let theme = Theme::default();
        let painter = Painter::new(&theme);
        painter.paint_subtree(&mut dom, &body);
        let again = painter.paint_subtree(&mut dom, &body);
        prop_assert_eq!(again.overrides, 0);
    }

    #[test]
    fn painted_elements_converge(specs in arb_page()) {
        let (mut dom, body, nodes) = build(&specs);
        let theme = Theme::default();
        Painter::new(&theme).paint_subtree(&mut dom, &body);
        for node in &nodes {
            let excluded = dom.matches(node, &theme.excluded);
            if excluded {
                prop_assert!(dom.inline_declarations(*node).is_empty());
                continue;
            }
            if dom.local_name(node) == "img" {
                continue;
            }
            for property in COLOR_PROPERTIES {
                let value = dom.computed_style(node, property);
                prop_assert_ne!(classify_opt(value.as_deref()), Category::Blueish, "{}", property);
            }
        }
    }

    #[test]
    fn element_set_is_unchanged(specs in arb_page()) {
        let (mut dom, body, _) = build(&specs);
        let before = dom.descendants(&body);
        let theme = Theme::default();
        Painter::new(&theme).paint_subtree(&mut dom, &body);
        prop_assert_eq!(dom.descendants(&body), before);
    }
}
