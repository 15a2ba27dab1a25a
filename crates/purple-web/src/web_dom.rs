#![forbid(unsafe_code)]

//! [`Dom`] over the live document through `web-sys`.

use std::cell::Cell;

use js_sys::{Array, WeakMap};
use purple_dom::{Change, Dom, DomError, InlineDeclaration, NodeKey, Priority};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    CssStyleDeclaration, Document, Element, HtmlElement, MutationObserver, MutationRecord,
    NodeList, SvgElement, Window,
};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

pub(crate) fn js_error(value: JsValue) -> DomError {
    DomError::Js(format!("{value:?}"))
}

fn elements(list: &NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Convert a batch of `MutationRecord`s into engine change records.
///
/// Records whose target is not an element (text, document) are dropped.
#[must_use]
pub fn changes_from_records(records: &Array) -> Vec<Change<Element>> {
    records
        .iter()
        .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
        .filter_map(|record| {
            let target = record.target()?.dyn_into::<Element>().ok()?;
            match record.type_().as_str() {
                "childList" => Some(Change::Children {
                    target,
                    added: elements(&record.added_nodes()),
                }),
                "attributes" => Some(Change::Attribute {
                    target,
                    name: record.attribute_name()?,
                }),
                _ => None,
            }
        })
        .collect()
}

/// The page's document.
pub struct WebDom {
    window: Window,
    document: Document,
    keys: WeakMap,
    next_key: Cell<u64>,
    observer: Option<MutationObserver>,
}

impl WebDom {
    /// Bind to the global window's document.
    pub fn new() -> Result<Self, DomError> {
        let window = web_sys::window().ok_or_else(|| DomError::Js("no window".to_owned()))?;
        let document = window
            .document()
            .ok_or_else(|| DomError::Js("no document".to_owned()))?;
        Ok(Self {
            window,
            document,
            keys: WeakMap::new(),
            next_key: Cell::new(0),
            observer: None,
        })
    }

    #[must_use]
    pub fn window(&self) -> &Window {
        &self.window
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Route [`Dom::take_changes`] through `observer.takeRecords()`.
    pub fn attach_observer(&mut self, observer: MutationObserver) {
        self.observer = Some(observer);
    }

    fn inline_styles(node: &Element) -> Option<CssStyleDeclaration> {
        if let Some(html) = node.dyn_ref::<HtmlElement>() {
            return Some(html.style());
        }
        node.dyn_ref::<SvgElement>().map(SvgElement::style)
    }

    fn writable_styles(node: &Element) -> Result<CssStyleDeclaration, DomError> {
        Self::inline_styles(node).ok_or(DomError::MissingNode)
    }
}

impl Dom for WebDom {
    type Node = Element;

    fn document_element(&self) -> Option<Element> {
        self.document.document_element()
    }

    fn head(&self) -> Option<Element> {
        self.document.head().map(Element::from)
    }

    fn body(&self) -> Option<Element> {
        self.document.body().map(Element::from)
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn descendants(&self, node: &Element) -> Vec<Element> {
        node.query_selector_all("*")
            .map(|list| elements(&list))
            .unwrap_or_default()
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn node_key(&self, node: &Element) -> NodeKey {
        if let Some(key) = self.keys.get(node).as_f64() {
            return NodeKey(key as u64);
        }
        let key = self.next_key.get() + 1;
        self.next_key.set(key);
        self.keys.set(node, &JsValue::from_f64(key as f64));
        NodeKey(key)
    }

    fn local_name(&self, node: &Element) -> String {
        node.local_name().to_ascii_lowercase()
    }

    fn is_svg(&self, node: &Element) -> bool {
        node.namespace_uri().as_deref() == Some(SVG_NS)
    }

    fn matches(&self, node: &Element, selector: &str) -> bool {
        node.matches(selector).unwrap_or(false)
    }

    fn closest(&self, node: &Element, selector: &str) -> Option<Element> {
        node.closest(selector).ok().flatten()
    }

    fn query_selector(&self, scope: Option<&Element>, selector: &str) -> Option<Element> {
        match scope {
            Some(scope) => scope.query_selector(selector),
            None => self.document.query_selector(selector),
        }
        .ok()
        .flatten()
    }

    fn query_selector_all(&self, scope: Option<&Element>, selector: &str) -> Vec<Element> {
        match scope {
            Some(scope) => scope.query_selector_all(selector),
            None => self.document.query_selector_all(selector),
        }
        .map(|list| elements(&list))
        .unwrap_or_default()
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&mut self, node: &Element, name: &str, value: &str) -> Result<(), DomError> {
        node.set_attribute(name, value).map_err(js_error)
    }

    fn computed_style(&self, node: &Element, property: &str) -> Option<String> {
        let style = self.window.get_computed_style(node).ok().flatten()?;
        style
            .get_property_value(property)
            .ok()
            .filter(|value| !value.is_empty())
    }

    fn inline_style(&self, node: &Element, property: &str) -> Option<InlineDeclaration> {
        let style = Self::inline_styles(node)?;
        let value = style
            .get_property_value(property)
            .ok()
            .filter(|value| !value.is_empty())?;
        let priority = match style.get_property_priority(property).as_str() {
            "important" => Priority::Important,
            _ => Priority::Normal,
        };
        Some(InlineDeclaration { value, priority })
    }

    fn set_style(
        &mut self,
        node: &Element,
        property: &str,
        value: &str,
        priority: Priority,
    ) -> Result<(), DomError> {
        Self::writable_styles(node)?
            .set_property_with_priority(property, value, priority.as_css())
            .map_err(js_error)
    }

    fn remove_style(&mut self, node: &Element, property: &str) -> Result<bool, DomError> {
        let style = Self::writable_styles(node)?;
        // removeProperty returns "" for a shorthand whose longhands disagree.
        let before = style.css_text();
        style.remove_property(property).map_err(js_error)?;
        Ok(style.css_text() != before)
    }

    fn client_size(&self, node: &Element) -> (f64, f64) {
        (f64::from(node.client_width()), f64::from(node.client_height()))
    }

    fn create_element(&mut self, name: &str) -> Result<Element, DomError> {
        self.document.create_element(name).map_err(js_error)
    }

    fn insert_before(
        &mut self,
        parent: &Element,
        child: &Element,
        reference: Option<&Element>,
    ) -> Result<(), DomError> {
        parent
            .insert_before(child, reference.map(|r| &**r))
            .map(drop)
            .map_err(js_error)
    }

    fn remove(&mut self, node: &Element) -> Result<(), DomError> {
        node.remove();
        Ok(())
    }

    fn set_text_content(&mut self, node: &Element, text: &str) -> Result<(), DomError> {
        node.set_text_content(Some(text));
        Ok(())
    }

    fn set_inner_html(&mut self, node: &Element, markup: &str) -> Result<(), DomError> {
        node.set_inner_html(markup);
        Ok(())
    }

    fn title(&self) -> String {
        self.document.title()
    }

    fn set_title(&mut self, title: &str) -> Result<(), DomError> {
        self.document.set_title(title);
        Ok(())
    }

    fn take_changes(&mut self) -> Vec<Change<Element>> {
        self.observer
            .as_ref()
            .map(|observer| changes_from_records(&observer.take_records()))
            .unwrap_or_default()
    }
}
