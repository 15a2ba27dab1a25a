#![forbid(unsafe_code)]

//! Deterministic in-memory [`Dom`] backend.
//!
//! `MemoryDom` models just enough of a browser document for the engine:
//! an element tree, attributes, inline declarations with priority, and a
//! per-element table standing in for the cascade. Computed style resolves
//! inline declaration first, then (for SVG `fill`/`stroke`) the
//! presentation attribute, then the table. Injected `<style>` text is stored
//! but never evaluated.
//!
//! Every mutation is recorded as a [`Change`] the way a `MutationObserver`
//! would report it; hosts drain them with [`Dom::take_changes`].

mod markup;
mod selector;

use std::collections::BTreeMap;

use crate::{Change, Dom, DomError, InlineDeclaration, NodeKey, Priority};
use selector::{SelectorList, SelectorTree};

/// Handle to a [`MemoryDom`] element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
struct NodeData {
    name: String,
    svg: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<(String, String)>,
    inline: BTreeMap<String, InlineDeclaration>,
    computed: BTreeMap<String, String>,
    text: String,
    size: (f64, f64),
}

/// Shorthands the engine writes, expanded the way CSSOM does.
fn longhands(property: &str) -> &'static [&'static str] {
    match property {
        "border-color" => &[
            "border-top-color",
            "border-right-color",
            "border-bottom-color",
            "border-left-color",
        ],
        _ => &[],
    }
}

/// An in-memory document rooted at `<html>`.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<NodeData>,
    root: NodeId,
    title: String,
    changes: Vec<Change<NodeId>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Create a document with `<html>`, `<head>` and `<body>`.
    #[must_use]
    pub fn new() -> Self {
        let mut dom = Self::bare();
        let root = dom.root;
        let head = dom.alloc("head", false);
        dom.attach(root, head, None);
        let body = dom.alloc("body", false);
        dom.attach(root, body, None);
        dom
    }

    /// Create a document whose `<html>` has no children, as seen by scripts
    /// that run before the parser reaches `<head>`.
    #[must_use]
    pub fn bare() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            title: String::new(),
            changes: Vec::new(),
        };
        dom.root = dom.alloc("html", false);
        dom
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, name: &str, svg: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            name: name.to_ascii_lowercase(),
            svg,
            ..NodeData::default()
        });
        id
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::MissingNode)
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, before: Option<usize>) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let siblings = &mut self.nodes[parent.0].children;
        match before {
            Some(idx) => siblings.insert(idx.min(siblings.len()), child),
            None => siblings.push(child),
        }
    }

    fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes[child.0].parent.take()?;
        self.nodes[parent.0].children.retain(|c| *c != child);
        Some(parent)
    }

    fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.data(parent)?
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].name == name)
    }

    fn walk(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(data) = self.data(id) {
            for child in &data.children {
                out.push(*child);
                self.walk(*child, out);
            }
        }
    }

    fn scope_nodes(&self, scope: Option<&NodeId>) -> Vec<NodeId> {
        match scope {
            Some(scope) => self.descendants(scope),
            None => {
                let mut all = vec![self.root];
                self.walk(self.root, &mut all);
                all
            }
        }
    }

    fn select(&self, scope: Option<&NodeId>, selector: &str) -> Vec<NodeId> {
        let Ok(list) = SelectorList::parse(selector) else {
            return Vec::new();
        };
        self.scope_nodes(scope)
            .into_iter()
            .filter(|id| list.matches(self, *id))
            .collect()
    }

    fn build(&mut self, fragment: markup::Fragment) -> NodeId {
        let id = self.alloc(&fragment.name, fragment.svg);
        self.nodes[id.0].attributes = fragment.attributes;
        self.nodes[id.0].text = fragment.text;
        for child in fragment.children {
            let child_id = self.build(child);
            self.attach(id, child_id, None);
        }
        id
    }

    fn record(&mut self, change: Change<NodeId>) {
        self.changes.push(change);
    }

    /// Create `name` under `parent` and return it.
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> Result<NodeId, DomError> {
        let child = self.create_element(name)?;
        self.append_child(&parent, &child)?;
        Ok(child)
    }

    /// Parse XHTML `markup` and append its top-level elements to `parent`.
    pub fn append_markup(&mut self, parent: NodeId, markup: &str) -> Result<Vec<NodeId>, DomError> {
        let parent_svg = self.data(parent).ok_or(DomError::MissingNode)?.svg;
        let fragments = markup::parse(markup, parent_svg)?;
        let added: Vec<NodeId> = fragments.into_iter().map(|f| self.build(f)).collect();
        for id in &added {
            self.attach(parent, *id, None);
        }
        self.record(Change::Children {
            target: parent,
            added: added.clone(),
        });
        Ok(added)
    }

    /// Set the value the cascade would produce for `property`.
    ///
    /// Models page stylesheets, so it is not recorded as a change.
    pub fn set_computed(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        self.data_mut(node)?
            .computed
            .insert(property.to_owned(), value.to_owned());
        Ok(())
    }

    pub fn set_client_size(&mut self, node: NodeId, width: f64, height: f64) -> Result<(), DomError> {
        self.data_mut(node)?.size = (width, height);
        Ok(())
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.data(node).map(|d| d.children.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut text = self.data(node).map(|d| d.text.clone()).unwrap_or_default();
        for child in self.children(node) {
            text.push_str(&self.text_content(child));
        }
        text
    }

    /// All inline declarations of `node`, sorted by property.
    #[must_use]
    pub fn inline_declarations(&self, node: NodeId) -> Vec<(String, InlineDeclaration)> {
        self.data(node)
            .map(|d| d.inline.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Number of changes waiting to be drained.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }
}

impl SelectorTree for MemoryDom {
    type Id = NodeId;

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.data(id)?.parent
    }

    fn name_of(&self, id: NodeId) -> &str {
        self.data(id).map_or("", |d| d.name.as_str())
    }

    fn attribute_of(&self, id: NodeId, name: &str) -> Option<&str> {
        self.data(id)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn document_element(&self) -> Option<NodeId> {
        Some(self.root)
    }

    fn head(&self) -> Option<NodeId> {
        self.child_named(self.root, "head")
    }

    fn body(&self) -> Option<NodeId> {
        self.child_named(self.root, "body")
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.parent_of(*node)
    }

    fn descendants(&self, node: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(*node, &mut out);
        out
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        let mut cursor = Some(*node);
        while let Some(id) = cursor {
            if id == self.root {
                return true;
            }
            cursor = self.parent_of(id);
        }
        false
    }

    fn node_key(&self, node: &NodeId) -> NodeKey {
        NodeKey(node.0 as u64)
    }

    fn local_name(&self, node: &NodeId) -> String {
        self.name_of(*node).to_owned()
    }

    fn is_svg(&self, node: &NodeId) -> bool {
        self.data(*node).is_some_and(|d| d.svg)
    }

    fn matches(&self, node: &NodeId, selector: &str) -> bool {
        SelectorList::parse(selector).is_ok_and(|list| list.matches(self, *node))
    }

    fn closest(&self, node: &NodeId, selector: &str) -> Option<NodeId> {
        let list = SelectorList::parse(selector).ok()?;
        let mut cursor = Some(*node);
        while let Some(id) = cursor {
            if list.matches(self, id) {
                return Some(id);
            }
            cursor = self.parent_of(id);
        }
        None
    }

    fn query_selector(&self, scope: Option<&NodeId>, selector: &str) -> Option<NodeId> {
        self.select(scope, selector).into_iter().next()
    }

    fn query_selector_all(&self, scope: Option<&NodeId>, selector: &str) -> Vec<NodeId> {
        self.select(scope, selector)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.scope_nodes(None)
            .into_iter()
            .find(|n| self.attribute_of(*n, "id") == Some(id))
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.attribute_of(*node, name).map(str::to_owned)
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let data = self.data_mut(*node)?;
        match data.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_owned(),
            None => data.attributes.push((name.to_owned(), value.to_owned())),
        }
        self.record(Change::Attribute {
            target: *node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn computed_style(&self, node: &NodeId, property: &str) -> Option<String> {
        let data = self.data(*node)?;
        if let Some(decl) = data.inline.get(property) {
            return Some(decl.value.clone());
        }
        if data.svg
            && matches!(property, "fill" | "stroke")
            && let Some(value) = self.attribute_of(*node, property)
        {
            return Some(value.to_owned());
        }
        data.computed.get(property).cloned()
    }

    fn inline_style(&self, node: &NodeId, property: &str) -> Option<InlineDeclaration> {
        let data = self.data(*node)?;
        if let Some(decl) = data.inline.get(property) {
            return Some(decl.clone());
        }
        // A shorthand reads back only when every longhand agrees.
        let expanded = longhands(property);
        let first = data.inline.get(*expanded.first()?)?;
        expanded
            .iter()
            .all(|longhand| data.inline.get(*longhand) == Some(first))
            .then(|| first.clone())
    }

    fn set_style(
        &mut self,
        node: &NodeId,
        property: &str,
        value: &str,
        priority: Priority,
    ) -> Result<(), DomError> {
        let data = self.data_mut(*node)?;
        let decl = InlineDeclaration {
            value: value.to_owned(),
            priority,
        };
        let expanded = longhands(property);
        if expanded.is_empty() {
            data.inline.insert(property.to_owned(), decl);
        } else {
            for longhand in expanded {
                data.inline.insert((*longhand).to_owned(), decl.clone());
            }
        }
        self.record(Change::Attribute {
            target: *node,
            name: "style".to_owned(),
        });
        Ok(())
    }

    fn remove_style(&mut self, node: &NodeId, property: &str) -> Result<bool, DomError> {
        let data = self.data_mut(*node)?;
        let mut removed = data.inline.remove(property).is_some();
        for longhand in longhands(property) {
            removed |= data.inline.remove(*longhand).is_some();
        }
        if removed {
            self.record(Change::Attribute {
                target: *node,
                name: "style".to_owned(),
            });
        }
        Ok(removed)
    }

    fn client_size(&self, node: &NodeId) -> (f64, f64) {
        self.data(*node).map_or((0.0, 0.0), |d| d.size)
    }

    fn create_element(&mut self, name: &str) -> Result<NodeId, DomError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomError::Js(format!("invalid element name {name:?}")));
        }
        Ok(self.alloc(name, false))
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        child: &NodeId,
        reference: Option<&NodeId>,
    ) -> Result<(), DomError> {
        if self.data(*parent).is_none() || self.data(*child).is_none() {
            return Err(DomError::MissingNode);
        }
        let mut cursor = Some(*parent);
        while let Some(id) = cursor {
            if id == *child {
                return Err(DomError::Js("cannot insert a node into itself".to_owned()));
            }
            cursor = self.parent_of(id);
        }
        let position = match reference {
            Some(reference) => Some(
                self.nodes[parent.0]
                    .children
                    .iter()
                    .position(|c| c == reference)
                    .ok_or(DomError::MissingNode)?,
            ),
            None => None,
        };
        if let Some(old_parent) = self.detach(*child) {
            self.record(Change::Children {
                target: old_parent,
                added: Vec::new(),
            });
        }
        // Detaching may shift the reference when child was an earlier sibling.
        let position = match reference {
            Some(reference) => self.nodes[parent.0]
                .children
                .iter()
                .position(|c| c == reference)
                .or(position),
            None => None,
        };
        self.attach(*parent, *child, position);
        self.record(Change::Children {
            target: *parent,
            added: vec![*child],
        });
        Ok(())
    }

    fn remove(&mut self, node: &NodeId) -> Result<(), DomError> {
        self.data(*node).ok_or(DomError::MissingNode)?;
        if let Some(parent) = self.detach(*node) {
            self.record(Change::Children {
                target: parent,
                added: Vec::new(),
            });
        }
        Ok(())
    }

    fn set_text_content(&mut self, node: &NodeId, text: &str) -> Result<(), DomError> {
        let children = std::mem::take(&mut self.data_mut(*node)?.children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        self.data_mut(*node)?.text = text.to_owned();
        self.record(Change::Children {
            target: *node,
            added: Vec::new(),
        });
        Ok(())
    }

    fn set_inner_html(&mut self, node: &NodeId, markup: &str) -> Result<(), DomError> {
        let parent_svg = self.data(*node).ok_or(DomError::MissingNode)?.svg;
        let fragments = markup::parse(markup, parent_svg)?;
        let old = std::mem::take(&mut self.data_mut(*node)?.children);
        for child in old {
            self.nodes[child.0].parent = None;
        }
        self.data_mut(*node)?.text.clear();
        let added: Vec<NodeId> = fragments.into_iter().map(|f| self.build(f)).collect();
        for id in &added {
            self.attach(*node, *id, None);
        }
        self.record(Change::Children {
            target: *node,
            added,
        });
        Ok(())
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn set_title(&mut self, title: &str) -> Result<(), DomError> {
        self.title = title.to_owned();
        let target = self.head().unwrap_or(self.root);
        self.record(Change::Children {
            target,
            added: Vec::new(),
        });
        Ok(())
    }

    fn take_changes(&mut self) -> Vec<Change<NodeId>> {
        std::mem::take(&mut self.changes)
    }
}
