#![forbid(unsafe_code)]
#![doc = "Document boundary for the purple engine: the `Dom` trait, change records and asset resolution."]
#![doc = ""]
#![doc = "The engine never talks to a browser directly. Everything it reads or writes goes"]
#![doc = "through [`Dom`], implemented by `purple-web` over `web-sys` and by [`MemoryDom`]"]
#![doc = "for deterministic tests and headless hosts."]

pub mod memory;

use core::fmt;

pub use memory::{MemoryDom, NodeId};

/// Errors reported by a [`Dom`] backend.
///
/// The engine treats every variant as "skip this step"; none is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The host environment rejected the call.
    #[error("host error: {0}")]
    Js(String),
    /// A selector the backend could not parse.
    #[error("invalid selector {0:?}")]
    InvalidSelector(String),
    /// The node is no longer attached to the document.
    #[error("node is detached")]
    Detached,
    /// Markup could not be parsed.
    #[error("markup error: {0}")]
    Markup(String),
    /// A node handle that does not refer to an element.
    #[error("no such node")]
    MissingNode,
}

/// Stable per-node identity used for set membership.
///
/// Keys are only meaningful within one [`Dom`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

/// Inline style priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    #[default]
    Normal,
    /// `!important`: beats any page rule regardless of specificity.
    Important,
}

impl Priority {
    /// The priority string CSSOM expects.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Important => "important",
        }
    }
}

/// One inline declaration as read back from an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDeclaration {
    pub value: String,
    pub priority: Priority,
}

/// A structural or attribute change observed on the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<N> {
    /// Children of `target` were inserted or removed; `added` lists the
    /// inserted element nodes.
    Children { target: N, added: Vec<N> },
    /// Attribute `name` of `target` changed.
    Attribute { target: N, name: String },
}

impl<N> Change<N> {
    #[must_use]
    pub fn target(&self) -> &N {
        match self {
            Self::Children { target, .. } | Self::Attribute { target, .. } => target,
        }
    }
}

/// Read and write access to a live document.
///
/// Reads never fail: a missing node or an invalid selector reads as absent.
/// Writes return [`DomError`] so callers can log and carry on.
pub trait Dom {
    /// Element handle. Cheap to clone.
    type Node: Clone + PartialEq + fmt::Debug;

    /// The `<html>` element.
    fn document_element(&self) -> Option<Self::Node>;

    fn head(&self) -> Option<Self::Node>;

    fn body(&self) -> Option<Self::Node>;

    /// Parent element, `None` for the document element or a detached root.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Element descendants of `node` in document order, excluding `node`.
    fn descendants(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Identity key for deduplication.
    fn node_key(&self, node: &Self::Node) -> NodeKey;

    /// Lowercase local name (`div`, `svg`, `path`).
    fn local_name(&self, node: &Self::Node) -> String;

    /// Whether the element lives in the SVG namespace.
    fn is_svg(&self, node: &Self::Node) -> bool;

    fn matches(&self, node: &Self::Node, selector: &str) -> bool;

    /// `node` or its nearest ancestor matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &str) -> Option<Self::Node>;

    /// First match under `scope` (the whole document when `None`).
    fn query_selector(&self, scope: Option<&Self::Node>, selector: &str) -> Option<Self::Node>;

    /// Every match under `scope` in document order.
    fn query_selector_all(&self, scope: Option<&Self::Node>, selector: &str) -> Vec<Self::Node>;

    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;

    /// Resolved value of `property` after the cascade, e.g. `rgb(29, 155, 240)`.
    fn computed_style(&self, node: &Self::Node, property: &str) -> Option<String>;

    /// The element's own inline declaration for `property`, if any.
    fn inline_style(&self, node: &Self::Node, property: &str) -> Option<InlineDeclaration>;

    fn set_style(
        &mut self,
        node: &Self::Node,
        property: &str,
        value: &str,
        priority: Priority,
    ) -> Result<(), DomError>;

    /// Drop an inline declaration so page rules apply again. Returns
    /// whether a declaration was present.
    fn remove_style(&mut self, node: &Self::Node, property: &str) -> Result<bool, DomError>;

    /// Rendered `(clientWidth, clientHeight)`; zero when not laid out.
    fn client_size(&self, node: &Self::Node) -> (f64, f64);

    fn create_element(&mut self, name: &str) -> Result<Self::Node, DomError>;

    /// Insert `child` under `parent` before `reference`, or last when `None`.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), DomError>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    fn remove(&mut self, node: &Self::Node) -> Result<(), DomError>;

    fn set_text_content(&mut self, node: &Self::Node, text: &str) -> Result<(), DomError>;

    /// Replace the children of `node` with parsed `markup`.
    fn set_inner_html(&mut self, node: &Self::Node, markup: &str) -> Result<(), DomError>;

    fn title(&self) -> String;

    fn set_title(&mut self, title: &str) -> Result<(), DomError>;

    /// Drain changes recorded since the last call without delivering them.
    ///
    /// Backed by `MutationObserver.takeRecords()` in the browser.
    fn take_changes(&mut self) -> Vec<Change<Self::Node>>;
}

/// Maps a logical asset path (`assets/purple-bird-32.png`) to a URL the
/// page can load.
pub trait AssetResolver {
    fn resolve(&self, path: &str) -> String;
}

/// Resolver that prefixes a fixed base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixResolver {
    base: String,
}

impl PrefixResolver {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl AssetResolver for PrefixResolver {
    fn resolve(&self, path: &str) -> String {
        if self.base.is_empty() {
            return path.to_owned();
        }
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_css_strings() {
        assert_eq!(Priority::Important.as_css(), "important");
        assert_eq!(Priority::Normal.as_css(), "");
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn prefix_resolver_joins_paths() {
        let r = PrefixResolver::new("chrome-extension://abc/");
        assert_eq!(
            r.resolve("/assets/purple-bird-16.png"),
            "chrome-extension://abc/assets/purple-bird-16.png"
        );
        assert_eq!(PrefixResolver::default().resolve("assets/a.png"), "assets/a.png");
    }

    #[test]
    fn change_target() {
        let c = Change::Attribute {
            target: 7u32,
            name: "class".to_owned(),
        };
        assert_eq!(*c.target(), 7);
        let c = Change::Children {
            target: 3u32,
            added: vec![4, 5],
        };
        assert_eq!(*c.target(), 3);
    }

    #[test]
    fn dom_error_messages() {
        assert_eq!(
            DomError::InvalidSelector("a[".to_owned()).to_string(),
            "invalid selector \"a[\""
        );
        assert_eq!(DomError::Detached.to_string(), "node is detached");
    }
}
