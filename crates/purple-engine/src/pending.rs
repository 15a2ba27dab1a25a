#![forbid(unsafe_code)]

//! Insertion-ordered, deduplicated set of nodes awaiting a pass.

use purple_dom::NodeKey;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone)]
pub struct PendingSet<N> {
    order: Vec<N>,
    keys: FxHashSet<NodeKey>,
}

impl<N> Default for PendingSet<N> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            keys: FxHashSet::default(),
        }
    }
}

impl<N> PendingSet<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` unless a node with the same key is already pending.
    pub fn insert(&mut self, key: NodeKey, node: N) -> bool {
        if !self.keys.insert(key) {
            return false;
        }
        self.order.push(node);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Snapshot and clear. Nodes come out in first-insertion order.
    pub fn drain(&mut self) -> Vec<N> {
        self.keys.clear();
        std::mem::take(&mut self.order)
    }
}
