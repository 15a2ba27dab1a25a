#![forbid(unsafe_code)]

//! Observation suppression.
//!
//! While a [`SuppressionGuard`] is alive the coordinator ignores incoming
//! change records, so the engine's own writes never schedule another pass.
//!
//! # Invariants
//!
//! 1. Guards nest; suppression ends when the outermost guard drops.
//! 2. The depth is restored on every exit path, including unwinding.

use std::cell::Cell;
use std::rc::Rc;

/// Shared, counted suppression flag. Clones observe the same depth.
#[derive(Debug, Clone, Default)]
pub struct Suppressor {
    depth: Rc<Cell<u32>>,
}

impl Suppressor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.depth.get() > 0
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    /// Enter a suppressed scope that lasts until the guard drops.
    #[must_use = "suppression ends when the guard is dropped"]
    pub fn enter(&self) -> SuppressionGuard {
        self.depth.set(self.depth.get() + 1);
        SuppressionGuard {
            depth: Rc::clone(&self.depth),
        }
    }
}

/// RAII guard returned by [`Suppressor::enter`].
#[derive(Debug)]
pub struct SuppressionGuard {
    depth: Rc<Cell<u32>>,
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn guards_nest() {
        let s = Suppressor::new();
        assert!(!s.is_active());
        let outer = s.enter();
        {
            let _inner = s.enter();
            assert_eq!(s.depth(), 2);
        }
        assert!(s.is_active());
        drop(outer);
        assert!(!s.is_active());
    }

    #[test]
    fn clones_share_depth() {
        let s = Suppressor::new();
        let view = s.clone();
        let _guard = s.enter();
        assert!(view.is_active());
    }

    #[test]
    fn released_on_unwind() {
        let s = Suppressor::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = s.enter();
            panic!("pass failed");
        }));
        assert!(result.is_err());
        assert!(!s.is_active());
    }
}
