//! The resolution stack.
//!
//! Tracks which `(type, variant)` pairs are currently being built by one
//! top-level call. Re-entering a pair that is still on the stack is a
//! cycle; going deeper than the configured limit is an error too.
//!
//! Entries are popped by [`StackGuard`] on drop, so every exit path
//! (success, error or early return) leaves the stack balanced.

use std::cell::RefCell;

use tracing::warn;

use crate::error::{CircularDependencyError, QalibError, Result};
use crate::key::VariantKey;

/// Pairs under construction, outermost first.
#[derive(Debug, Default)]
pub(crate) struct ResolutionStack {
    path: Vec<VariantKey>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &VariantKey) -> bool {
        self.path.contains(key)
    }

    /// Pushes `key`, failing if it is already present or the stack is full.
    ///
    /// # Errors
    /// - [`QalibError::CircularDependency`] with the chain from the first
    ///   occurrence of `key` back to `key`
    /// - [`QalibError::ResolutionTooDeep`] when `max_depth` is reached
    pub fn push(&mut self, key: VariantKey, max_depth: usize) -> Result<()> {
        if let Some(cycle_start) = self.path.iter().position(|k| *k == key) {
            let mut chain: Vec<VariantKey> = self.path[cycle_start..].to_vec();
            chain.push(key);

            warn!(cycle = ?chain, "Circular dependency detected!");

            return Err(QalibError::CircularDependency(CircularDependencyError { chain }));
        }

        if self.path.len() >= max_depth {
            let mut chain = self.path.clone();
            chain.push(key);
            warn!(limit = max_depth, "Resolution depth limit reached");
            return Err(QalibError::ResolutionTooDeep { limit: max_depth, chain });
        }

        self.path.push(key);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<VariantKey> {
        self.path.pop()
    }
}

/// Pops its entry off the stack when dropped.
pub(crate) struct StackGuard<'a> {
    stack: &'a RefCell<ResolutionStack>,
}

impl<'a> StackGuard<'a> {
    /// Pushes `key` and returns a guard that pops it again.
    pub fn enter(
        stack: &'a RefCell<ResolutionStack>,
        key: VariantKey,
        max_depth: usize,
    ) -> Result<Self> {
        stack.borrow_mut().push(key, max_depth)?;
        Ok(Self { stack })
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::TypeKey;

    struct A;
    struct B;
    struct C;

    fn key<T: 'static>() -> VariantKey {
        TypeKey::of::<T>().variant("default")
    }

    #[test]
    fn detect_cycle_with_chain() {
        // A → B → C → A
        let mut stack = ResolutionStack::new();
        stack.push(key::<A>(), 16).unwrap();
        stack.push(key::<B>(), 16).unwrap();
        stack.push(key::<C>(), 16).unwrap();

        match stack.push(key::<A>(), 16).unwrap_err() {
            QalibError::CircularDependency(err) => {
                assert_eq!(err.chain.len(), 4);
                assert_eq!(err.chain.first(), err.chain.last());
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn detect_self_cycle() {
        let mut stack = ResolutionStack::new();
        stack.push(key::<A>(), 16).unwrap();
        assert!(stack.push(key::<A>(), 16).is_err());
    }

    #[test]
    fn same_type_other_variant_is_not_a_cycle() {
        let mut stack = ResolutionStack::new();
        stack.push(TypeKey::of::<A>().variant("outer"), 16).unwrap();
        assert!(stack.push(TypeKey::of::<A>().variant("inner"), 16).is_ok());
    }

    #[test]
    fn depth_limit_enforced() {
        let mut stack = ResolutionStack::new();
        stack.push(key::<A>(), 2).unwrap();
        stack.push(key::<B>(), 2).unwrap();
        match stack.push(key::<C>(), 2).unwrap_err() {
            QalibError::ResolutionTooDeep { limit, chain } => {
                assert_eq!(limit, 2);
                assert_eq!(chain.len(), 3);
            }
            other => panic!("Expected ResolutionTooDeep, got: {other:?}"),
        }
    }

    #[test]
    fn guard_pops_on_every_exit() {
        let stack = RefCell::new(ResolutionStack::new());

        fn failing(stack: &RefCell<ResolutionStack>) -> Result<()> {
            let _guard = StackGuard::enter(stack, key::<A>(), 16)?;
            let _inner = StackGuard::enter(stack, key::<A>(), 16)?;
            Ok(())
        }

        assert!(failing(&stack).is_err());
        assert_eq!(stack.borrow().depth(), 0);

        {
            let _guard = StackGuard::enter(&stack, key::<B>(), 16).unwrap();
            assert!(stack.borrow().contains(&key::<B>()));
        }
        assert_eq!(stack.borrow().depth(), 0);
    }
}
