//! Handle -> live node mapping for one context.

use std::collections::HashMap;

use js::NodeKey;

use crate::error::DomError;

/// Maps caller-chosen handles to live values and enforces uniqueness.
///
/// Unregistering is idempotent: the scripting side's collector may report a
/// handle after the native side already dropped it, or report it twice.
#[derive(Debug)]
pub struct IdentifierRegistry<T> {
    entries: HashMap<NodeKey, T>,
}

impl<T> IdentifierRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Register `value` under `id`.
    ///
    /// # Errors
    /// Returns `DuplicateIdentifier` when `id` is already live; the existing
    /// mapping is left untouched.
    pub fn register(&mut self, id: NodeKey, value: T) -> Result<(), DomError> {
        if self.entries.contains_key(&id) {
            return Err(DomError::DuplicateIdentifier(id));
        }
        self.entries.insert(id, value);
        Ok(())
    }

    /// Insert a mapping the owner knows to be fresh (context bootstrap).
    pub(crate) fn seed(&mut self, id: NodeKey, value: T) {
        self.entries.insert(id, value);
    }

    /// Resolve `id`, `None` if it was never registered or has been disposed.
    #[inline]
    pub fn lookup(&self, id: NodeKey) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Remove the mapping for `id`. Absent ids are a no-op.
    pub fn unregister(&mut self, id: NodeKey) -> Option<T> {
        self.entries.remove(&id)
    }

    /// Whether `id` currently resolves.
    #[inline]
    pub fn contains(&self, id: NodeKey) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of live handles.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handle is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live handles in ascending order.
    pub fn handles(&self) -> Vec<NodeKey> {
        let mut handles: Vec<NodeKey> = self.entries.keys().copied().collect();
        handles.sort_unstable();
        handles
    }
}

impl<T> Default for IdentifierRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
