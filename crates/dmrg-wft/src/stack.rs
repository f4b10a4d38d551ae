//! LIFO history of transform snapshots for one growth side.

use dmrg_core::Scalar;

use crate::snapshot::TransformSnapshot;

/// Append-only stack of snapshots, popped only when its side is the one
/// being grown into. Backed by a growable array; the top is the last
/// element.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformStack<T: Scalar> {
    items: Vec<TransformSnapshot<T>>,
}

impl<T: Scalar> TransformStack<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, snapshot: TransformSnapshot<T>) {
        self.items.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<TransformSnapshot<T>> {
        self.items.pop()
    }

    pub fn top(&self) -> Option<&TransformSnapshot<T>> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bottom-to-top iteration; re-pushing in this order reproduces the
    /// stack, which is what the checkpoint layer relies on.
    pub fn iter(&self) -> impl Iterator<Item = &TransformSnapshot<T>> {
        self.items.iter()
    }
}

impl<T: Scalar> Default for TransformStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
