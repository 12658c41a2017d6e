//! Node list iteration

use std::vec;

use crate::Node;

/// Snapshot of a node list, taken under the store lock
///
/// Later mutations do not affect an existing `Nodes`.
#[derive(Debug, Clone)]
pub struct Nodes {
    inner: vec::IntoIter<Node>,
}

impl Nodes {
    pub(crate) fn new(nodes: Vec<Node>) -> Self {
        Self { inner: nodes.into_iter() }
    }
}

impl Iterator for Nodes {
    type Item = Node;

    #[inline]
    fn next(&mut self) -> Option<Node> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Nodes {
    fn next_back(&mut self) -> Option<Node> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for Nodes {}
