//! Subtree walker
//!
//! Pre-order traversal that follows the record links directly, without an
//! explicit stack. Attributes of an element are visited right after the
//! element and before its children.

use crate::{NodeId, NodeKind, XmlTree};

/// Pre-order iterator over a subtree
pub struct Subtree<'a, P> {
    tree: &'a XmlTree<P>,
    top: NodeId,
    next: Option<NodeId>,
    attributes: bool,
}

impl<'a, P> Subtree<'a, P> {
    pub(crate) fn new(tree: &'a XmlTree<P>, top: NodeId, attributes: bool) -> Self {
        let next = tree.contains(top).then_some(top);
        Self { tree, top, next, attributes }
    }

    fn advance(&self, current: NodeId) -> Option<NodeId> {
        let record = self.tree.get(current)?;
        if self.attributes {
            if let Some(attr) = record.first_attr {
                return Some(attr);
            }
        }
        if let Some(child) = record.first_child {
            return Some(child);
        }

        // Climb until a sibling is found, never leaving `top`
        let mut node = current;
        loop {
            if node == self.top {
                return None;
            }
            let record = self.tree.get(node)?;
            if let Some(sibling) = record.next_sibling {
                return Some(sibling);
            }
            let parent = record.parent?;
            if record.kind() == NodeKind::Attribute {
                // Done with the attribute list, continue with the children
                if let Some(child) = self.tree.get(parent)?.first_child {
                    return Some(child);
                }
            }
            node = parent;
        }
    }
}

impl<P> Iterator for Subtree<'_, P> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.advance(current);
        Some(current)
    }
}
