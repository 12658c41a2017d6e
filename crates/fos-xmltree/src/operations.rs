//! Tree Link Operations
//!
//! Core link manipulation: append, insert next to a sibling, replace, detach.
//! These primitives only keep the link structure well formed (no cycles,
//! attribute and child lists kept apart). XML content rules are enforced by
//! the layer above.

use crate::{NodeId, NodeKind, XmlTree};

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Tree operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Record does not exist (never allocated or already freed)
    #[error("node {0} not found")]
    NotFound(NodeId),
    /// Hierarchy error (e.g., inserting an ancestor below its descendant)
    #[error("hierarchy request error: {node} cannot be placed relative to {target}")]
    HierarchyRequest { node: NodeId, target: NodeId },
    /// Invalid node type for this operation
    #[error("invalid node type {kind} for this operation")]
    InvalidNodeType { kind: NodeKind },
    /// Node has no parent to be a sibling in
    #[error("node {0} is not a child")]
    NotAChild(NodeId),
    /// Node must be detached first
    #[error("node {0} is still linked")]
    StillLinked(NodeId),
}

/// Which list of the parent a record sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Children,
    Attributes,
}

impl ListKind {
    fn of(kind: NodeKind) -> Self {
        if kind == NodeKind::Attribute {
            ListKind::Attributes
        } else {
            ListKind::Children
        }
    }
}

impl<P> XmlTree<P> {
    /// Unlink a record from its parent and siblings
    ///
    /// The record keeps its own children and attributes. Detaching an
    /// unlinked record is a no-op.
    pub fn detach(&mut self, id: NodeId) -> TreeResult<()> {
        let record = self.record(id)?;
        let Some(parent) = record.parent else {
            return Ok(());
        };
        let list = ListKind::of(record.kind());
        let (prev, next) = (record.prev_sibling, record.next_sibling);

        match prev {
            Some(prev) => self.record_mut(prev)?.next_sibling = next,
            None => self.set_first(parent, list, next)?,
        }
        match next {
            Some(next) => self.record_mut(next)?.prev_sibling = prev,
            None => self.set_last(parent, list, prev)?,
        }

        self.record_mut(id)?.clear_links();
        Ok(())
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        let parent_kind = self.kind(parent)?;
        let child_kind = self.check_detached(child)?;
        if !parent_kind.accepts_children() {
            return Err(TreeError::InvalidNodeType { kind: parent_kind });
        }
        if child_kind == NodeKind::Attribute {
            return Err(TreeError::InvalidNodeType { kind: child_kind });
        }
        self.check_acyclic(child, parent)?;

        self.push_back(parent, ListKind::Children, child)
    }

    /// Append `attr` to the attribute list of `element`
    pub fn append_attribute(&mut self, element: NodeId, attr: NodeId) -> TreeResult<()> {
        let element_kind = self.kind(element)?;
        let attr_kind = self.check_detached(attr)?;
        if element_kind != NodeKind::Element {
            return Err(TreeError::InvalidNodeType { kind: element_kind });
        }
        if attr_kind != NodeKind::Attribute {
            return Err(TreeError::InvalidNodeType { kind: attr_kind });
        }

        self.push_back(element, ListKind::Attributes, attr)
    }

    /// Insert `node` right after `target`, in the same list
    pub fn insert_after(&mut self, target: NodeId, node: NodeId) -> TreeResult<()> {
        let (parent, list) = self.check_sibling_insert(target, node)?;
        let next = self.record(target)?.next_sibling;

        {
            let record = self.record_mut(node)?;
            record.parent = Some(parent);
            record.prev_sibling = Some(target);
            record.next_sibling = next;
        }
        self.record_mut(target)?.next_sibling = Some(node);
        match next {
            Some(next) => self.record_mut(next)?.prev_sibling = Some(node),
            None => self.set_last(parent, list, Some(node))?,
        }
        Ok(())
    }

    /// Insert `node` right before `target`, in the same list
    pub fn insert_before(&mut self, target: NodeId, node: NodeId) -> TreeResult<()> {
        let (parent, list) = self.check_sibling_insert(target, node)?;
        let prev = self.record(target)?.prev_sibling;

        {
            let record = self.record_mut(node)?;
            record.parent = Some(parent);
            record.prev_sibling = prev;
            record.next_sibling = Some(target);
        }
        self.record_mut(target)?.prev_sibling = Some(node);
        match prev {
            Some(prev) => self.record_mut(prev)?.next_sibling = Some(node),
            None => self.set_first(parent, list, Some(node))?,
        }
        Ok(())
    }

    /// Put `new` in the position of `old`; `old` ends up detached
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> TreeResult<()> {
        if old == new {
            return Ok(());
        }
        self.insert_after(old, new)?;
        self.detach(old)
    }

    fn check_detached(&self, id: NodeId) -> TreeResult<NodeKind> {
        let record = self.record(id)?;
        if record.is_linked() {
            return Err(TreeError::StillLinked(id));
        }
        Ok(record.kind())
    }

    /// `node` must not be `target` or above it
    fn check_acyclic(&self, node: NodeId, target: NodeId) -> TreeResult<()> {
        if self.is_ancestor_or_self(node, target) {
            return Err(TreeError::HierarchyRequest { node, target });
        }
        Ok(())
    }

    fn check_sibling_insert(&self, target: NodeId, node: NodeId) -> TreeResult<(NodeId, ListKind)> {
        let target_record = self.record(target)?;
        let parent = target_record.parent.ok_or(TreeError::NotAChild(target))?;
        let list = ListKind::of(target_record.kind());

        let node_kind = self.check_detached(node)?;
        if ListKind::of(node_kind) != list {
            return Err(TreeError::InvalidNodeType { kind: node_kind });
        }
        self.check_acyclic(node, target)?;
        Ok((parent, list))
    }

    fn push_back(&mut self, parent: NodeId, list: ListKind, child: NodeId) -> TreeResult<()> {
        let last = match list {
            ListKind::Children => self.record(parent)?.last_child,
            ListKind::Attributes => self.record(parent)?.last_attr,
        };

        {
            let record = self.record_mut(child)?;
            record.parent = Some(parent);
            record.prev_sibling = last;
            record.next_sibling = None;
        }
        match last {
            Some(last) => self.record_mut(last)?.next_sibling = Some(child),
            None => self.set_first(parent, list, Some(child))?,
        }
        self.set_last(parent, list, Some(child))
    }

    fn set_first(&mut self, parent: NodeId, list: ListKind, value: Option<NodeId>) -> TreeResult<()> {
        let record = self.record_mut(parent)?;
        match list {
            ListKind::Children => record.first_child = value,
            ListKind::Attributes => record.first_attr = value,
        }
        Ok(())
    }

    fn set_last(&mut self, parent: NodeId, list: ListKind, value: Option<NodeId>) -> TreeResult<()> {
        let record = self.record_mut(parent)?;
        match list {
            ListKind::Children => record.last_child = value,
            ListKind::Attributes => record.last_attr = value,
        }
        Ok(())
    }
}
