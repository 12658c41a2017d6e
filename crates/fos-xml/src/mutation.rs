//! Tree mutation operations
//!
//! Every operation here takes the store lock once, validates the request
//! against the XML structure rules, performs the engine call and then
//! sweeps the owner edges of the moved subtree. Validation happens before
//! any engine call, so a returned error means nothing changed.
//!
//! The sweep only visits records that currently have a proxy. Records
//! without one get their owner from [`registry::owner_for`] when they are
//! first resolved.

use fos_xmltree::{NodeId, NodeKind};

use crate::node::Owner;
use crate::registry;
use crate::store::Tree;
use crate::{Node, Store, StructuralError, XmlResult};

/// Where a node is being linked
#[derive(Debug, Clone, Copy)]
enum Position {
    /// Last child (or last attribute) of the node
    LastChildOf(NodeId),
    After(NodeId),
    Before(NodeId),
}

impl Node {
    /// Append `child` as the last child of this node
    ///
    /// An attribute is appended to the attribute list instead; an existing
    /// attribute with the same name is unlinked. `child` is first unlinked
    /// from wherever it is, and afterwards belongs to this node's tree.
    pub fn link(&self, child: &Node) -> XmlResult<()> {
        link_at(self, child, Position::LastChildOf(self.handle()))
    }

    /// Insert `node` as the next sibling of this node
    pub fn link_next(&self, node: &Node) -> XmlResult<()> {
        link_at(self, node, Position::After(self.handle()))
    }

    /// Insert `node` as the previous sibling of this node
    pub fn link_prev(&self, node: &Node) -> XmlResult<()> {
        link_at(self, node, Position::Before(self.handle()))
    }

    /// Detach this node from its parent and siblings
    ///
    /// The node becomes self-owning and keeps its own subtree. Unlinking a
    /// node that has no parent does nothing.
    pub fn unlink(&self) -> XmlResult<()> {
        let store = self.store();
        let mut tree = store.lock();
        if self.record(&tree)?.parent.is_none() {
            return Ok(());
        }
        detach_as_root(store, &mut tree, self.handle())?;
        tracing::debug!(node = %self.handle(), "unlinked");
        Ok(())
    }
}

/// Link `node` at `position`, relative to `anchor`
fn link_at(anchor: &Node, node: &Node, position: Position) -> XmlResult<()> {
    anchor.check_store(node)?;
    let store = anchor.store();
    let mut tree = store.lock();
    anchor.record(&tree)?;
    let is_attribute = node.record(&tree)?.kind() == NodeKind::Attribute;

    let parent = match position {
        Position::LastChildOf(parent) => parent,
        Position::After(target) | Position::Before(target) => {
            let parent = tree.record(target)?.parent.ok_or(StructuralError::NoParent)?;
            check_sibling(&tree, parent, target, node.handle())?;
            parent
        }
    };
    check_child(&tree, parent, node.handle())?;
    let duplicate = duplicate_attribute(&tree, parent, node.handle());

    // The anchor may be the duplicate, so read its owner before any change
    let root = anchor.owner();
    // Resolve the duplicate while it still has an owner to inherit
    let replaced = duplicate.map(|id| registry::resolve(store, &mut tree, id)).transpose()?;

    let child = node.handle();
    tree.detach(child)?;
    match position {
        Position::LastChildOf(parent) if is_attribute => tree.append_attribute(parent, child)?,
        Position::LastChildOf(parent) => tree.append_child(parent, child)?,
        Position::After(target) => tree.insert_after(target, child)?,
        Position::Before(target) => tree.insert_before(target, child)?,
    }
    if let Some(old) = &replaced {
        tree.detach(old.handle())?;
        sweep(&tree, old.handle(), old);
    }

    let moved = sweep(&tree, child, &root);
    tracing::debug!(node = %child, parent = %parent, ?position, moved, "linked");

    drop(tree);
    drop(replaced);
    Ok(())
}

/// Detach `handle` and make its proxy the owner of its subtree
///
/// The proxy is resolved before the detach, while the record still has an
/// owner to inherit.
pub(crate) fn detach_as_root(store: &Store, tree: &mut Tree, handle: NodeId) -> XmlResult<Node> {
    let node = registry::resolve(store, tree, handle)?;
    tree.detach(handle)?;
    sweep(tree, handle, &node);
    Ok(node)
}

/// Point every proxy in the subtree of `top` at `root`
///
/// `root` itself becomes self-owning. Returns the number of proxies visited.
pub(crate) fn sweep(tree: &Tree, top: NodeId, root: &Node) -> usize {
    let mut visited = 0;
    for id in tree.subtree(top) {
        let Some(proxy) = tree.private(id).and_then(|slot| slot.proxy()) else {
            continue;
        };
        let owner = if proxy.ptr_eq(root) {
            Owner::Root
        } else {
            Owner::Node(root.clone())
        };
        let previous = std::mem::replace(&mut *proxy.owner_slot(), owner);
        drop(previous);
        visited += 1;
    }
    tracing::trace!(top = %top, root = %root.handle(), visited, "owners swept");
    visited
}

/// Attribute of `parent` that `child` would replace
fn duplicate_attribute(tree: &Tree, parent: NodeId, child: NodeId) -> Option<NodeId> {
    let record = tree.get(child)?;
    if record.kind() != NodeKind::Attribute {
        return None;
    }
    let name = record.data.name()?;
    Node::attribute_handle(tree, parent, name).filter(|&existing| existing != child)
}

/// Check that `child` may be placed under `parent`
fn check_child(tree: &Tree, parent: NodeId, child: NodeId) -> XmlResult<()> {
    let parent_kind = tree.kind(parent)?;
    let child_kind = tree.kind(child)?;

    if !parent_kind.accepts_children() {
        return Err(StructuralError::CannotHaveChildren { kind: parent_kind }.into());
    }
    let invalid = StructuralError::InvalidChild {
        parent: parent_kind,
        child: child_kind,
    };
    match (parent_kind, child_kind) {
        (_, NodeKind::Document) => return Err(invalid.into()),
        (NodeKind::Document, NodeKind::Text | NodeKind::CData | NodeKind::Attribute) => {
            return Err(invalid.into());
        }
        (NodeKind::Element, NodeKind::Dtd) => return Err(invalid.into()),
        _ => {}
    }
    if tree.is_ancestor_or_self(child, parent) {
        return Err(StructuralError::Cycle.into());
    }

    if parent_kind == NodeKind::Document {
        let existing = find_child(tree, parent, child_kind).filter(|&id| id != child);
        match (child_kind, existing) {
            (NodeKind::Element, Some(_)) => return Err(StructuralError::DuplicateRoot.into()),
            (NodeKind::Dtd, Some(_)) => return Err(StructuralError::DuplicateDtd.into()),
            _ => {}
        }
    }
    Ok(())
}

/// Attributes only sit next to attributes, other nodes next to non-attributes
fn check_sibling(tree: &Tree, parent: NodeId, target: NodeId, node: NodeId) -> XmlResult<()> {
    if target == node {
        return Err(StructuralError::Cycle.into());
    }
    let target_attr = tree.kind(target)? == NodeKind::Attribute;
    let node_kind = tree.kind(node)?;
    if target_attr != (node_kind == NodeKind::Attribute) {
        return Err(StructuralError::InvalidChild {
            parent: tree.kind(parent)?,
            child: node_kind,
        }
        .into());
    }
    Ok(())
}

/// First child of `parent` with the given kind
pub(crate) fn find_child(tree: &Tree, parent: NodeId, kind: NodeKind) -> Option<NodeId> {
    let mut cursor = tree.get(parent)?.first_child;
    while let Some(id) = cursor {
        let record = tree.get(id)?;
        if record.kind() == kind {
            return Some(id);
        }
        cursor = record.next_sibling;
    }
    None
}

/// Which document slot a node is placed in
#[derive(Debug, Clone, Copy)]
pub(crate) enum DocumentSlot {
    Root,
    Dtd,
}

impl DocumentSlot {
    fn kind(self) -> NodeKind {
        match self {
            DocumentSlot::Root => NodeKind::Element,
            DocumentSlot::Dtd => NodeKind::Dtd,
        }
    }
}

/// Put `node` in the root element or DTD slot of `document`
///
/// The previous occupant is unlinked, made self-owning and returned. A new
/// root element is appended; a new DTD goes before the first child.
pub(crate) fn set_document_child(
    document: &Node,
    node: &Node,
    slot: DocumentSlot,
) -> XmlResult<Option<Node>> {
    document.check_store(node)?;
    let store = document.store();
    let mut tree = store.lock();
    let doc = document.record(&tree)?.kind();
    let kind = node.record(&tree)?.kind();
    if kind != slot.kind() {
        return Err(StructuralError::InvalidChild { parent: doc, child: kind }.into());
    }

    let target = node.handle();
    let existing = find_child(&tree, document.handle(), kind);
    if existing == Some(target) {
        return Ok(None);
    }
    if tree.is_ancestor_or_self(target, document.handle()) {
        return Err(StructuralError::Cycle.into());
    }

    let old = existing.map(|id| registry::resolve(store, &mut tree, id)).transpose()?;

    tree.detach(target)?;
    match (&old, slot) {
        (Some(old), _) => tree.replace(old.handle(), target)?,
        (None, DocumentSlot::Dtd) => match tree.record(document.handle())?.first_child {
            Some(first) => tree.insert_before(first, target)?,
            None => tree.append_child(document.handle(), target)?,
        },
        (None, DocumentSlot::Root) => tree.append_child(document.handle(), target)?,
    }
    if let Some(old) = &old {
        sweep(&tree, old.handle(), old);
    }
    let root = document.owner();
    sweep(&tree, target, &root);

    tracing::debug!(
        document = %document.handle(),
        node = %target,
        ?slot,
        replaced = old.is_some(),
        "document slot set"
    );
    Ok(old)
}
