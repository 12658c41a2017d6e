//! Node proxies
//!
//! A [`Node`] mirrors one engine record. Cloning a `Node` clones the handle,
//! not the record; two `Node`s compare equal only if they are the same
//! proxy, and the registry guarantees one proxy per record.
//!
//! Every proxy carries an owner edge. A self-owning proxy (the top of an
//! engine tree) reclaims its whole subtree when it is finalized; any other
//! proxy holds a strong reference to that root, which keeps the root, and
//! therefore the storage, alive for as long as the proxy exists.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fos_xmltree::{NodeData, NodeId, NodeKind, NodeRecord};

use crate::finalize::Finalizer;
use crate::registry::{self, Slot};
use crate::store::Tree;
use crate::{Document, Nodes, Store, StructuralError, XmlError, XmlResult};

/// Who reclaims the subtree a proxy belongs to
pub(crate) enum Owner {
    /// The proxy owns itself
    Root,
    /// The accountable root proxy
    Node(Node),
}

pub(crate) struct NodeInner {
    pub(crate) store: Store,
    pub(crate) handle: NodeId,
    pub(crate) serial: u64,
    /// Only rewritten while the store lock is held
    pub(crate) owner: Mutex<Owner>,
}

impl Drop for NodeInner {
    fn drop(&mut self) {
        let owner = self.owner.get_mut().unwrap_or_else(PoisonError::into_inner);
        let job = Finalizer {
            handle: self.handle,
            serial: self.serial,
            root: matches!(owner, Owner::Root),
        };
        self.store.submit(job);
    }
}

/// Handle to one XML node
#[derive(Clone)]
pub struct Node(pub(crate) Arc<NodeInner>);

impl Node {
    pub(crate) fn new(store: Store, handle: NodeId, serial: u64, owner: Owner) -> Self {
        Node(Arc::new(NodeInner {
            store,
            handle,
            serial,
            owner: Mutex::new(owner),
        }))
    }

    /// Engine handle this proxy mirrors
    #[inline]
    pub fn handle(&self) -> NodeId {
        self.0.handle
    }

    /// Store the node lives in
    #[inline]
    pub fn store(&self) -> &Store {
        &self.0.store
    }

    /// Check if both handles are the same proxy
    #[inline]
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn owner_slot(&self) -> MutexGuard<'_, Owner> {
        self.0.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if this node is accountable for its own subtree
    pub fn is_self_owning(&self) -> bool {
        matches!(*self.owner_slot(), Owner::Root)
    }

    /// The self-owning proxy accountable for this node's storage
    ///
    /// Returns a clone of `self` for a self-owning node.
    pub fn owner(&self) -> Node {
        match &*self.owner_slot() {
            Owner::Root => self.clone(),
            Owner::Node(root) => root.clone(),
        }
    }

    /// Record of this proxy; fails once the storage is gone
    pub(crate) fn record<'t>(&self, tree: &'t Tree) -> XmlResult<&'t NodeRecord<Slot>> {
        let record = tree.get(self.0.handle).ok_or(XmlError::Detached)?;
        if !record.private.is_serial(self.0.serial) {
            return Err(XmlError::Detached);
        }
        Ok(record)
    }

    pub(crate) fn check_store(&self, other: &Node) -> XmlResult<()> {
        if self.0.store.same_store(&other.0.store) {
            Ok(())
        } else {
            Err(XmlError::WrongStore)
        }
    }

    /// Check if the node still has storage behind it
    pub fn is_attached(&self) -> bool {
        let tree = self.0.store.lock();
        self.record(&tree).is_ok()
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Node type
    pub fn kind(&self) -> XmlResult<NodeKind> {
        let tree = self.0.store.lock();
        Ok(self.record(&tree)?.kind())
    }

    pub fn is_element(&self) -> bool {
        self.kind_is(NodeKind::Element)
    }

    pub fn is_attribute(&self) -> bool {
        self.kind_is(NodeKind::Attribute)
    }

    pub fn is_text(&self) -> bool {
        self.kind_is(NodeKind::Text)
    }

    pub fn is_cdata(&self) -> bool {
        self.kind_is(NodeKind::CData)
    }

    pub fn is_comment(&self) -> bool {
        self.kind_is(NodeKind::Comment)
    }

    pub fn is_pi(&self) -> bool {
        self.kind_is(NodeKind::ProcessingInstruction)
    }

    pub fn is_document(&self) -> bool {
        self.kind_is(NodeKind::Document)
    }

    pub fn is_dtd(&self) -> bool {
        self.kind_is(NodeKind::Dtd)
    }

    fn kind_is(&self, kind: NodeKind) -> bool {
        self.kind().is_ok_and(|k| k == kind)
    }

    /// Node name (element, attribute, PI target, DTD name)
    pub fn name(&self) -> XmlResult<Option<String>> {
        let tree = self.0.store.lock();
        Ok(self.record(&tree)?.data.name().map(str::to_string))
    }

    /// Check if this kind of node carries a name
    pub fn has_name(&self) -> XmlResult<bool> {
        self.peek(|_, r| Ok(r.data.name().is_some()))
    }

    /// Rename the node
    ///
    /// A linked attribute cannot take the name of another attribute of the
    /// same element.
    pub fn set_name(&self, name: &str) -> XmlResult<()> {
        let mut tree = self.0.store.lock();
        let record = self.record(&tree)?;
        let kind = record.kind();
        if kind == NodeKind::Attribute {
            let clash = record
                .parent
                .and_then(|element| Self::attribute_handle(&tree, element, name))
                .is_some_and(|id| id != self.0.handle);
            if clash {
                return Err(StructuralError::DuplicateAttribute.into());
            }
        }
        let record = tree.record_mut(self.0.handle)?;
        if !record.data.set_name(name) {
            return Err(StructuralError::UnsupportedKind { kind }.into());
        }
        Ok(())
    }

    /// Text content
    ///
    /// Character data for text-like nodes and attributes; the concatenated
    /// text and CDATA of all descendants for elements and documents.
    pub fn content(&self) -> XmlResult<String> {
        let tree = self.0.store.lock();
        let record = self.record(&tree)?;
        if let Some(text) = record.data.text() {
            return Ok(text.to_string());
        }

        let mut out = String::new();
        for id in tree.descendants(self.0.handle) {
            if let Some(NodeData::Text(s) | NodeData::CData(s)) = tree.get(id).map(|r| &r.data) {
                out.push_str(s);
            }
        }
        Ok(out)
    }

    /// Check if the node stores character data of its own
    ///
    /// Elements and documents only derive content from their descendants.
    pub fn has_content(&self) -> XmlResult<bool> {
        self.peek(|_, r| Ok(r.data.text().is_some()))
    }

    /// Replace the text content
    ///
    /// For an element, every current child is unlinked (and becomes
    /// self-owning) before a single text child is appended.
    pub fn set_content(&self, content: &str) -> XmlResult<()> {
        let mut tree = self.0.store.lock();
        let kind = self.record(&tree)?.kind();
        match kind {
            NodeKind::Element => {
                let mut released = Vec::new();
                let mut cursor = tree.record(self.0.handle)?.first_child;
                while let Some(child) = cursor {
                    cursor = tree.record(child)?.next_sibling;
                    released.push(crate::mutation::detach_as_root(&self.0.store, &mut tree, child)?);
                }
                let text = tree.create(NodeData::Text(content.to_string()));
                tree.append_child(self.0.handle, text)?;
                drop(tree);
                drop(released);
                Ok(())
            }
            NodeKind::Document | NodeKind::Dtd => Err(StructuralError::UnsupportedKind { kind }.into()),
            _ => {
                tree.record_mut(self.0.handle)?.data.set_text(content);
                Ok(())
            }
        }
    }

    /// DTD system identifier
    pub fn system_id(&self) -> XmlResult<Option<String>> {
        let tree = self.0.store.lock();
        match &self.record(&tree)?.data {
            NodeData::Dtd { system_id, .. } => Ok(system_id.clone()),
            data => Err(StructuralError::UnsupportedKind { kind: data.kind() }.into()),
        }
    }

    /// DTD public identifier
    pub fn public_id(&self) -> XmlResult<Option<String>> {
        let tree = self.0.store.lock();
        match &self.record(&tree)?.data {
            NodeData::Dtd { public_id, .. } => Ok(public_id.clone()),
            data => Err(StructuralError::UnsupportedKind { kind: data.kind() }.into()),
        }
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Resolve a neighbour picked from this node's record
    fn neighbour(&self, pick: impl FnOnce(&NodeRecord<Slot>) -> Option<NodeId>) -> XmlResult<Option<Node>> {
        let mut tree = self.0.store.lock();
        let Some(id) = pick(self.record(&tree)?) else {
            return Ok(None);
        };
        registry::resolve(&self.0.store, &mut tree, id).map(Some)
    }

    /// Read this node's record under the lock
    pub(crate) fn peek<R>(
        &self,
        read: impl FnOnce(&Tree, &NodeRecord<Slot>) -> XmlResult<R>,
    ) -> XmlResult<R> {
        let tree = self.0.store.lock();
        read(&tree, self.record(&tree)?)
    }

    /// Find the first node along a link chain that satisfies `accept`
    fn scan(
        &self,
        start: impl FnOnce(&NodeRecord<Slot>) -> Option<NodeId>,
        step: impl Fn(&NodeRecord<Slot>) -> Option<NodeId>,
        accept: impl Fn(NodeKind) -> bool,
    ) -> XmlResult<Option<Node>> {
        let mut tree = self.0.store.lock();
        let mut cursor = start(self.record(&tree)?);
        while let Some(id) = cursor {
            let record = tree.record(id)?;
            if accept(record.kind()) {
                return registry::resolve(&self.0.store, &mut tree, id).map(Some);
            }
            cursor = step(record);
        }
        Ok(None)
    }

    pub fn parent(&self) -> XmlResult<Option<Node>> {
        self.neighbour(|r| r.parent)
    }

    pub fn has_parent(&self) -> XmlResult<bool> {
        self.peek(|_, r| Ok(r.parent.is_some()))
    }

    /// Parent, if it is an element
    pub fn parent_element(&self) -> XmlResult<Option<Node>> {
        self.scan(|r| r.parent, |_| None, is_element_kind)
    }

    pub fn has_parent_element(&self) -> XmlResult<bool> {
        self.peek(|tree, r| Ok(r.parent.map(|p| tree.kind(p)).transpose()? == Some(NodeKind::Element)))
    }

    pub fn first_child(&self) -> XmlResult<Option<Node>> {
        self.neighbour(|r| r.first_child)
    }

    pub fn last_child(&self) -> XmlResult<Option<Node>> {
        self.neighbour(|r| r.last_child)
    }

    pub fn next_sibling(&self) -> XmlResult<Option<Node>> {
        self.neighbour(|r| r.next_sibling)
    }

    pub fn prev_sibling(&self) -> XmlResult<Option<Node>> {
        self.neighbour(|r| r.prev_sibling)
    }

    pub fn has_next_node(&self) -> XmlResult<bool> {
        self.peek(|_, r| Ok(r.next_sibling.is_some()))
    }

    pub fn has_prev_node(&self) -> XmlResult<bool> {
        self.peek(|_, r| Ok(r.prev_sibling.is_some()))
    }

    pub fn has_next_element(&self) -> XmlResult<bool> {
        self.peek(|tree, r| Self::any_along(tree, r.next_sibling, |r| r.next_sibling))
    }

    pub fn has_prev_element(&self) -> XmlResult<bool> {
        self.peek(|tree, r| Self::any_along(tree, r.prev_sibling, |r| r.prev_sibling))
    }

    /// Check for an element along a sibling chain without materializing it
    fn any_along(
        tree: &Tree,
        start: Option<NodeId>,
        step: impl Fn(&NodeRecord<Slot>) -> Option<NodeId>,
    ) -> XmlResult<bool> {
        let mut cursor = start;
        while let Some(id) = cursor {
            let record = tree.record(id)?;
            if record.kind() == NodeKind::Element {
                return Ok(true);
            }
            cursor = step(record);
        }
        Ok(false)
    }

    pub fn first_element(&self) -> XmlResult<Option<Node>> {
        self.scan(|r| r.first_child, |r| r.next_sibling, is_element_kind)
    }

    pub fn last_element(&self) -> XmlResult<Option<Node>> {
        self.scan(|r| r.last_child, |r| r.prev_sibling, is_element_kind)
    }

    pub fn next_element(&self) -> XmlResult<Option<Node>> {
        self.scan(|r| r.next_sibling, |r| r.next_sibling, is_element_kind)
    }

    pub fn prev_element(&self) -> XmlResult<Option<Node>> {
        self.scan(|r| r.prev_sibling, |r| r.prev_sibling, is_element_kind)
    }

    pub fn has_children(&self) -> XmlResult<bool> {
        self.peek(|_, r| Ok(r.first_child.is_some()))
    }

    pub fn has_elements(&self) -> XmlResult<bool> {
        Ok(self.count_elements()? > 0)
    }

    /// Walk a link chain and call `visit` on every record `accept` takes
    fn walk_chain(
        tree: &Tree,
        start: Option<NodeId>,
        accept: impl Fn(NodeKind) -> bool,
        mut visit: impl FnMut(NodeId),
    ) -> XmlResult<()> {
        let mut cursor = start;
        while let Some(id) = cursor {
            let record = tree.record(id)?;
            if accept(record.kind()) {
                visit(id);
            }
            cursor = record.next_sibling;
        }
        Ok(())
    }

    /// Materialize a link chain under a single lock
    fn collect(
        &self,
        start: impl FnOnce(&NodeRecord<Slot>) -> Option<NodeId>,
        accept: impl Fn(NodeKind) -> bool,
    ) -> XmlResult<Nodes> {
        let mut tree = self.0.store.lock();
        let mut ids = Vec::new();
        Self::walk_chain(&tree, start(self.record(&tree)?), accept, |id| ids.push(id))?;
        let nodes = ids
            .into_iter()
            .map(|id| registry::resolve(&self.0.store, &mut tree, id))
            .collect::<XmlResult<Vec<_>>>()?;
        Ok(Nodes::new(nodes))
    }

    fn count(
        &self,
        start: impl FnOnce(&NodeRecord<Slot>) -> Option<NodeId>,
        accept: impl Fn(NodeKind) -> bool,
    ) -> XmlResult<usize> {
        let tree = self.0.store.lock();
        let mut count = 0;
        Self::walk_chain(&tree, start(self.record(&tree)?), accept, |_| count += 1)?;
        Ok(count)
    }

    /// All child nodes, in order
    pub fn children(&self) -> XmlResult<Nodes> {
        self.collect(|r| r.first_child, |_| true)
    }

    /// Child elements, in order
    pub fn elements(&self) -> XmlResult<Nodes> {
        self.collect(|r| r.first_child, is_element_kind)
    }

    /// Attribute nodes of an element, in order
    pub fn attributes(&self) -> XmlResult<Nodes> {
        self.collect(|r| r.first_attr, |_| true)
    }

    pub fn count_children(&self) -> XmlResult<usize> {
        self.count(|r| r.first_child, |_| true)
    }

    pub fn count_elements(&self) -> XmlResult<usize> {
        self.count(|r| r.first_child, is_element_kind)
    }

    pub fn count_attributes(&self) -> XmlResult<usize> {
        self.count(|r| r.first_attr, |_| true)
    }

    /// Document this node belongs to, if its tree hangs off one
    pub fn document(&self) -> XmlResult<Option<Document>> {
        let mut tree = self.0.store.lock();
        self.record(&tree)?;
        let top = tree.top(self.0.handle)?;
        if tree.kind(top)? != NodeKind::Document {
            return Ok(None);
        }
        let node = registry::resolve(&self.0.store, &mut tree, top)?;
        Ok(Some(Document::wrap(node)))
    }

    pub fn has_document(&self) -> XmlResult<bool> {
        let tree = self.0.store.lock();
        self.record(&tree)?;
        let top = tree.top(self.0.handle)?;
        Ok(tree.kind(top)? == NodeKind::Document)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Attribute of `element` with the given name
    pub(crate) fn attribute_handle(tree: &Tree, element: NodeId, name: &str) -> Option<NodeId> {
        let mut cursor = tree.get(element)?.first_attr;
        while let Some(id) = cursor {
            let record = tree.get(id)?;
            if record.data.name() == Some(name) {
                return Some(id);
            }
            cursor = record.next_sibling;
        }
        None
    }

    fn require_element(&self, tree: &Tree) -> XmlResult<()> {
        match self.record(tree)?.kind() {
            NodeKind::Element => Ok(()),
            kind => Err(StructuralError::UnsupportedKind { kind }.into()),
        }
    }

    /// Value of the named attribute
    pub fn attribute(&self, name: &str) -> XmlResult<Option<String>> {
        let tree = self.0.store.lock();
        self.require_element(&tree)?;
        Ok(Self::attribute_handle(&tree, self.0.handle, name)
            .and_then(|id| tree.get(id))
            .and_then(|record| record.data.text())
            .map(str::to_string))
    }

    pub fn has_attribute(&self, name: &str) -> XmlResult<bool> {
        let tree = self.0.store.lock();
        self.require_element(&tree)?;
        Ok(Self::attribute_handle(&tree, self.0.handle, name).is_some())
    }

    /// Create or update the named attribute
    pub fn set_attribute(&self, name: &str, value: &str) -> XmlResult<()> {
        let mut tree = self.0.store.lock();
        self.require_element(&tree)?;
        match Self::attribute_handle(&tree, self.0.handle, name) {
            Some(id) => {
                tree.record_mut(id)?.data.set_text(value);
            }
            None => {
                let attr = tree.create(NodeData::Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                });
                tree.append_attribute(self.0.handle, attr)?;
            }
        }
        Ok(())
    }

    /// Unlink the named attribute and return it
    ///
    /// The returned node is self-owning; dropping it reclaims the attribute.
    pub fn remove_attribute(&self, name: &str) -> XmlResult<Option<Node>> {
        let mut tree = self.0.store.lock();
        self.require_element(&tree)?;
        let Some(id) = Self::attribute_handle(&tree, self.0.handle, name) else {
            return Ok(None);
        };
        crate::mutation::detach_as_root(&self.0.store, &mut tree, id).map(Some)
    }

    /// Create an element with optional text content and append it as a child
    pub fn add_element(&self, name: &str, content: Option<&str>) -> XmlResult<Node> {
        let element = self.0.store.element(name);
        if let Some(content) = content {
            element.set_content(content)?;
        }
        self.link(&element)?;
        Ok(element)
    }
}

fn is_element_kind(kind: NodeKind) -> bool {
    kind == NodeKind::Element
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("handle", &format_args!("{}", self.0.handle))
            .field("serial", &self.0.serial)
            .finish()
    }
}
