//! XML documents
//!
//! A [`Document`] is a typed view of a Document node. Document nodes never
//! have a parent, so the wrapped proxy is always self-owning and its tree
//! is reclaimed once the document and every node inside it are dropped.

use fos_xmltree::{NodeData, NodeKind};

use crate::mutation::{self, DocumentSlot};
use crate::registry;
use crate::{Node, Store, StoreConfig, StructuralError, XmlResult};

/// XML document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    node: Node,
}

impl Document {
    /// Wrap a node already known to be a document
    pub(crate) fn wrap(node: Node) -> Self {
        Self { node }
    }

    /// Create an empty document in a new store
    pub fn new() -> Self {
        Store::new().document()
    }

    /// Create an empty document in a new store with the given options
    pub fn with_config(config: StoreConfig) -> Self {
        Store::with_config(config).document()
    }

    /// View a document node as a `Document`
    pub fn from_node(node: Node) -> XmlResult<Self> {
        match node.kind()? {
            NodeKind::Document => Ok(Self::wrap(node)),
            kind => Err(StructuralError::UnsupportedKind { kind }.into()),
        }
    }

    /// The document node
    #[inline]
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Store the document lives in
    #[inline]
    pub fn store(&self) -> &Store {
        self.node.store()
    }

    /// XML version declared by the document
    pub fn version(&self) -> XmlResult<Option<String>> {
        self.declaration(|version, _| version.clone())
    }

    pub fn has_version(&self) -> XmlResult<bool> {
        Ok(self.version()?.is_some())
    }

    /// Encoding declared by the document
    pub fn encoding(&self) -> XmlResult<Option<String>> {
        self.declaration(|_, encoding| encoding.clone())
    }

    pub fn has_encoding(&self) -> XmlResult<bool> {
        Ok(self.encoding()?.is_some())
    }

    fn declaration<R>(&self, read: impl FnOnce(&Option<String>, &Option<String>) -> R) -> XmlResult<R> {
        let tree = self.store().lock();
        match &self.node.record(&tree)?.data {
            NodeData::Document { version, encoding } => Ok(read(version, encoding)),
            data => Err(StructuralError::UnsupportedKind { kind: data.kind() }.into()),
        }
    }

    /// Root element, if any
    pub fn root(&self) -> XmlResult<Option<Node>> {
        self.slot(NodeKind::Element)
    }

    pub fn has_root(&self) -> XmlResult<bool> {
        Ok(self.root()?.is_some())
    }

    /// Make `element` the root element
    ///
    /// The previous root element is unlinked, not freed, and returned as a
    /// self-owning node.
    pub fn set_root(&self, element: &Node) -> XmlResult<Option<Node>> {
        mutation::set_document_child(&self.node, element, DocumentSlot::Root)
    }

    /// Document type declaration, if any
    pub fn dtd(&self) -> XmlResult<Option<Node>> {
        self.slot(NodeKind::Dtd)
    }

    pub fn has_dtd(&self) -> XmlResult<bool> {
        Ok(self.dtd()?.is_some())
    }

    /// Make `dtd` the document type declaration
    ///
    /// The previous DTD is unlinked and returned as a self-owning node.
    pub fn set_dtd(&self, dtd: &Node) -> XmlResult<Option<Node>> {
        mutation::set_document_child(&self.node, dtd, DocumentSlot::Dtd)
    }

    fn slot(&self, kind: NodeKind) -> XmlResult<Option<Node>> {
        let store = self.store();
        let mut tree = store.lock();
        self.node.record(&tree)?;
        match mutation::find_child(&tree, self.node.handle(), kind) {
            Some(id) => registry::resolve(store, &mut tree, id).map(Some),
            None => Ok(None),
        }
    }

    pub fn create_element(&self, name: &str) -> Node {
        self.store().element(name)
    }

    pub fn create_text(&self, content: &str) -> Node {
        self.store().text(content)
    }

    pub fn create_cdata(&self, content: &str) -> Node {
        self.store().cdata(content)
    }

    pub fn create_comment(&self, content: &str) -> Node {
        self.store().comment(content)
    }

    pub fn create_attribute(&self, name: &str, value: &str) -> Node {
        self.store().attribute(name, value)
    }

    pub fn create_processing_instruction(&self, target: &str, data: &str) -> Node {
        self.store().processing_instruction(target, data)
    }

    pub fn create_dtd(&self, name: &str, system_id: Option<&str>, public_id: Option<&str>) -> Node {
        self.store().dtd(name, system_id, public_id)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
