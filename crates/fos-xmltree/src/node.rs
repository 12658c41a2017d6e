//! XML node records
//!
//! A record holds the structural links of one node plus its payload.
//! Attributes live in their own list hanging off the element
//! (`first_attr` / `last_attr`); their `prev_sibling` / `next_sibling`
//! links chain attributes only.

use std::fmt;

use crate::NodeId;

/// Node type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Attribute,
    Text,
    CData,
    ProcessingInstruction,
    Comment,
    Document,
    Dtd,
}

impl NodeKind {
    /// Decode a numeric type tag (libxml2 numbering)
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(NodeKind::Element),
            2 => Some(NodeKind::Attribute),
            3 => Some(NodeKind::Text),
            4 => Some(NodeKind::CData),
            7 => Some(NodeKind::ProcessingInstruction),
            8 => Some(NodeKind::Comment),
            9 => Some(NodeKind::Document),
            14 => Some(NodeKind::Dtd),
            _ => None,
        }
    }

    /// Numeric type tag (libxml2 numbering)
    pub fn to_u32(self) -> u32 {
        match self {
            NodeKind::Element => 1,
            NodeKind::Attribute => 2,
            NodeKind::Text => 3,
            NodeKind::CData => 4,
            NodeKind::ProcessingInstruction => 7,
            NodeKind::Comment => 8,
            NodeKind::Document => 9,
            NodeKind::Dtd => 14,
        }
    }

    /// Whether records of this kind may have a child list
    #[inline]
    pub fn accepts_children(self) -> bool {
        matches!(self, NodeKind::Element | NodeKind::Document)
    }

    /// Upper-case label used in diagnostics, e.g. `ELEMENT_NODE`
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Element => "ELEMENT_NODE",
            NodeKind::Attribute => "ATTRIBUTE_NODE",
            NodeKind::Text => "TEXT_NODE",
            NodeKind::CData => "CDATA_SECTION_NODE",
            NodeKind::ProcessingInstruction => "PI_NODE",
            NodeKind::Comment => "COMMENT_NODE",
            NodeKind::Document => "DOCUMENT_NODE",
            NodeKind::Dtd => "DTD_NODE",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Node-specific payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// Document node with its XML declaration fields
    Document {
        version: Option<String>,
        encoding: Option<String>,
    },
    /// Document type declaration
    Dtd {
        name: String,
        system_id: Option<String>,
        public_id: Option<String>,
    },
    Element { name: String },
    Attribute { name: String, value: String },
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl NodeData {
    /// Type tag of this payload
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Document { .. } => NodeKind::Document,
            NodeData::Dtd { .. } => NodeKind::Dtd,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Attribute { .. } => NodeKind::Attribute,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::CData(_) => NodeKind::CData,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
        }
    }

    /// Node name, for the kinds that carry one
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeData::Element { name } | NodeData::Attribute { name, .. } | NodeData::Dtd { name, .. } => {
                Some(name)
            }
            NodeData::ProcessingInstruction { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Rename the node. Returns `false` if this kind has no name.
    pub fn set_name(&mut self, new_name: &str) -> bool {
        match self {
            NodeData::Element { name } | NodeData::Attribute { name, .. } | NodeData::Dtd { name, .. } => {
                *name = new_name.to_string();
                true
            }
            NodeData::ProcessingInstruction { target, .. } => {
                *target = new_name.to_string();
                true
            }
            _ => false,
        }
    }

    /// Character data stored directly on the node
    ///
    /// Elements and documents have none; their content is derived from
    /// their text descendants.
    pub fn text(&self) -> Option<&str> {
        match self {
            NodeData::Text(s) | NodeData::CData(s) | NodeData::Comment(s) => Some(s),
            NodeData::Attribute { value, .. } => Some(value),
            NodeData::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Replace the character data. Returns `false` if this kind has none.
    pub fn set_text(&mut self, content: &str) -> bool {
        match self {
            NodeData::Text(s) | NodeData::CData(s) | NodeData::Comment(s) => {
                *s = content.to_string();
                true
            }
            NodeData::Attribute { value, .. } => {
                *value = content.to_string();
                true
            }
            NodeData::ProcessingInstruction { data, .. } => {
                *data = content.to_string();
                true
            }
            _ => false,
        }
    }
}

/// One node in the arena
#[derive(Debug)]
pub struct NodeRecord<P> {
    /// Parent node (`None` for the top of a tree)
    pub parent: Option<NodeId>,
    /// First child
    pub first_child: Option<NodeId>,
    /// Last child (for O(1) append)
    pub last_child: Option<NodeId>,
    /// Previous sibling (within the child list or the attribute list)
    pub prev_sibling: Option<NodeId>,
    /// Next sibling (within the child list or the attribute list)
    pub next_sibling: Option<NodeId>,
    /// First attribute (elements only)
    pub first_attr: Option<NodeId>,
    /// Last attribute (elements only)
    pub last_attr: Option<NodeId>,
    /// Node-specific data
    pub data: NodeData,
    /// Reserved extension slot for the embedding layer
    pub private: P,
}

impl<P> NodeRecord<P> {
    pub(crate) fn new(data: NodeData, private: P) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            first_attr: None,
            last_attr: None,
            data,
            private,
        }
    }

    /// Type tag of the record
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    /// Check if the record is linked into a tree
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.parent.is_some()
    }

    #[inline]
    pub(crate) fn clear_links(&mut self) {
        self.parent = None;
        self.prev_sibling = None;
        self.next_sibling = None;
    }
}
