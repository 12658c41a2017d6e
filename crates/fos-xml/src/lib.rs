//! fOS XML - Identity-stable XML node handles
//!
//! Nodes live in a [`fos_xmltree`] arena owned by a [`Store`]. Applications
//! work with [`Node`] handles, which guarantee:
//!
//! - one proxy per engine record, so `==` on nodes is identity;
//! - engine memory stays alive while any node inside it is reachable;
//! - each tree is freed exactly once, after the last node of it is dropped,
//!   whichever thread drops it;
//! - a node whose storage is gone reports [`XmlError::Detached`].
//!
//! # Example
//!
//! ```
//! use fos_xml::Document;
//!
//! let doc = Document::new();
//! let root = doc.create_element("library");
//! doc.set_root(&root).unwrap();
//! let book = root.add_element("book", Some("Dune")).unwrap();
//!
//! assert_eq!(book.parent().unwrap(), Some(root.clone()));
//! assert_eq!(root.content().unwrap(), "Dune");
//! ```

mod config;
mod document;
mod error;
mod finalize;
mod iter;
mod mutation;
mod namespace;
mod node;
mod path;
mod registry;
mod store;

pub use config::StoreConfig;
pub use document::Document;
pub use error::{fatal, FatalError, StructuralError, XmlError, XmlResult};
pub use iter::Nodes;
pub use namespace::{XMLNS_NAMESPACE, XML_NAMESPACE};
pub use node::Node;
pub use registry::{Slot, SlotState};
pub use store::{Store, Tree};

pub use fos_xmltree::{NodeId, NodeKind};
