//! fOS XML Tree - Node storage engine
//!
//! Arena of linked XML node records. Every record carries the usual
//! parent / child / sibling links, a separate attribute list for elements,
//! and one reserved extension slot owned by whoever embeds the tree.
//!
//! Records are released only through [`XmlTree::free_subtree`]. Freed slots
//! are recycled with a bumped [`Generation`], so a [`NodeId`] that outlives
//! its record is detected instead of aliasing a new node.

mod generation;
mod node;
mod operations;
mod tree;
mod walker;

pub use generation::Generation;
pub use node::{NodeData, NodeKind, NodeRecord};
pub use operations::{TreeError, TreeResult};
pub use tree::XmlTree;
pub use walker::Subtree;

use std::fmt;

/// Node identifier (arena index plus generation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: Generation,
}

impl NodeId {
    #[inline]
    pub(crate) const fn new(index: u32, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Arena slot index
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this id was handed out
    #[inline]
    pub const fn generation(self) -> Generation {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation.value())
    }
}
