//! XML Tree (arena-based allocation)

use crate::{Generation, NodeData, NodeId, NodeKind, NodeRecord, Subtree, TreeError, TreeResult};

/// Arena slot
#[derive(Debug)]
enum Entry<P> {
    Occupied {
        generation: Generation,
        record: NodeRecord<P>,
    },
    Vacant {
        generation: Generation,
        next_free: Option<u32>,
    },
}

/// Arena-based XML node storage
///
/// `P` is the type of the reserved extension slot carried by every record.
/// The tree never looks inside it.
#[derive(Debug)]
pub struct XmlTree<P> {
    entries: Vec<Entry<P>>,
    free_head: Option<u32>,
    live: usize,
}

impl<P> XmlTree<P> {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a tree with room for `capacity` records
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free_head: None,
            live: 0,
        }
    }

    /// Allocate a new, unlinked record
    pub fn create(&mut self, data: NodeData) -> NodeId
    where
        P: Default,
    {
        let record = NodeRecord::new(data, P::default());
        self.live += 1;

        if let Some(index) = self.free_head {
            let entry = &mut self.entries[index as usize];
            if let Entry::Vacant { generation, next_free } = *entry {
                self.free_head = next_free;
                *entry = Entry::Occupied { generation, record };
                return NodeId::new(index, generation);
            }
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry::Occupied {
            generation: Generation::INITIAL,
            record,
        });
        NodeId::new(index, Generation::INITIAL)
    }

    /// Check if `id` refers to a live record
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Get a record by ID (`None` if freed)
    pub fn get(&self, id: NodeId) -> Option<&NodeRecord<P>> {
        match self.entries.get(id.index() as usize)? {
            Entry::Occupied { generation, record } if *generation == id.generation() => Some(record),
            _ => None,
        }
    }

    /// Get a mutable record by ID (`None` if freed)
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord<P>> {
        match self.entries.get_mut(id.index() as usize)? {
            Entry::Occupied { generation, record } if *generation == id.generation() => Some(record),
            _ => None,
        }
    }

    /// Get a record by ID, failing with [`TreeError::NotFound`]
    #[inline]
    pub fn record(&self, id: NodeId) -> TreeResult<&NodeRecord<P>> {
        self.get(id).ok_or(TreeError::NotFound(id))
    }

    /// Get a mutable record by ID, failing with [`TreeError::NotFound`]
    #[inline]
    pub fn record_mut(&mut self, id: NodeId) -> TreeResult<&mut NodeRecord<P>> {
        self.get_mut(id).ok_or(TreeError::NotFound(id))
    }

    /// Type tag of a record
    #[inline]
    pub fn kind(&self, id: NodeId) -> TreeResult<NodeKind> {
        self.record(id).map(NodeRecord::kind)
    }

    /// Reserved slot of a record
    #[inline]
    pub fn private(&self, id: NodeId) -> Option<&P> {
        self.get(id).map(|record| &record.private)
    }

    /// Mutable reserved slot of a record
    #[inline]
    pub fn private_mut(&mut self, id: NodeId) -> Option<&mut P> {
        self.get_mut(id).map(|record| &mut record.private)
    }

    /// Check whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.get(id).and_then(|record| record.parent);
        }
        false
    }

    /// Topmost ancestor of `node` (the node itself if unlinked)
    pub fn top(&self, node: NodeId) -> TreeResult<NodeId> {
        let mut current = node;
        while let Some(parent) = self.record(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// Pre-order walk over `top` and everything below it, attributes included
    pub fn subtree(&self, top: NodeId) -> Subtree<'_, P> {
        Subtree::new(self, top, true)
    }

    /// Pre-order walk over `top` and its child-list descendants (no attributes)
    pub fn descendants(&self, top: NodeId) -> Subtree<'_, P> {
        Subtree::new(self, top, false)
    }

    /// Free an unlinked record and everything below it
    ///
    /// Returns the number of records released. Every [`NodeId`] that pointed
    /// into the subtree becomes stale.
    pub fn free_subtree(&mut self, top: NodeId) -> TreeResult<usize> {
        if self.record(top)?.is_linked() {
            return Err(TreeError::StillLinked(top));
        }

        let doomed: Vec<NodeId> = self.subtree(top).collect();
        for id in &doomed {
            let index = id.index();
            let entry = &mut self.entries[index as usize];
            *entry = Entry::Vacant {
                generation: id.generation().next(),
                next_free: self.free_head,
            };
            self.free_head = Some(index);
        }
        self.live -= doomed.len();

        tracing::trace!(top = %top, freed = doomed.len(), "freed subtree");
        Ok(doomed.len())
    }

    /// Number of live records
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of slots ever allocated (live and vacant)
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    /// Check if the tree holds no live records
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<P> Default for XmlTree<P> {
    fn default() -> Self {
        Self::new()
    }
}
