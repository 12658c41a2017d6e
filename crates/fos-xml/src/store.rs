//! Node store
//!
//! A [`Store`] is one tree engine arena plus the lock that serializes every
//! access to it. All nodes created from a store, and all documents, share
//! that lock; separate stores are fully independent.
//!
//! Proxies can be dropped on any thread, including while the lock is held
//! by the dropping thread itself. Their finalization is therefore queued
//! and executed by whoever holds the lock: pending jobs are drained when the
//! lock is taken and again before it is released.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use fos_xmltree::{NodeData, NodeId, XmlTree};

use crate::finalize::{self, Finalizer};
use crate::node::Owner;
use crate::registry::{self, Slot, SlotState};
use crate::{Document, Node, StoreConfig, XmlResult};

/// Engine arena specialised with the identity slot
pub type Tree = XmlTree<Slot>;

/// Shared handle to one node arena
#[derive(Clone)]
pub struct Store(Arc<StoreShared>);

struct StoreShared {
    tree: Mutex<Tree>,
    pending: Mutex<Vec<Finalizer>>,
    serials: AtomicU64,
    config: StoreConfig,
}

impl Store {
    /// Create a store with default options
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store with the given options
    pub fn with_config(config: StoreConfig) -> Self {
        let tree = XmlTree::with_capacity(config.initial_capacity);
        Self(Arc::new(StoreShared {
            tree: Mutex::new(tree),
            pending: Mutex::new(Vec::new()),
            serials: AtomicU64::new(1),
            config,
        }))
    }

    /// Options this store was created with
    pub fn config(&self) -> &StoreConfig {
        &self.0.config
    }

    /// Check if two handles refer to the same store
    #[inline]
    pub fn same_store(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Materialize the proxy for an engine handle
    ///
    /// This is the entry point for layers that find nodes on their own
    /// (queries, validation, readers). Repeated calls return the same proxy
    /// while it is alive. A handle whose storage has been reclaimed yields
    /// [`XmlError::Detached`](crate::XmlError::Detached).
    ///
    /// A [`NodeId`] does not record which store issued it. Handles must come
    /// from this store; a handle from another store that happens to match a
    /// live slot here resolves to that unrelated record.
    pub fn resolve(&self, handle: NodeId) -> XmlResult<Node> {
        let mut tree = self.lock();
        registry::resolve(self, &mut tree, handle)
    }

    /// Registry state of a handle
    pub fn slot_state(&self, handle: NodeId) -> SlotState {
        let tree = self.lock();
        registry::slot_state(&tree, handle)
    }

    /// Run `f` with read-only access to the engine arena
    ///
    /// `f` must not drop or create nodes of this store.
    pub fn read<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        let tree = self.lock();
        f(&tree)
    }

    /// Number of live engine records
    pub fn live_records(&self) -> usize {
        self.read(Tree::live_count)
    }

    /// Number of finalization jobs waiting for the lock
    pub fn pending_finalizers(&self) -> usize {
        self.0.pending_jobs().len()
    }

    /// Create a free-standing element
    pub fn element(&self, name: &str) -> Node {
        self.create(NodeData::Element { name: name.to_string() })
    }

    /// Create a free-standing text node
    pub fn text(&self, content: &str) -> Node {
        self.create(NodeData::Text(content.to_string()))
    }

    /// Create a free-standing CDATA section
    pub fn cdata(&self, content: &str) -> Node {
        self.create(NodeData::CData(content.to_string()))
    }

    /// Create a free-standing comment
    pub fn comment(&self, content: &str) -> Node {
        self.create(NodeData::Comment(content.to_string()))
    }

    /// Create a free-standing attribute
    pub fn attribute(&self, name: &str, value: &str) -> Node {
        self.create(NodeData::Attribute {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Create a free-standing processing instruction
    pub fn processing_instruction(&self, target: &str, data: &str) -> Node {
        self.create(NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        })
    }

    /// Create a free-standing DTD node
    pub fn dtd(&self, name: &str, system_id: Option<&str>, public_id: Option<&str>) -> Node {
        self.create(NodeData::Dtd {
            name: name.to_string(),
            system_id: system_id.map(str::to_string),
            public_id: public_id.map(str::to_string),
        })
    }

    /// Create an empty document in this store
    pub fn document(&self) -> Document {
        let node = self.create(NodeData::Document {
            version: self.0.config.version.clone(),
            encoding: self.0.config.encoding.clone(),
        });
        Document::wrap(node)
    }

    /// Allocate a record and its self-owning proxy
    pub(crate) fn create(&self, data: NodeData) -> Node {
        let mut tree = self.lock();
        let handle = tree.create(data);
        registry::materialize(self, &mut tree, handle, Owner::Root)
    }

    /// Take the store lock
    pub(crate) fn lock(&self) -> TreeGuard<'_> {
        let mut guard = self.0.tree.lock().unwrap_or_else(PoisonError::into_inner);
        self.0.drain(&mut guard);
        TreeGuard {
            tree: DrainingGuard { shared: &self.0, guard },
            _flush: Flush(&self.0),
        }
    }

    pub(crate) fn next_serial(&self) -> u64 {
        self.0.serials.fetch_add(1, Ordering::Relaxed)
    }

    /// Queue a finalization job and run it if the lock is free
    pub(crate) fn submit(&self, job: Finalizer) {
        tracing::trace!(handle = %job.handle, root = job.root, "finalizer queued");
        self.0.pending_jobs().push(job);
        self.0.flush();
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.0.config)
            .finish_non_exhaustive()
    }
}

impl StoreShared {
    fn pending_jobs(&self) -> MutexGuard<'_, Vec<Finalizer>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_pending(&self) -> bool {
        !self.pending_jobs().is_empty()
    }

    /// Run queued jobs; the caller holds the tree lock
    fn drain(&self, tree: &mut Tree) {
        loop {
            let jobs = std::mem::take(&mut *self.pending_jobs());
            if jobs.is_empty() {
                return;
            }
            for job in jobs {
                finalize::run(tree, job);
            }
        }
    }

    /// Drain the queue if nobody else holds the lock
    ///
    /// When the lock is busy the holder drains on release, and it checks the
    /// queue again after unlocking, so a job pushed before a failed
    /// `try_lock` is never stranded.
    fn flush(&self) {
        while self.has_pending() {
            let mut tree = match self.tree.try_lock() {
                Ok(tree) => tree,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            self.drain(&mut tree);
        }
    }
}

/// Exclusive access to a store's arena
///
/// Field order matters: the draining guard releases the lock first, then
/// `Flush` picks up jobs queued by other threads in the meantime.
pub(crate) struct TreeGuard<'a> {
    tree: DrainingGuard<'a>,
    _flush: Flush<'a>,
}

struct DrainingGuard<'a> {
    shared: &'a StoreShared,
    guard: MutexGuard<'a, Tree>,
}

impl Drop for DrainingGuard<'_> {
    fn drop(&mut self) {
        self.shared.drain(&mut self.guard);
    }
}

struct Flush<'a>(&'a StoreShared);

impl Drop for Flush<'_> {
    fn drop(&mut self) {
        self.0.flush();
    }
}

impl Deref for TreeGuard<'_> {
    type Target = Tree;

    fn deref(&self) -> &Tree {
        &self.tree.guard
    }
}

impl DerefMut for TreeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Tree {
        &mut self.tree.guard
    }
}
