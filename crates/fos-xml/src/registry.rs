//! Identity registry
//!
//! The back-reference from an engine record to its proxy lives in the
//! record's reserved slot, so a lookup is a single arena access and works
//! for records only reachable by walking the tree. [`resolve`] is the only
//! place where a handle turns into a [`Node`]; it keeps at most one live
//! proxy per record.

use std::sync::{Arc, Weak};

use fos_xmltree::NodeId;

use crate::error::{fatal, FatalError};
use crate::node::{NodeInner, Owner};
use crate::store::Tree;
use crate::{Node, Store, XmlError, XmlResult};

/// Reserved-slot contents of one engine record
#[derive(Default)]
pub struct Slot(SlotEntry);

#[derive(Default)]
enum SlotEntry {
    /// No proxy was ever created
    #[default]
    Empty,
    /// Back-reference to the proxy mirroring this record
    Live { serial: u64, proxy: Weak<NodeInner> },
    /// Sentinel: the proxy has been finalized
    Detached,
}

/// Observable registry state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// The record exists and was never materialized
    Empty,
    /// The record is mirrored by a live proxy
    Live,
    /// The proxy was finalized, or the record itself was freed
    Detached,
}

impl Slot {
    /// Current state of the slot
    pub fn state(&self) -> SlotState {
        match &self.0 {
            SlotEntry::Empty => SlotState::Empty,
            SlotEntry::Live { proxy, .. } if proxy.strong_count() > 0 => SlotState::Live,
            // Proxy dropped, its finalizer has not run yet
            SlotEntry::Live { .. } => SlotState::Detached,
            SlotEntry::Detached => SlotState::Detached,
        }
    }

    /// Live proxy registered in this slot, if any
    pub(crate) fn proxy(&self) -> Option<Node> {
        match &self.0 {
            SlotEntry::Live { proxy, .. } => proxy.upgrade().map(Node),
            _ => None,
        }
    }

    /// Check if the slot still refers to the proxy with this serial
    pub(crate) fn is_serial(&self, serial: u64) -> bool {
        matches!(self.0, SlotEntry::Live { serial: current, .. } if current == serial)
    }

    /// Replace any back-reference with the detached sentinel
    ///
    /// Returns `true` if a back-reference was cleared.
    pub(crate) fn detach(&mut self) -> bool {
        let had_proxy = matches!(self.0, SlotEntry::Live { .. });
        self.0 = SlotEntry::Detached;
        had_proxy
    }
}

/// Registry state of a handle; freed handles report `Detached`
pub(crate) fn slot_state(tree: &Tree, handle: NodeId) -> SlotState {
    tree.private(handle).map_or(SlotState::Detached, Slot::state)
}

/// Return the proxy for `handle`, creating it if needed
///
/// A new proxy's owner comes from [`owner_for`].
pub(crate) fn resolve(store: &Store, tree: &mut Tree, handle: NodeId) -> XmlResult<Node> {
    let slot = tree.private(handle).ok_or(XmlError::Detached)?;
    if let Some(node) = slot.proxy() {
        return Ok(node);
    }

    let owner = owner_for(tree, handle)?;
    Ok(materialize(store, tree, handle, owner))
}

/// Derive the owner of a record that has no live proxy
///
/// An unlinked record owns itself. Otherwise walk up to the nearest
/// ancestor that has a live proxy and take that proxy's root: owner sweeps
/// only rewrite materialized proxies, so the nearest materialized ancestor
/// is the authoritative one. Reaching the top without finding one means
/// the tree is waiting for its root's finalizer.
pub(crate) fn owner_for(tree: &Tree, handle: NodeId) -> XmlResult<Owner> {
    let mut cursor = tree.get(handle).ok_or(XmlError::Detached)?.parent;
    if cursor.is_none() {
        return Ok(Owner::Root);
    }

    while let Some(id) = cursor {
        let record = tree.get(id).ok_or(XmlError::Detached)?;
        if let Some(proxy) = record.private.proxy() {
            return Ok(Owner::Node(proxy.owner()));
        }
        cursor = record.parent;
    }

    tracing::debug!(handle = %handle, "no materialized ancestor; tree is being reclaimed");
    Err(XmlError::Detached)
}

/// Create the proxy for `handle` and register it in the slot
pub(crate) fn materialize(store: &Store, tree: &mut Tree, handle: NodeId, owner: Owner) -> Node {
    let Some(slot) = tree.private_mut(handle) else {
        fatal(FatalError::IdentityViolation { handle });
    };
    if slot.state() == SlotState::Live {
        fatal(FatalError::IdentityViolation { handle });
    }

    let serial = store.next_serial();
    let node = Node::new(store.clone(), handle, serial, owner);
    slot.0 = SlotEntry::Live {
        serial,
        proxy: Arc::downgrade(&node.0),
    };

    tracing::trace!(handle = %handle, serial, "materialized proxy");
    node
}
