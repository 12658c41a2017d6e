//! Proxy finalization
//!
//! Dropping the last handle to a proxy queues a [`Finalizer`] on its store.
//! The job runs under the store lock, so it never races a mutation or a
//! lookup on the same tree.

use fos_xmltree::NodeId;

use crate::error::{fatal, FatalError};
use crate::registry::SlotState;
use crate::store::Tree;

/// Deferred finalization of one proxy
#[derive(Debug, Clone, Copy)]
pub(crate) struct Finalizer {
    pub(crate) handle: NodeId,
    /// Serial of the finalized proxy
    pub(crate) serial: u64,
    /// Whether the proxy was self-owning when it died
    pub(crate) root: bool,
}

/// Execute one finalization job
///
/// A non-root proxy only clears its back-reference; its storage belongs to
/// the root. A root proxy additionally frees its subtree, after detaching
/// every record below it from the registry so no lookup can reach freed
/// storage.
pub(crate) fn run(tree: &mut Tree, job: Finalizer) {
    let Some(slot) = tree.private_mut(job.handle) else {
        // Storage already released together with an enclosing root
        tracing::trace!(handle = %job.handle, "finalizer for freed record");
        return;
    };
    if !slot.is_serial(job.serial) {
        // A newer proxy mirrors the record now, or the slot was cleared by
        // a subtree reclamation that has not freed this record yet
        tracing::trace!(handle = %job.handle, serial = job.serial, "stale finalizer skipped");
        return;
    }
    slot.detach();

    if !job.root {
        tracing::trace!(handle = %job.handle, "proxy finalized");
        return;
    }

    let members: Vec<NodeId> = tree.subtree(job.handle).skip(1).collect();
    for id in members {
        let Some(slot) = tree.private_mut(id) else { continue };
        match slot.state() {
            SlotState::Empty => {}
            SlotState::Live => {
                // Every live proxy below holds the root, so it cannot be dying
                tracing::warn!(handle = %id, root = %job.handle, "live proxy inside reclaimed subtree");
                slot.detach();
            }
            SlotState::Detached => {
                slot.detach();
            }
        }
    }

    match tree.free_subtree(job.handle) {
        Ok(freed) => tracing::debug!(root = %job.handle, freed, "subtree reclaimed"),
        Err(source) => fatal(FatalError::ReclamationFailure {
            handle: job.handle,
            source,
        }),
    }
}
