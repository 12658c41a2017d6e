//! Error types
//!
//! [`XmlError`] is what callers see. [`FatalError`] never reaches a caller:
//! it describes a broken identity or reclamation invariant detected off the
//! caller's stack and is handed to [`fatal`].

use fos_xmltree::{NodeId, NodeKind, TreeError};

/// Result type for node operations
pub type XmlResult<T> = Result<T, XmlError>;

/// Tree shape violations. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("{kind} nodes cannot have children")]
    CannotHaveChildren { kind: NodeKind },

    #[error("{child} cannot be placed under {parent}")]
    InvalidChild { parent: NodeKind, child: NodeKind },

    #[error("document already has a root element")]
    DuplicateRoot,

    #[error("document already has a DTD")]
    DuplicateDtd,

    #[error("element already has an attribute with that name")]
    DuplicateAttribute,

    #[error("node cannot be linked below itself or its own descendant")]
    Cycle,

    #[error("sibling target has no parent")]
    NoParent,

    #[error("operation not supported on {kind} nodes")]
    UnsupportedKind { kind: NodeKind },
}

/// Node operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// The node's storage has been reclaimed
    #[error("node is detached from its storage")]
    Detached,

    /// The nodes belong to different stores
    #[error("nodes belong to different stores")]
    WrongStore,

    #[error("tree engine error: {0}")]
    Tree(#[from] TreeError),
}

/// Broken invariants that cannot be recovered from
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("identity violation: node {handle} is already mirrored by a live proxy")]
    IdentityViolation { handle: NodeId },

    #[error("failed to reclaim subtree {handle}: {source}")]
    ReclamationFailure {
        handle: NodeId,
        #[source]
        source: TreeError,
    },
}

/// Log a fatal condition and abort the process
///
/// Continuing would risk a leaked or doubly freed subtree.
#[cold]
pub fn fatal(error: FatalError) -> ! {
    tracing::error!(%error, "fatal node lifetime error, aborting");
    eprintln!("fos-xml: {error}");
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_converts() {
        let err: XmlError = StructuralError::DuplicateRoot.into();
        assert_eq!(err, XmlError::Structural(StructuralError::DuplicateRoot));
        assert_eq!(err.to_string(), "document already has a root element");
    }

    #[test]
    fn test_messages_name_kinds() {
        let err = StructuralError::CannotHaveChildren { kind: NodeKind::Text };
        assert_eq!(err.to_string(), "TEXT_NODE nodes cannot have children");

        let err = StructuralError::InvalidChild {
            parent: NodeKind::Document,
            child: NodeKind::Text,
        };
        assert_eq!(err.to_string(), "TEXT_NODE cannot be placed under DOCUMENT_NODE");
    }
}
