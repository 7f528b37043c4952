//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::EntryId;

/// Why a relation row could not be linked into the tree.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationFault {
    #[error("ancestor not present in node table")]
    MissingAncestor,

    #[error("descendant not present in node table")]
    MissingDescendant,

    #[error("descendant is the requested root")]
    RootAsDescendant,

    #[error("descendant already attached to the tree")]
    DuplicateDescendant,

    #[error("link would make an entry its own ancestor")]
    Cycle,

    #[error("entry not reachable from the root")]
    Detached,
}

/// Domain errors represent violations of the tree's structural preconditions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("malformed relation ({ancestor} -> {descendant}): {kind}")]
    MalformedRelation {
        ancestor: EntryId,
        descendant: EntryId,
        kind: RelationFault,
    },

    #[error("root entry not found in node table: {0}")]
    RootNotFound(EntryId),

    #[error("duplicate entry in node table: {0}")]
    DuplicateEntry(EntryId),

    #[error("entry already attached to a tree: {0}")]
    AlreadyAttached(EntryId),

    #[error("attaching {descendant} below {ancestor} would create a cycle")]
    WouldCycle {
        ancestor: EntryId,
        descendant: EntryId,
    },

    #[error("stale node index")]
    StaleIndex,

    #[error("invalid entry: {message}")]
    InvalidEntry { message: String },
}

impl DomainError {
    pub(crate) fn relation(ancestor: EntryId, descendant: EntryId, kind: RelationFault) -> Self {
        Self::MalformedRelation {
            ancestor,
            descendant,
            kind,
        }
    }

    /// True for every error that stems from a malformed ancestor/descendant relation.
    pub fn is_malformed_relation(&self) -> bool {
        matches!(self, Self::MalformedRelation { .. })
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
