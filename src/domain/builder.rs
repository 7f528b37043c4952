//! Tree builder: materializes a discussion tree from a node table and a
//! flat ancestor/descendant relation.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::domain::arena::DiscussionTree;
use crate::domain::entities::{Entry, EntryId};
use crate::domain::error::{DomainError, DomainResult, RelationFault};

/// Result type for tree operations.
pub type TreeResult<T> = DomainResult<T>;

/// Constructs discussion trees from fetched entries and their relation rows.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    linked: usize,
    skipped_self: usize,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relation pairs linked by the last build.
    pub fn linked(&self) -> usize {
        self.linked
    }

    /// Self rows (ancestor == descendant) skipped by the last build.
    pub fn skipped_self(&self) -> usize {
        self.skipped_self
    }

    /// Build the tree rooted at `root`.
    ///
    /// Every non-self pair attaches its descendant under its ancestor, in
    /// input order, through [`DiscussionTree::add_child`]. The result is
    /// structurally complete but only heuristically ordered; run
    /// [`Ranker::arrange`](crate::domain::Ranker::arrange) on it before display.
    ///
    /// # Errors
    /// Any relation row that cannot be linked fails the whole build, as does
    /// an entry left unreachable from the root.
    #[instrument(level = "debug", skip(self, entries, relations))]
    pub fn build<E, R>(&mut self, root: EntryId, entries: E, relations: R) -> TreeResult<DiscussionTree>
    where
        E: IntoIterator<Item = Entry>,
        R: IntoIterator<Item = (EntryId, EntryId)>,
    {
        // Reset state for a fresh build
        self.linked = 0;
        self.skipped_self = 0;

        let mut tree = DiscussionTree::new();
        for entry in entries {
            tree.insert(entry)?;
        }
        let root_idx = tree.index_of(root).ok_or(DomainError::RootNotFound(root))?;
        tree.set_root(root_idx)?;

        for (ancestor, descendant) in relations {
            if ancestor == descendant {
                self.skipped_self += 1;
                continue;
            }
            let fault = |kind: RelationFault| DomainError::relation(ancestor, descendant, kind);

            let parent = tree
                .index_of(ancestor)
                .ok_or_else(|| fault(RelationFault::MissingAncestor))?;
            let child = tree
                .index_of(descendant)
                .ok_or_else(|| fault(RelationFault::MissingDescendant))?;
            if child == root_idx {
                return Err(fault(RelationFault::RootAsDescendant));
            }

            tree.add_child(parent, child).map_err(|e| match e {
                DomainError::AlreadyAttached(_) => fault(RelationFault::DuplicateDescendant),
                DomainError::WouldCycle { .. } => fault(RelationFault::Cycle),
                other => other,
            })?;
            self.linked += 1;
        }

        Self::check_reachable(&tree, root)?;
        debug!(
            "built tree of {} entries ({} links, {} self rows)",
            tree.len(),
            self.linked,
            self.skipped_self
        );
        Ok(tree)
    }

    fn check_reachable(tree: &DiscussionTree, root: EntryId) -> TreeResult<()> {
        let reached: HashSet<EntryId> = tree.iter().map(|(_, _, n)| n.entry.id).collect();
        if reached.len() == tree.len() {
            return Ok(());
        }
        let detached = tree
            .nodes()
            .map(|(_, n)| n.entry.id)
            .filter(|id| !reached.contains(id))
            .min();
        match detached {
            Some(id) => Err(DomainError::relation(root, id, RelationFault::Detached)),
            None => Ok(()),
        }
    }
}
