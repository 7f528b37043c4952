//! Arena-backed discussion tree in left-child/right-sibling form.
//!
//! Every node stores three links: `parent`, `first_child`, `next_sibling`.
//! `parent` is the binary parent, i.e. the node whose `first_child` or
//! `next_sibling` slot holds this node. The logical parent of an entry is
//! available through [`DiscussionTree::thread_parent`].

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::{instrument, trace};

use crate::domain::entities::{Entry, EntryId};
use crate::domain::error::{DomainError, DomainResult};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    /// Entry payload for this node
    pub entry: Entry,
    parent: Option<Index>,
    first_child: Option<Index>,
    next_sibling: Option<Index>,
    /// Memoized number of descendants
    child_count: Cell<Option<u64>>,
}

impl TreeNode {
    fn new(entry: Entry) -> Self {
        Self {
            entry,
            parent: None,
            first_child: None,
            next_sibling: None,
            child_count: Cell::new(None),
        }
    }

    pub fn parent(&self) -> Option<Index> {
        self.parent
    }

    pub fn first_child(&self) -> Option<Index> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<Index> {
        self.next_sibling
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entry.label())
    }
}

/// A discussion tree owning its entries.
///
/// Nodes are addressed by generational indices; links never own memory, so
/// relinking during insertion and arrangement is plain index assignment.
#[derive(Debug, Default)]
pub struct DiscussionTree {
    arena: Arena<TreeNode>,
    root: Option<Index>,
    ids: HashMap<EntryId, Index>,
}

impl DiscussionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached node. It becomes part of the tree through
    /// [`set_root`](Self::set_root), [`add_child`](Self::add_child) or
    /// [`add_sibling`](Self::add_sibling).
    pub fn insert(&mut self, entry: Entry) -> DomainResult<Index> {
        let id = entry.id;
        if self.ids.contains_key(&id) {
            return Err(DomainError::DuplicateEntry(id));
        }
        let idx = self.arena.insert(TreeNode::new(entry));
        self.ids.insert(id, idx);
        Ok(idx)
    }

    /// Insert an entry and make it the root.
    pub fn insert_root(&mut self, entry: Entry) -> DomainResult<Index> {
        let idx = self.insert(entry)?;
        self.set_root(idx)?;
        Ok(idx)
    }

    /// Insert an entry and attach it under `parent`.
    pub fn push_child(&mut self, parent: Index, entry: Entry) -> DomainResult<Index> {
        let idx = self.insert(entry)?;
        self.add_child(parent, idx)?;
        Ok(idx)
    }

    /// Designate a detached node as the root.
    pub fn set_root(&mut self, idx: Index) -> DomainResult<()> {
        let node = self.get_node(idx).ok_or(DomainError::StaleIndex)?;
        if node.parent.is_some() {
            return Err(DomainError::AlreadyAttached(node.entry.id));
        }
        self.root = Some(idx);
        Ok(())
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn entry(&self, idx: Index) -> Option<&Entry> {
        self.arena.get(idx).map(|n| &n.entry)
    }

    pub fn index_of(&self, id: EntryId) -> Option<Index> {
        self.ids.get(&id).copied()
    }

    pub fn parent(&self, idx: Index) -> Option<Index> {
        self.arena.get(idx).and_then(|n| n.parent)
    }

    pub fn first_child(&self, idx: Index) -> Option<Index> {
        self.arena.get(idx).and_then(|n| n.first_child)
    }

    pub fn next_sibling(&self, idx: Index) -> Option<Index> {
        self.arena.get(idx).and_then(|n| n.next_sibling)
    }

    /// Upvotes minus downvotes; 0 for an absent node.
    pub fn points(&self, idx: Option<Index>) -> i64 {
        idx.and_then(|i| self.entry(i)).map_or(0, Entry::points)
    }

    /// A node heads a sibling chain if it is a top-level node or sits in its
    /// parent's `first_child` slot rather than a `next_sibling` slot.
    pub fn is_chain_head(&self, idx: Index) -> bool {
        match self.parent(idx) {
            None => true,
            Some(p) => self.first_child(p) == Some(idx),
        }
    }

    /// The entry this node replies to, if any.
    pub fn thread_parent(&self, idx: Index) -> Option<Index> {
        let mut current = idx;
        loop {
            let parent = self.parent(current)?;
            if self.first_child(parent) == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
    }

    /// Iterate a sibling chain starting at `head`.
    pub fn chain(&self, head: Option<Index>) -> ChainIter<'_> {
        ChainIter {
            tree: self,
            next: head,
        }
    }

    /// Iterate the direct replies of `idx`.
    pub fn children(&self, idx: Index) -> ChainIter<'_> {
        self.chain(self.first_child(idx))
    }

    /// Number of descendants of `idx`, memoized on first use.
    pub fn child_count(&self, idx: Index) -> u64 {
        let Some(node) = self.arena.get(idx) else {
            return 0;
        };
        if let Some(count) = node.child_count.get() {
            return count;
        }
        let mut count = 0;
        let mut stack: Vec<Index> = node.first_child.into_iter().collect();
        while let Some(current) = stack.pop() {
            count += 1;
            if let Some(n) = self.arena.get(current) {
                stack.extend(n.first_child);
                stack.extend(n.next_sibling);
            }
        }
        node.child_count.set(Some(count));
        count
    }

    /// All nodes in arena order, attached or not.
    pub fn nodes(&self) -> impl Iterator<Item = (Index, &TreeNode)> {
        self.arena.iter()
    }

    /// Pre-order walk (entry, then its replies, then its next sibling).
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Number of levels on the longest root-to-leaf path.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.iter().map(|(_, depth, _)| depth + 1).max().unwrap_or(0)
    }

    /// Ids of all entries without replies, in pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_nodes(&self) -> Vec<EntryId> {
        self.iter()
            .filter(|(_, _, node)| node.first_child.is_none())
            .map(|(_, _, node)| node.entry.id)
            .collect()
    }

    fn is_attached(&self, idx: Index) -> bool {
        self.root == Some(idx) || self.parent(idx).is_some()
    }

    /// True if `candidate` lies on the parent path of `idx` (or is `idx`).
    fn is_above(&self, candidate: Index, idx: Index) -> bool {
        let mut current = Some(idx);
        while let Some(c) = current {
            if c == candidate {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    fn check_insertable(&self, anchor: Index, new: Index) -> DomainResult<()> {
        let anchor_node = self.arena.get(anchor).ok_or(DomainError::StaleIndex)?;
        let new_node = self.arena.get(new).ok_or(DomainError::StaleIndex)?;
        if self.is_attached(new) {
            return Err(DomainError::AlreadyAttached(new_node.entry.id));
        }
        if self.is_above(new, anchor) {
            return Err(DomainError::WouldCycle {
                ancestor: anchor_node.entry.id,
                descendant: new_node.entry.id,
            });
        }
        Ok(())
    }

    /// Attach `new` (with any replies it already has) under `parent`.
    ///
    /// An empty child slot is filled directly; otherwise `new` is placed
    /// among the existing replies by [`add_sibling`](Self::add_sibling).
    #[instrument(level = "trace", skip(self))]
    pub fn add_child(&mut self, parent: Index, new: Index) -> DomainResult<()> {
        self.check_insertable(parent, new)?;
        match self.arena[parent].first_child {
            None => {
                self.arena[parent].first_child = Some(new);
                self.arena[new].parent = Some(parent);
            }
            Some(head) => self.link_sibling(head, new),
        }
        self.invalidate_counts(new);
        Ok(())
    }

    /// Insert `new` immediately above `existing` in its chain.
    ///
    /// Placement is heuristic: a freshly fetched entry has no replies yet,
    /// so its score is not final and comparing now would buy nothing. Any
    /// sibling `new` carried is re-inserted above `new` afterwards.
    #[instrument(level = "trace", skip(self))]
    pub fn add_sibling(&mut self, existing: Index, new: Index) -> DomainResult<()> {
        self.check_insertable(existing, new)?;
        self.link_sibling(existing, new);
        self.invalidate_counts(new);
        Ok(())
    }

    fn link_sibling(&mut self, existing: Index, new: Index) {
        let mut existing = existing;
        let mut pending = Some(new);

        while let Some(new) = pending {
            let displaced = self.arena[new].next_sibling;
            match self.arena[existing].parent {
                None => {
                    // `existing` was a top-level node; `new` takes its place.
                    self.arena[new].parent = None;
                    self.arena[new].next_sibling = Some(existing);
                    self.arena[existing].parent = Some(new);
                    if self.root == Some(existing) {
                        self.root = Some(new);
                    }
                }
                Some(parent) => {
                    if self.arena[parent].first_child == Some(existing) {
                        self.arena[parent].first_child = Some(new);
                    } else {
                        self.arena[parent].next_sibling = Some(new);
                    }
                    self.arena[new].parent = Some(parent);
                    self.arena[new].next_sibling = Some(existing);
                    self.arena[existing].parent = Some(new);
                }
            }
            trace!(
                "linked {} above {}",
                self.arena[new].entry.id,
                self.arena[existing].entry.id
            );
            existing = new;
            pending = displaced;
        }
    }

    fn invalidate_counts(&self, from: Index) {
        let mut current = Some(from);
        while let Some(idx) = current {
            match self.arena.get(idx) {
                Some(node) => {
                    node.child_count.set(None);
                    current = node.parent;
                }
                None => break,
            }
        }
    }

    pub(crate) fn set_first_child(&mut self, idx: Index, child: Option<Index>) {
        self.arena[idx].first_child = child;
    }

    pub(crate) fn set_next_sibling(&mut self, idx: Index, sibling: Option<Index>) {
        self.arena[idx].next_sibling = sibling;
    }

    pub(crate) fn set_parent(&mut self, idx: Index, parent: Option<Index>) {
        self.arena[idx].parent = parent;
    }

    pub(crate) fn replace_root(&mut self, idx: Index) {
        self.root = Some(idx);
    }
}

/// Iterator over one sibling chain.
pub struct ChainIter<'a> {
    tree: &'a DiscussionTree,
    next: Option<Index>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = Index;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

/// Pre-order iterator yielding `(index, depth, node)`; depth counts reply levels.
pub struct TreeIterator<'a> {
    tree: &'a DiscussionTree,
    stack: Vec<(Index, usize)>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a DiscussionTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push((root, 0));
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, usize, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (current, depth) = self.stack.pop()?;
        let node = self.tree.get_node(current)?;
        // Sibling pushed first so replies are visited before it
        if let Some(sibling) = node.next_sibling {
            self.stack.push((sibling, depth));
        }
        if let Some(child) = node.first_child {
            self.stack.push((child, depth + 1));
        }
        Some((current, depth, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Content;
    use chrono::{DateTime, Utc};

    fn entry(id: i64) -> Entry {
        Entry::new(id, Content::Text(format!("e{id}")), DateTime::<Utc>::UNIX_EPOCH)
    }

    fn ids(tree: &DiscussionTree) -> Vec<i64> {
        tree.iter().map(|(_, _, n)| n.entry.id.0).collect()
    }

    #[test]
    fn given_empty_slot_when_add_child_then_becomes_first_child() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(1)).unwrap();
        let a = tree.push_child(root, entry(2)).unwrap();

        assert_eq!(tree.first_child(root), Some(a));
        assert_eq!(tree.parent(a), Some(root));
        assert!(tree.is_chain_head(a));
    }

    #[test]
    fn given_occupied_slot_when_add_child_then_new_node_goes_first() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(1)).unwrap();
        let a = tree.push_child(root, entry(2)).unwrap();
        let b = tree.push_child(root, entry(3)).unwrap();
        let c = tree.push_child(root, entry(4)).unwrap();

        assert_eq!(ids(&tree), vec![1, 4, 3, 2]);
        assert_eq!(tree.parent(c), Some(root));
        assert_eq!(tree.parent(b), Some(c));
        assert_eq!(tree.parent(a), Some(b));
        assert!(tree.is_chain_head(c));
        assert!(!tree.is_chain_head(b));
        assert_eq!(tree.thread_parent(a), Some(root));
    }

    #[test]
    fn given_mid_chain_node_when_add_sibling_then_spliced_above_it() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(1)).unwrap();
        let a = tree.push_child(root, entry(2)).unwrap();
        let _b = tree.push_child(root, entry(3)).unwrap();
        let x = tree.insert(entry(9)).unwrap();

        tree.add_sibling(a, x).unwrap();

        assert_eq!(ids(&tree), vec![1, 3, 9, 2]);
        assert_eq!(tree.parent(a), Some(x));
        assert_eq!(tree.thread_parent(x), Some(root));
    }

    #[test]
    fn given_root_when_add_sibling_then_new_node_becomes_root() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(1)).unwrap();
        let x = tree.insert(entry(2)).unwrap();

        tree.add_sibling(root, x).unwrap();

        assert_eq!(tree.root(), Some(x));
        assert_eq!(tree.parent(x), None);
        assert_eq!(tree.parent(root), Some(x));
        assert_eq!(ids(&tree), vec![2, 1]);
    }

    #[test]
    fn given_attached_node_when_add_child_then_rejected() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(1)).unwrap();
        let a = tree.push_child(root, entry(2)).unwrap();
        let b = tree.push_child(root, entry(3)).unwrap();

        assert_eq!(
            tree.add_child(a, b),
            Err(DomainError::AlreadyAttached(EntryId(3)))
        );
        assert_eq!(
            tree.add_child(a, root),
            Err(DomainError::AlreadyAttached(EntryId(1)))
        );
    }

    #[test]
    fn given_detached_subtree_when_attached_below_itself_then_cycle_rejected() {
        let mut tree = DiscussionTree::new();
        let top = tree.insert(entry(1)).unwrap();
        let below = tree.push_child(top, entry(2)).unwrap();

        assert!(matches!(
            tree.add_child(below, top),
            Err(DomainError::WouldCycle { .. })
        ));
    }

    #[test]
    fn given_duplicate_id_when_insert_then_rejected() {
        let mut tree = DiscussionTree::new();
        tree.insert(entry(1)).unwrap();
        assert_eq!(
            tree.insert(entry(1)),
            Err(DomainError::DuplicateEntry(EntryId(1)))
        );
    }

    #[test]
    fn given_subtree_when_child_count_then_counts_descendants_and_refreshes() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(1)).unwrap();
        let a = tree.push_child(root, entry(2)).unwrap();
        tree.push_child(a, entry(3)).unwrap();
        tree.push_child(root, entry(4)).unwrap();

        assert_eq!(tree.child_count(root), 3);
        assert_eq!(tree.child_count(a), 1);

        tree.push_child(a, entry(5)).unwrap();
        assert_eq!(tree.child_count(a), 2);
        assert_eq!(tree.child_count(root), 4);
    }

    #[test]
    fn given_nested_tree_when_depth_and_leaves_then_logical_levels() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(1)).unwrap();
        let a = tree.push_child(root, entry(2)).unwrap();
        let b = tree.push_child(a, entry(3)).unwrap();
        tree.push_child(b, entry(4)).unwrap();
        tree.push_child(root, entry(5)).unwrap();

        assert_eq!(tree.depth(), 4);
        assert_eq!(tree.leaf_nodes(), vec![EntryId(5), EntryId(4)]);
        assert_eq!(tree.children(root).count(), 2);
        assert_eq!(tree.points(None), 0);
    }
}
