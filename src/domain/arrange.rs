//! Authoritative ordering pass.
//!
//! Replies are arranged before the chain they hang from, because a node's
//! score folds in the (position-weighted) points of its reply chain. Each
//! sibling chain is then merge-sorted in place, highest score first.

use std::collections::HashMap;

use generational_arena::Index;
use tracing::{debug, instrument, trace};

use crate::domain::arena::DiscussionTree;
use crate::domain::scoring::Ranker;

/// Summary of one arrangement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrangeReport {
    /// Sibling chains with more than one member that were sorted
    pub chains_sorted: usize,
    /// Nodes visited
    pub nodes: usize,
}

impl Ranker {
    /// Order every sibling chain by descending score.
    ///
    /// On equal scores the merge emits the element from the second half
    /// first. Links stay mutually consistent and the tree root is updated if
    /// the top-level chain gets a new head.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn arrange(&self, tree: &mut DiscussionTree) -> ArrangeReport {
        let mut report = ArrangeReport::default();
        if let Some(root) = tree.root() {
            self.arrange_chain(tree, root, &mut report);
        }
        debug!(
            "arranged {} nodes, {} chains sorted",
            report.nodes, report.chains_sorted
        );
        report
    }

    fn arrange_chain(&self, tree: &mut DiscussionTree, head: Index, report: &mut ArrangeReport) {
        let sort_here = tree.is_chain_head(head);
        let members: Vec<Index> = tree.chain(Some(head)).collect();
        report.nodes += members.len();

        for &member in &members {
            if let Some(child) = tree.first_child(member) {
                self.arrange_chain(tree, child, report);
            }
        }

        if sort_here && members.len() > 1 {
            // Member scores cannot change while their own chain is reordered.
            let scores: HashMap<Index, f64> = members
                .iter()
                .map(|&m| (m, self.score(tree, Some(m))))
                .collect();
            self.sort_chain(tree, head, &scores);
            report.chains_sorted += 1;
        }
    }

    fn sort_chain(&self, tree: &mut DiscussionTree, head: Index, scores: &HashMap<Index, f64>) {
        let anchor = tree.parent(head);
        let was_root = tree.root() == Some(head);

        let new_head = merge_sort(tree, head, scores);

        tree.set_parent(new_head, anchor);
        match anchor {
            Some(parent) => tree.set_first_child(parent, Some(new_head)),
            None if was_root => tree.replace_root(new_head),
            None => {}
        }
        let mut previous = new_head;
        while let Some(next) = tree.next_sibling(previous) {
            tree.set_parent(next, Some(previous));
            previous = next;
        }
        trace!("chain re-headed at {:?}", tree.entry(new_head).map(|e| e.id));
    }
}

fn merge_sort(tree: &mut DiscussionTree, head: Index, scores: &HashMap<Index, f64>) -> Index {
    let middle = middle_of(tree, head);
    let Some(second) = tree.next_sibling(middle) else {
        return head;
    };
    tree.set_next_sibling(middle, None);

    let left = merge_sort(tree, head, scores);
    let right = merge_sort(tree, second, scores);
    merge(tree, left, right, scores)
}

/// Slow/fast walk; for even lengths returns the last node of the first half.
fn middle_of(tree: &DiscussionTree, head: Index) -> Index {
    let mut slow = head;
    let mut fast = head;
    while let Some(next) = tree.next_sibling(fast) {
        let Some(after) = tree.next_sibling(next) else {
            break;
        };
        slow = tree.next_sibling(slow).unwrap_or(slow);
        fast = after;
    }
    slow
}

fn merge(
    tree: &mut DiscussionTree,
    left: Index,
    right: Index,
    scores: &HashMap<Index, f64>,
) -> Index {
    let score_of = |idx: Index| scores.get(&idx).copied().unwrap_or(0.0);

    let mut a = Some(left);
    let mut b = Some(right);
    let mut head = left;
    let mut tail: Option<Index> = None;

    while let (Some(x), Some(y)) = (a, b) {
        let taken = if score_of(y) < score_of(x) {
            a = tree.next_sibling(x);
            x
        } else {
            b = tree.next_sibling(y);
            y
        };
        match tail {
            None => head = taken,
            Some(t) => tree.set_next_sibling(t, Some(taken)),
        }
        tail = Some(taken);
    }

    if let Some(t) = tail {
        tree.set_next_sibling(t, a.or(b));
    }
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Content, Entry};
    use crate::domain::scoring::ScoringParams;
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn entry(id: i64, up: u64) -> Entry {
        Entry::new(id, Content::Text(format!("e{id}")), now()).with_votes(up, 0)
    }

    fn order(tree: &DiscussionTree, parent: Index) -> Vec<i64> {
        tree.children(parent)
            .map(|i| tree.entry(i).map_or(0, |e| e.id.0))
            .collect()
    }

    #[test]
    fn given_flat_chain_when_arrange_then_descending_points() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(0, 0)).unwrap();
        for (id, up) in [(1, 5), (2, 1), (3, 9), (4, 3), (5, 7)] {
            tree.push_child(root, entry(id, up)).unwrap();
        }
        let ranker = Ranker::new(ScoringParams::default(), now());

        let report = ranker.arrange(&mut tree);

        assert_eq!(order(&tree, root), vec![3, 5, 1, 4, 2]);
        assert_eq!(report.chains_sorted, 1);
        assert_eq!(report.nodes, 6);
    }

    #[test]
    fn given_two_tied_siblings_when_arrange_then_second_half_wins() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(0, 0)).unwrap();
        // Insertion puts the later node first: [2, 1]
        tree.push_child(root, entry(1, 4)).unwrap();
        tree.push_child(root, entry(2, 4)).unwrap();
        let ranker = Ranker::new(ScoringParams::default(), now());

        ranker.arrange(&mut tree);

        assert_eq!(order(&tree, root), vec![1, 2]);
    }

    #[test]
    fn given_arranged_chain_when_checking_links_then_parents_are_consistent() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(0, 0)).unwrap();
        for (id, up) in [(1, 2), (2, 8), (3, 5)] {
            tree.push_child(root, entry(id, up)).unwrap();
        }
        Ranker::new(ScoringParams::default(), now()).arrange(&mut tree);

        let head = tree.first_child(root).unwrap();
        assert_eq!(tree.parent(head), Some(root));
        let mut previous = head;
        for next in tree.children(root).skip(1) {
            assert_eq!(tree.parent(next), Some(previous));
            assert!(!tree.is_chain_head(next));
            previous = next;
        }
    }
}
