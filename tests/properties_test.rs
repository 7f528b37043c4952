//! Property tests over randomly shaped threads.

use std::collections::HashSet;

use generational_arena::Index;
use proptest::prelude::*;
use proptest::sample;

use threadrank::domain::{DiscussionTree, EntryId, Ranker, ScoringParams, TreeBuilder};
use threadrank::util::testing::{fixed_now, scored_entry};

/// One entry per element: (points, age in hours, choice of parent among earlier entries).
fn thread_shape() -> impl Strategy<Value = Vec<(i64, i64, sample::Index)>> {
    prop::collection::vec((-5i64..20, 0i64..96, any::<sample::Index>()), 1..40)
}

fn build(shape: &[(i64, i64, sample::Index)]) -> DiscussionTree {
    let entries = shape
        .iter()
        .enumerate()
        .map(|(i, &(points, age, _))| scored_entry(i as i64, points, age));
    let relations = shape.iter().enumerate().skip(1).map(|(i, (_, _, parent))| {
        (EntryId(parent.index(i) as i64), EntryId(i as i64))
    });
    TreeBuilder::new()
        .build(EntryId(0), entries, relations)
        .expect("generated relations are well formed")
}

fn ranker() -> Ranker {
    Ranker::new(ScoringParams::default(), fixed_now())
}

/// Heads of all sibling chains: the root plus every first child.
fn chain_heads(tree: &DiscussionTree) -> Vec<Index> {
    tree.root()
        .into_iter()
        .chain(tree.iter().filter_map(|(idx, _, _)| tree.first_child(idx)))
        .collect()
}

fn order(tree: &DiscussionTree) -> Vec<EntryId> {
    tree.iter().map(|(_, _, node)| node.entry.id).collect()
}

proptest! {
    #[test]
    fn materialized_tree_visits_every_entry_once_parents_first(shape in thread_shape()) {
        let tree = build(&shape);

        let mut seen = HashSet::new();
        for (idx, _, node) in tree.iter() {
            if let Some(parent) = node.parent() {
                prop_assert!(seen.contains(&parent));
            }
            prop_assert!(seen.insert(idx));
        }
        prop_assert_eq!(seen.len(), shape.len());
        prop_assert_eq!(tree.child_count(tree.root().unwrap()), shape.len() as u64 - 1);
    }

    #[test]
    fn arranged_chains_are_non_increasing_by_score(shape in thread_shape()) {
        let mut tree = build(&shape);
        let ranker = ranker();
        ranker.arrange(&mut tree);

        for head in chain_heads(&tree) {
            let scores: Vec<f64> = tree
                .chain(Some(head))
                .map(|m| ranker.score(&tree, Some(m)))
                .collect();
            for pair in scores.windows(2) {
                prop_assert!(pair[0] >= pair[1], "{:?}", scores);
            }
        }
    }

    #[test]
    fn arranging_twice_keeps_order_without_ties(shape in thread_shape()) {
        let mut tree = build(&shape);
        let ranker = ranker();
        ranker.arrange(&mut tree);

        let strictly_ordered = chain_heads(&tree).into_iter().all(|head| {
            let scores: Vec<f64> = tree
                .chain(Some(head))
                .map(|m| ranker.score(&tree, Some(m)))
                .collect();
            scores.windows(2).all(|w| w[0] > w[1])
        });
        prop_assume!(strictly_ordered);

        let once = order(&tree);
        ranker.arrange(&mut tree);
        prop_assert_eq!(once, order(&tree));
    }

    #[test]
    fn every_multi_member_chain_is_sorted_exactly_once(shape in thread_shape()) {
        let mut tree = build(&shape);
        let multi = chain_heads(&tree)
            .into_iter()
            .filter(|&head| tree.chain(Some(head)).count() > 1)
            .count();

        let report = ranker().arrange(&mut tree);

        prop_assert_eq!(report.chains_sorted, multi);
        prop_assert_eq!(report.nodes, shape.len());
    }

    #[test]
    fn mixed_insertions_lose_and_duplicate_nothing(
        ops in prop::collection::vec((any::<bool>(), any::<sample::Index>()), 1..40)
    ) {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(scored_entry(0, 0, 0)).unwrap();
        let mut attached = vec![root];

        for (i, (as_sibling, anchor)) in ops.iter().enumerate() {
            let new = tree.insert(scored_entry(i as i64 + 1, 0, 0)).unwrap();
            let anchor = *anchor.get(&attached);
            if *as_sibling {
                tree.add_sibling(anchor, new).unwrap();
            } else {
                tree.add_child(anchor, new).unwrap();
            }
            attached.push(new);
        }

        let mut seen = HashSet::new();
        for (idx, _, _) in tree.iter() {
            prop_assert!(seen.insert(idx), "visited twice");
        }
        prop_assert_eq!(seen.len(), ops.len() + 1);
        for idx in seen {
            prop_assert!(tree.parent(idx).is_some() || tree.root() == Some(idx));
        }
    }

    #[test]
    fn younger_entry_never_scores_below_older_twin(
        points in -5i64..50,
        younger in 0i64..200,
        extra in 0i64..200,
    ) {
        let mut tree = DiscussionTree::new();
        let young = tree.insert(scored_entry(1, points, younger)).unwrap();
        let old = tree.insert(scored_entry(2, points, younger + extra)).unwrap();
        let ranker = ranker();

        let (y, o) = (ranker.score(&tree, Some(young)), ranker.score(&tree, Some(old)));
        if points >= 0 {
            prop_assert!(y >= o, "{} < {}", y, o);
        } else {
            // A negative numerator decays toward zero from below
            prop_assert!(y <= o, "{} > {}", y, o);
        }
    }
}
