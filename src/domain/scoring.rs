//! Time-decayed aggregate scoring.
//!
//! An entry's score combines its own points, a decayed share of everything
//! posted below it, and a gravity term that sinks it as it ages:
//!
//! ```text
//! score = (points + decay * recursive_points(first_child) + epsilon)
//!         / (age_hours + age_offset_hours) ^ gravity
//! ```
//!
//! truncated (not rounded) to `precision` decimal digits.

use chrono::{DateTime, Utc};
use generational_arena::Index;
use serde::{Deserialize, Serialize};

use crate::domain::arena::DiscussionTree;
use crate::domain::entities::Entry;

/// Share of a subtree's points that reaches the level above.
pub const DECAY: f64 = 0.5;
/// Keeps the numerator positive so pure age still orders zero-point entries.
pub const EPSILON: f64 = 1e-3;
pub const GRAVITY: f64 = 1.8;
pub const AGE_OFFSET_HOURS: f64 = 2.0;
/// Decimal digits kept after truncation.
pub const SCORE_PRECISION: u32 = 8;

/// Tunable scoring constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    pub decay: f64,
    pub epsilon: f64,
    pub gravity: f64,
    pub age_offset_hours: f64,
    pub precision: u32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            decay: DECAY,
            epsilon: EPSILON,
            gravity: GRAVITY,
            age_offset_hours: AGE_OFFSET_HOURS,
            precision: SCORE_PRECISION,
        }
    }
}

/// Truncate toward zero to `digits` decimal places.
pub fn truncate(value: f64, digits: u32) -> f64 {
    let exp = 10f64.powi(digits as i32);
    (value * exp).trunc() / exp
}

/// Scores entries against a single fixed instant.
///
/// Holding `now` fixed keeps every comparison within one arrangement pass
/// consistent, however long the pass takes.
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    params: ScoringParams,
    now: DateTime<Utc>,
}

impl Ranker {
    pub fn new(params: ScoringParams, now: DateTime<Utc>) -> Self {
        Self { params, now }
    }

    /// Ranker pinned to the current wall-clock time.
    pub fn at_now(params: ScoringParams) -> Self {
        Self::new(params, Utc::now())
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Hours since creation; entries dated in the future count as brand new.
    pub fn age_hours(&self, entry: &Entry) -> f64 {
        let millis = (self.now - entry.created).num_milliseconds().max(0);
        millis as f64 / 3_600_000.0
    }

    /// Points at `idx`, plus decayed points of its replies and of every
    /// sibling after it in the chain. 0 for an absent node.
    pub fn recursive_points(&self, tree: &DiscussionTree, idx: Option<Index>) -> f64 {
        let chain: Vec<Index> = tree.chain(idx).collect();
        chain.iter().rev().fold(0.0, |rest, &member| {
            let below = self.recursive_points(tree, tree.first_child(member));
            tree.points(Some(member)) as f64 + self.params.decay * (below + rest)
        })
    }

    /// Display and sort score of `idx`; 0 for an absent node.
    pub fn score(&self, tree: &DiscussionTree, idx: Option<Index>) -> f64 {
        let Some(entry) = idx.and_then(|i| tree.entry(i)) else {
            return 0.0;
        };
        let child_points = match idx.and_then(|i| tree.first_child(i)) {
            Some(child) => self.params.decay * self.recursive_points(tree, Some(child)),
            None => 0.0,
        };
        truncate(self.raw_score(entry, child_points), self.params.precision)
    }

    fn raw_score(&self, entry: &Entry, child_points: f64) -> f64 {
        let p = &self.params;
        (entry.points() as f64 + child_points + p.epsilon)
            / (self.age_hours(entry) + p.age_offset_hours).powf(p.gravity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Content;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn ranker() -> Ranker {
        Ranker::new(ScoringParams::default(), now())
    }

    fn entry(id: i64, up: u64, down: u64, age: Duration) -> Entry {
        Entry::new(id, Content::Text("x".into()), now() - age).with_votes(up, down)
    }

    #[rstest]
    #[case(1.234_567_899, 8, 1.234_567_89)]
    #[case(-1.234_567_899, 8, -1.234_567_89)]
    #[case(0.999, 2, 0.99)]
    fn given_value_when_truncate_then_toward_zero(
        #[case] value: f64,
        #[case] digits: u32,
        #[case] expected: f64,
    ) {
        assert!((truncate(value, digits) - expected).abs() < 1e-12);
    }

    #[test]
    fn given_absent_node_when_scoring_then_zero() {
        let tree = DiscussionTree::new();
        let r = ranker();
        assert_eq!(tree.points(None), 0);
        assert_eq!(r.recursive_points(&tree, None), 0.0);
        assert_eq!(r.score(&tree, None), 0.0);
    }

    #[test]
    fn given_chain_when_recursive_points_then_decays_along_both_axes() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(1, 0, 0, Duration::zero())).unwrap();
        // Chain under root after insertion: [b, a]
        let a = tree.push_child(root, entry(2, 4, 0, Duration::zero())).unwrap();
        let b = tree.push_child(root, entry(3, 2, 0, Duration::zero())).unwrap();
        tree.push_child(a, entry(4, 8, 0, Duration::zero())).unwrap();

        let r = ranker();
        // rp(a) = 4 + 0.5 * 8 = 8; rp(b) = 2 + 0.5 * rp(a) = 6
        assert_eq!(r.recursive_points(&tree, Some(a)), 8.0);
        assert_eq!(r.recursive_points(&tree, Some(b)), 6.0);
        assert_eq!(r.recursive_points(&tree, Some(root)), 3.0);
    }

    #[test]
    fn given_new_entry_when_score_then_matches_formula() {
        let mut tree = DiscussionTree::new();
        let root = tree.insert_root(entry(1, 3, 1, Duration::zero())).unwrap();
        let r = ranker();
        let expected = truncate((2.0 + 0.0 + 0.001) / 2f64.powf(1.8), 8);
        assert_eq!(r.score(&tree, Some(root)), expected);
    }

    #[test]
    fn given_fresh_and_two_day_old_entries_when_score_then_fresh_ranks_higher() {
        let mut tree = DiscussionTree::new();
        let fresh = tree.insert(entry(1, 0, 0, Duration::zero())).unwrap();
        let old = tree.insert(entry(2, 0, 0, Duration::hours(48))).unwrap();
        let r = ranker();
        assert!(r.score(&tree, Some(fresh)) > r.score(&tree, Some(old)));
    }

    #[test]
    fn given_future_timestamp_when_age_then_clamped_to_zero() {
        let r = ranker();
        let e = entry(1, 0, 0, Duration::hours(-5));
        assert_eq!(r.age_hours(&e), 0.0);
    }
}
