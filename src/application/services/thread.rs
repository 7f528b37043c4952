//! Thread service
//!
//! Loads a thread from the entry store, materializes it into a tree and
//! arranges it for display. Also records new entries and votes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{
    ArrangeReport, DiscussionTree, Entry, EntryDraft, EntryId, Extent, Ranker, ScoringParams,
    TreeBuilder, Vote, VoteDirection,
};
use crate::infrastructure::traits::EntryStore;

/// A materialized, fully arranged thread.
#[derive(Debug)]
pub struct RankedThread {
    pub tree: DiscussionTree,
    pub report: ArrangeReport,
    /// The ranker that arranged the tree; reuse it to display scores.
    pub ranker: Ranker,
}

/// Service for building ranked discussion threads.
pub struct ThreadService {
    store: Arc<dyn EntryStore>,
    scoring: ScoringParams,
}

impl ThreadService {
    /// Create a new thread service.
    pub fn new(store: Arc<dyn EntryStore>, scoring: ScoringParams) -> Self {
        Self { store, scoring }
    }

    /// Build and arrange the thread rooted at `root`, scored against the current time.
    pub fn ranked_thread(
        &self,
        root: EntryId,
        extent: Extent,
        viewer: Option<i64>,
    ) -> ApplicationResult<RankedThread> {
        self.ranked_thread_at(root, extent, viewer, Utc::now())
    }

    /// Build and arrange the thread rooted at `root`, scored against `now`.
    #[instrument(level = "debug", skip(self))]
    pub fn ranked_thread_at(
        &self,
        root: EntryId,
        extent: Extent,
        viewer: Option<i64>,
        now: DateTime<Utc>,
    ) -> ApplicationResult<RankedThread> {
        let snapshot = self
            .store
            .load()
            .with_path_context("load snapshot", self.store.location())?;
        let thread = snapshot.thread(root, extent, viewer)?;

        let mut tree = TreeBuilder::new().build(thread.root, thread.entries, thread.relations)?;
        let ranker = Ranker::new(self.scoring, now);
        let report = ranker.arrange(&mut tree);
        debug!(
            "ranked thread {}: {} entries, {} chains sorted",
            root,
            tree.len(),
            report.chains_sorted
        );

        Ok(RankedThread {
            tree,
            report,
            ranker,
        })
    }

    /// Store a new entry below `parent`, or at top level when `parent` is `None`.
    #[instrument(level = "debug", skip(self, draft))]
    pub fn post(
        &self,
        parent: Option<EntryId>,
        draft: EntryDraft,
        author_id: i64,
    ) -> ApplicationResult<Entry> {
        let location = self.store.location();
        let mut snapshot = self.store.load().with_path_context("load snapshot", location)?;
        let entry = snapshot.add_entry(parent, draft, author_id, Utc::now())?;
        self.store
            .save(&snapshot)
            .with_path_context("save snapshot", location)?;
        info!("created entry {}", entry.id);
        Ok(entry)
    }

    /// Record how `user_id` votes on `entry_id`, replacing any earlier vote.
    #[instrument(level = "debug", skip(self))]
    pub fn vote(
        &self,
        entry_id: EntryId,
        user_id: i64,
        direction: VoteDirection,
    ) -> ApplicationResult<Vote> {
        let location = self.store.location();
        let mut snapshot = self.store.load().with_path_context("load snapshot", location)?;
        let vote = Vote {
            entry_id,
            user_id,
            direction,
            created: Utc::now(),
        };
        snapshot.upsert_vote(vote.clone())?;
        self.store
            .save(&snapshot)
            .with_path_context("save snapshot", location)?;
        Ok(vote)
    }

    pub fn find_vote(&self, entry_id: EntryId, user_id: i64) -> ApplicationResult<Option<Vote>> {
        let snapshot = self
            .store
            .load()
            .with_path_context("load snapshot", self.store.location())?;
        Ok(snapshot.find_vote(entry_id, user_id).cloned())
    }
}
