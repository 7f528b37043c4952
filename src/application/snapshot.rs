//! Stored state of a forum: entries, their ancestry closure, and votes.
//!
//! Mirrors a closure-table schema: every entry has a self row (depth 0) and
//! one row per ancestor. Vote tallies are computed when entries are read.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    direct_edges, ClosureRow, Content, Entry, EntryDraft, EntryId, Extent, Vote, VoteDirection,
};

/// Persisted form of an entry (no vote tallies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: EntryId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Content,
    pub author_id: i64,
    pub created: DateTime<Utc>,
}

/// A user known to the forum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub handle: String,
}

/// What a thread query hands to the tree builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadSnapshot {
    pub root: EntryId,
    pub entries: Vec<Entry>,
    pub relations: Vec<(EntryId, EntryId)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub entries: Vec<EntryRecord>,
    pub closures: Vec<ClosureRow>,
    pub votes: Vec<Vote>,
}

impl Snapshot {
    fn record(&self, id: EntryId) -> Option<&EntryRecord> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn next_id(&self) -> EntryId {
        EntryId(self.entries.iter().map(|e| e.id.0).max().unwrap_or(0) + 1)
    }

    fn handles(&self) -> HashMap<i64, &str> {
        self.accounts
            .iter()
            .map(|a| (a.id, a.handle.as_str()))
            .collect()
    }

    /// Entry with summed vote tallies and, if `viewer` is given, the viewer's own vote.
    pub fn entry(&self, id: EntryId, viewer: Option<i64>) -> Option<Entry> {
        let record = self.record(id)?;
        Some(self.hydrate(record, &self.handles(), viewer))
    }

    fn hydrate(&self, record: &EntryRecord, handles: &HashMap<i64, &str>, viewer: Option<i64>) -> Entry {
        let mut entry = Entry {
            id: record.id,
            title: record.title.clone(),
            content: record.content.clone(),
            author_id: record.author_id,
            author_handle: handles.get(&record.author_id).map(|h| h.to_string()),
            created: record.created,
            upvotes: 0,
            downvotes: 0,
            user_vote: None,
        };
        for vote in self.votes.iter().filter(|v| v.entry_id == record.id) {
            match vote.direction {
                VoteDirection::Up => entry.upvotes += 1,
                VoteDirection::Down => entry.downvotes += 1,
                VoteDirection::None => {}
            }
            if viewer == Some(vote.user_id) {
                entry.user_vote = Some(vote.direction);
            }
        }
        if viewer.is_some() && entry.user_vote.is_none() {
            entry.user_vote = Some(VoteDirection::None);
        }
        entry
    }

    /// Entries below `root` (root included) within `extent`, plus the
    /// direct-parent relation among them.
    #[instrument(level = "debug", skip(self))]
    pub fn thread(
        &self,
        root: EntryId,
        extent: Extent,
        viewer: Option<i64>,
    ) -> ApplicationResult<ThreadSnapshot> {
        if self.record(root).is_none() {
            return Err(ApplicationError::EntryNotFound(root));
        }
        let within = |depth: u32| extent.max_depth().map_or(true, |max| depth <= max);

        let members: BTreeSet<EntryId> = self
            .closures
            .iter()
            .filter(|row| row.ancestor == root && within(row.depth))
            .map(|row| row.descendant)
            .chain(std::iter::once(root))
            .collect();

        let handles = self.handles();
        let entries: Vec<Entry> = members
            .iter()
            .filter_map(|id| self.record(*id))
            .map(|record| self.hydrate(record, &handles, viewer))
            .collect();

        let mut rows: Vec<&ClosureRow> = self
            .closures
            .iter()
            .filter(|row| members.contains(&row.ancestor) && members.contains(&row.descendant))
            .collect();
        rows.sort_by_key(|row| (row.descendant, row.depth));
        let relations = direct_edges(rows);

        debug!(
            "thread {}: {} entries, {} relation rows",
            root,
            entries.len(),
            relations.len()
        );
        Ok(ThreadSnapshot {
            root,
            entries,
            relations,
        })
    }

    /// Store a new entry under `parent` (or at top level) and extend the closure.
    #[instrument(level = "debug", skip(self, draft))]
    pub fn add_entry(
        &mut self,
        parent: Option<EntryId>,
        draft: EntryDraft,
        author_id: i64,
        now: DateTime<Utc>,
    ) -> ApplicationResult<Entry> {
        let draft = draft.normalize()?;
        if let Some(p) = parent {
            if self.record(p).is_none() {
                return Err(ApplicationError::EntryNotFound(p));
            }
        }

        let id = self.next_id();
        self.entries.push(EntryRecord {
            id,
            title: draft.title,
            content: draft.content,
            author_id,
            created: now,
        });

        let mut rows = vec![ClosureRow {
            ancestor: id,
            descendant: id,
            depth: 0,
        }];
        if let Some(p) = parent {
            rows.extend(
                self.closures
                    .iter()
                    .filter(|row| row.descendant == p)
                    .map(|row| ClosureRow {
                        ancestor: row.ancestor,
                        descendant: id,
                        depth: row.depth + 1,
                    }),
            );
        }
        rows.sort_by_key(|row| row.depth);
        self.closures.extend(rows);

        self.entry(id, None).ok_or(ApplicationError::EntryNotFound(id))
    }

    /// Insert or replace the vote of `vote.user_id` on `vote.entry_id`.
    pub fn upsert_vote(&mut self, vote: Vote) -> ApplicationResult<()> {
        if self.record(vote.entry_id).is_none() {
            return Err(ApplicationError::EntryNotFound(vote.entry_id));
        }
        match self
            .votes
            .iter_mut()
            .find(|v| v.entry_id == vote.entry_id && v.user_id == vote.user_id)
        {
            Some(existing) => {
                existing.direction = vote.direction;
                existing.created = vote.created;
            }
            None => self.votes.push(vote),
        }
        Ok(())
    }

    pub fn find_vote(&self, entry_id: EntryId, user_id: i64) -> Option<&Vote> {
        self.votes
            .iter()
            .find(|v| v.entry_id == entry_id && v.user_id == user_id)
    }
}
