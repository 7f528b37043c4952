//! Domain entities: core data structures

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};

/// Opaque identifier of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// What an entry carries besides its title.
///
/// A body and a link are mutually exclusive; an entry with neither is a
/// pure container (a forum).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Content {
    #[default]
    Container,
    Text(String),
    Link(String),
}

impl Content {
    pub fn is_container(&self) -> bool {
        matches!(self, Content::Container)
    }

    /// Body text or URL, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Content::Container => None,
            Content::Text(s) | Content::Link(s) => Some(s),
        }
    }
}

/// How a single user voted on an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
    #[default]
    None,
}

/// A node in the discussion tree: forum, post, or comment.
///
/// The vote tallies are a snapshot taken when the entry was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Content,
    pub author_id: i64,
    #[serde(default)]
    pub author_handle: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub upvotes: u64,
    #[serde(default)]
    pub downvotes: u64,
    /// How the viewing user voted, when a viewer is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<VoteDirection>,
}

impl Entry {
    pub fn new(id: impl Into<EntryId>, content: Content, created: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: None,
            content,
            author_id: 0,
            author_handle: None,
            created,
            upvotes: 0,
            downvotes: 0,
            user_vote: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author_id: i64) -> Self {
        self.author_id = author_id;
        self
    }

    pub fn with_votes(mut self, upvotes: u64, downvotes: u64) -> Self {
        self.upvotes = upvotes;
        self.downvotes = downvotes;
        self
    }

    /// Upvotes minus downvotes.
    pub fn points(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }

    pub fn is_forum(&self) -> bool {
        self.content.is_container()
    }

    /// Short human label: the title if present, else the start of the body.
    pub fn label(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        match self.content.as_str() {
            Some(text) => {
                let mut excerpt: String = text.chars().take(48).collect();
                if text.chars().count() > 48 {
                    excerpt.push('…');
                }
                excerpt
            }
            None => format!("#{}", self.id),
        }
    }
}

/// User input for a new entry, before it has an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub title: Option<String>,
    pub content: Content,
}

impl EntryDraft {
    pub fn text(title: Option<String>, body: impl Into<String>) -> Self {
        Self {
            title,
            content: Content::Text(body.into()),
        }
    }

    pub fn link(title: Option<String>, url: impl Into<String>) -> Self {
        Self {
            title,
            content: Content::Link(url.into()),
        }
    }

    /// Trim whitespace and reject drafts without a body or URL.
    pub fn normalize(self) -> DomainResult<Self> {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let content = match self.content {
            Content::Text(body) => Content::Text(body.trim().to_string()),
            Content::Link(url) => Content::Link(url.trim().to_string()),
            Content::Container => Content::Container,
        };
        match content.as_str() {
            Some(s) if !s.is_empty() => Ok(Self { title, content }),
            _ => Err(DomainError::InvalidEntry {
                message: "the body must not be empty or consist solely of whitespace".into(),
            }),
        }
    }
}

/// One user's vote on one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub entry_id: EntryId,
    pub user_id: i64,
    pub direction: VoteDirection,
    pub created: DateTime<Utc>,
}

/// One row of the ancestry closure relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClosureRow {
    pub ancestor: EntryId,
    pub descendant: EntryId,
    pub depth: u32,
}

/// Reduce closure rows to the (ancestor, descendant) pairs of direct parentage.
///
/// Self rows (depth 0) are kept; materialization skips them.
pub fn direct_edges<'a, I>(rows: I) -> Vec<(EntryId, EntryId)>
where
    I: IntoIterator<Item = &'a ClosureRow>,
{
    rows.into_iter()
        .filter(|row| row.depth <= 1)
        .map(|row| (row.ancestor, row.descendant))
        .collect()
}

/// How much of a thread to load below its root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Extent {
    #[default]
    AllDescendants,
    DepthOne,
}

impl Extent {
    pub fn max_depth(&self) -> Option<u32> {
        match self {
            Extent::AllDescendants => None,
            Extent::DepthOne => Some(1),
        }
    }
}
