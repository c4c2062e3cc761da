use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of commenter slots every report row carries.
pub const COMMENTER_SLOTS: usize = 3;

/// Author name Reddit reports for removed accounts.
pub const DELETED_AUTHOR: &str = "[deleted]";

pub const REDDIT_BASE_URL: &str = "https://www.reddit.com";

/// Report columns, in the order rows are written.
pub const REPORT_COLUMNS: [&str; 6 + 4 * COMMENTER_SLOTS] = [
    "Subreddit",
    "Post Link",
    "Poster",
    "Poster Status",
    "Post Status",
    "Poster Message",
    "Commenter 1",
    "Commenter 1 Upvotes",
    "Commenter 1 Link",
    "Commenter 1 Message",
    "Commenter 2",
    "Commenter 2 Upvotes",
    "Commenter 2 Link",
    "Commenter 2 Message",
    "Commenter 3",
    "Commenter 3 Upvotes",
    "Commenter 3 Link",
    "Commenter 3 Message",
];

/// Canonical post id parsed from a link (e.g. `1abcde`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostHandle(String);

impl PostHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reddit fullname of the post (`t3_<id>`).
    pub fn fullname(&self) -> String {
        format!("t3_{}", self.0)
    }
}

impl fmt::Display for PostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final contactability of an account, most reachable first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    Active,
    CannotBeMessaged,
    Suspended,
    Deleted,
    Error,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::CannotBeMessaged => "cannot be messaged",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Deleted => "deleted",
            AccountStatus::Error => "error",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the layered identity/profile probes before any refinement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Verdict {
    Active,
    CannotBeMessaged,
    SuspendedOrDeleted,
    Error,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Active => "active",
            Verdict::CannotBeMessaged => "cannot be messaged",
            Verdict::SuspendedOrDeleted => "suspended or deleted",
            Verdict::Error => "error",
        }
    }
}

/// Lifecycle of the post itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PostStatus {
    Active,
    Archived,
    Deleted,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Active => "active",
            PostStatus::Archived => "archived",
            PostStatus::Deleted => "deleted",
        }
    }

    /// Removal wins over archival.
    pub fn from_flags(removed: bool, archived: bool) -> Self {
        if removed {
            PostStatus::Deleted
        } else if archived {
            PostStatus::Archived
        } else {
            PostStatus::Active
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub author: Option<String>,
    pub subreddit: String,
    pub removed: bool,
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    /// Fullname of the parent (`t3_*` for top-level comments, `t1_*` for replies).
    pub parent_id: String,
    pub author: Option<String>,
    pub score: i64,
    pub distinguished: Option<String>,
    pub permalink: String,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.starts_with("t3_")
    }

    pub fn link(&self) -> String {
        format!("{}{}", REDDIT_BASE_URL, self.permalink)
    }
}

/// A "load more comments" placeholder. Empty `children` means a
/// "continue this thread" link that must be fetched by parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoreStub {
    pub id: String,
    pub parent_id: String,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentEntry {
    Comment(Comment),
    More(MoreStub),
}

/// A post with its comment tree flattened depth-first, in traversal order.
#[derive(Debug, Clone)]
pub struct PostThread {
    pub post: Post,
    pub entries: Vec<CommentEntry>,
}

impl PostThread {
    pub fn pending_stubs(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, CommentEntry::More(_)))
            .count()
    }

    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.entries.iter().filter_map(|e| match e {
            CommentEntry::Comment(c) => Some(c),
            CommentEntry::More(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommenterCandidate {
    pub handle: String,
    pub score: i64,
    pub comment_id: String,
    pub permalink: String,
}

impl CommenterCandidate {
    pub fn link(&self) -> String {
        format!("{}{}", REDDIT_BASE_URL, self.permalink)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutreachMessage {
    pub recipient: String,
    pub text: String,
}

/// One commenter column group of a report row. Empty strings when unused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommenterSlot {
    pub handle: String,
    pub upvotes: String,
    pub link: String,
    pub message: String,
}

/// One report row per processed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub subreddit: String,
    pub post_link: String,
    pub poster: String,
    pub poster_status: String,
    pub post_status: String,
    pub poster_message: String,
    pub commenters: [CommenterSlot; COMMENTER_SLOTS],
}

impl AnalysisRecord {
    /// Cells in [`REPORT_COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.subreddit.clone(),
            self.post_link.clone(),
            self.poster.clone(),
            self.poster_status.clone(),
            self.post_status.clone(),
            self.poster_message.clone(),
        ];
        for slot in &self.commenters {
            row.push(slot.handle.clone());
            row.push(slot.upvotes.clone());
            row.push(slot.link.clone());
            row.push(slot.message.clone());
        }
        row
    }

    /// Inverse of [`AnalysisRecord::to_row`]; `None` if the width is wrong.
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.len() != REPORT_COLUMNS.len() {
            return None;
        }
        let mut commenters: [CommenterSlot; COMMENTER_SLOTS] = Default::default();
        for (i, slot) in commenters.iter_mut().enumerate() {
            let base = 6 + i * 4;
            *slot = CommenterSlot {
                handle: row[base].clone(),
                upvotes: row[base + 1].clone(),
                link: row[base + 2].clone(),
                message: row[base + 3].clone(),
            };
        }
        Some(Self {
            subreddit: row[0].clone(),
            post_link: row[1].clone(),
            poster: row[2].clone(),
            poster_status: row[3].clone(),
            post_status: row[4].clone(),
            poster_message: row[5].clone(),
            commenters,
        })
    }
}
