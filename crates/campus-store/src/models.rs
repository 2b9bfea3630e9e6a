//! Domain model structs persisted in the forum database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer.

use campus_shared::{QueryId, ReplyId, Role, Target, UserId, VoteType};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A portal user as known to the forum.
///
/// The identity service owns these records; the forum only writes the block
/// columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub role: Role,
    /// Administrators belong to a department; `ALL_BRANCHES` spans them all.
    pub department: Option<String>,
    pub is_forum_blocked: bool,
    /// The administrator who imposed the current block, if any.
    pub blocked_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Current time at the microsecond precision timestamps are stored with.
pub fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// ---------------------------------------------------------------------------
// Discussion tree
// ---------------------------------------------------------------------------

/// A top-level forum post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub id: QueryId,
    pub author_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
    pub is_locked: bool,
    pub is_pinned: bool,
}

impl Query {
    pub fn new(author_id: UserId, text: impl Into<String>) -> Self {
        Self {
            id: QueryId::new(),
            author_id,
            text: text.into(),
            created_at: stored_now(),
            edited: false,
            is_locked: false,
            is_pinned: false,
        }
    }
}

/// A threaded response to a query or to another reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: ReplyId,
    pub query_id: QueryId,
    /// `None` for replies attached directly to the query.
    pub parent_id: Option<ReplyId>,
    pub author_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
    pub is_pinned: bool,
}

impl Reply {
    pub fn new(
        author_id: UserId,
        query_id: QueryId,
        parent_id: Option<ReplyId>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: ReplyId::new(),
            query_id,
            parent_id,
            author_id,
            text: text.into(),
            created_at: stored_now(),
            edited: false,
            is_pinned: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

/// A like/dislike left by one user on one post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub user_id: UserId,
    pub target: Target,
    pub vote_type: VoteType,
}

/// A heart joined with the role and name of the user who left it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HeartRecord {
    pub user_id: UserId,
    pub target: Target,
    pub author_name: String,
    pub author_role: Role,
}

/// Vote counts for one target as seen by one user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub like_count: u32,
    pub dislike_count: u32,
    pub viewer_vote: Option<VoteType>,
}

/// Heart state for one target after a toggle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HeartState {
    pub hearted: bool,
    pub heart_count: u32,
}

/// Rows removed by a cascading delete.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub queries_removed: usize,
    pub replies_removed: usize,
    pub votes_removed: usize,
    pub hearts_removed: usize,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Process-wide forum switches.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForumSettings {
    /// When set, students may not open queries or post replies.
    pub chat_locked: bool,
}
