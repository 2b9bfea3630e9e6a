//! The forum facade.
//!
//! [`Forum`] owns the [`Database`] and exposes the operations a caller can
//! invoke.  Each one runs in a single store transaction:
//!
//! 1. load the caller as a [`Principal`] and refuse if they are blocked
//! 2. for posting, check the global lock (students only)
//! 3. validate input and resolve the target entities
//! 4. ask [`authority`] whether the action is allowed
//! 5. mutate
//!
//! A rejected request returns before step 5, and any failure during step 5
//! rolls the transaction back.

use campus_shared::constants::MAX_POST_LENGTH;
use campus_shared::{QueryId, ReplyId, Target, UserId, VoteType};
use campus_store::{
    CascadeReport, Database, ForumSettings, HeartState, Query, Reply, User, VoteTally,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::authority::{self, Action};
use crate::error::{ForumError, Result};
use crate::principal::Principal;
use crate::view::{self, ForumView};

/// Block state of a user after a block toggle.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockState {
    pub user_id: UserId,
    pub is_forum_blocked: bool,
    pub blocked_by_name: Option<String>,
}

pub struct Forum {
    db: Database,
}

impl Forum {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn settings(&self) -> Result<ForumSettings> {
        Ok(self.db.forum_settings()?)
    }

    /// Overwrite the stored settings without an authority check.  Used by
    /// the server at startup.
    pub fn apply_settings(&self, settings: &ForumSettings) -> Result<()> {
        self.db.save_forum_settings(settings)?;
        info!(chat_locked = settings.chat_locked, "Forum settings applied");
        Ok(())
    }

    /// Mirror a user record from the identity service.
    pub fn sync_user(&self, user: &User) -> Result<()> {
        self.db.upsert_user(user)?;
        info!(user = %user.id, role = %user.role, "User synced");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Posting
    // ------------------------------------------------------------------

    pub fn post_query(&self, actor: UserId, text: &str) -> Result<Query> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;
            ensure_posting_open(db, &me)?;
            let text = validate_text(text)?;

            let query = Query::new(me.user_id, text);
            db.insert_query(&query)?;
            Ok(query)
        });

        logged("post_query", actor, result).map(|query| {
            info!(query = %query.id, author = %actor, "Query posted");
            query
        })
    }

    pub fn post_reply(
        &self,
        actor: UserId,
        query_id: QueryId,
        parent_id: Option<ReplyId>,
        text: &str,
    ) -> Result<Reply> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;
            ensure_posting_open(db, &me)?;
            let text = validate_text(text)?;

            let query = db.get_query(query_id).map_err(ForumError::lookup("query"))?;
            if let Some(parent_id) = parent_id {
                let parent = db.get_reply(parent_id).map_err(ForumError::lookup("reply"))?;
                if parent.query_id != query.id {
                    return Err(ForumError::Validation(
                        "The reply you are responding to belongs to a different query.".into(),
                    ));
                }
            }
            if query.is_locked {
                return Err(ForumError::QueryLocked);
            }

            let reply = Reply::new(me.user_id, query.id, parent_id, text);
            db.insert_reply(&reply)?;
            Ok(reply)
        });

        logged("post_reply", actor, result).map(|reply| {
            info!(
                reply = %reply.id,
                query = %reply.query_id,
                parent = ?reply.parent_id,
                author = %actor,
                "Reply posted"
            );
            reply
        })
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    pub fn edit_query(&self, actor: UserId, id: QueryId, text: &str) -> Result<Query> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;
            let text = validate_text(text)?;

            let query = db.get_query(id).map_err(ForumError::lookup("query"))?;
            if !authority::can_edit(&me, query.author_id) {
                return Err(denied(Action::Edit));
            }

            db.update_query_text(id, &text)?;
            Ok(db.get_query(id)?)
        });

        logged("edit_query", actor, result).map(|query| {
            info!(query = %id, editor = %actor, "Query edited");
            query
        })
    }

    pub fn edit_reply(&self, actor: UserId, id: ReplyId, text: &str) -> Result<Reply> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;
            let text = validate_text(text)?;

            let reply = db.get_reply(id).map_err(ForumError::lookup("reply"))?;
            if !authority::can_edit(&me, reply.author_id) {
                return Err(denied(Action::Edit));
            }

            db.update_reply_text(id, &text)?;
            Ok(db.get_reply(id)?)
        });

        logged("edit_reply", actor, result).map(|reply| {
            info!(reply = %id, editor = %actor, "Reply edited");
            reply
        })
    }

    // ------------------------------------------------------------------
    // Deleting
    // ------------------------------------------------------------------

    /// Delete a query with all of its replies, votes and hearts.
    pub fn delete_query(&self, actor: UserId, id: QueryId) -> Result<CascadeReport> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;

            let query = db.get_query(id).map_err(ForumError::lookup("query"))?;
            let author = db.get_user(query.author_id)?;
            if !authority::can_delete(&me, author.id, author.role) {
                return Err(denied(Action::Delete));
            }

            Ok(db.delete_query_cascade(id)?)
        });

        logged("delete_query", actor, result).map(|report| {
            info!(
                query = %id,
                actor = %actor,
                replies = report.replies_removed,
                votes = report.votes_removed,
                hearts = report.hearts_removed,
                "Query deleted"
            );
            report
        })
    }

    /// Delete a reply and its whole subtree.
    pub fn delete_reply(&self, actor: UserId, id: ReplyId) -> Result<CascadeReport> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;

            let reply = db.get_reply(id).map_err(ForumError::lookup("reply"))?;
            let author = db.get_user(reply.author_id)?;
            if !authority::can_delete(&me, author.id, author.role) {
                return Err(denied(Action::Delete));
            }

            Ok(db.delete_reply_subtree(id)?)
        });

        logged("delete_reply", actor, result).map(|report| {
            info!(
                reply = %id,
                actor = %actor,
                replies = report.replies_removed,
                "Reply deleted"
            );
            report
        })
    }

    // ------------------------------------------------------------------
    // Reactions
    // ------------------------------------------------------------------

    pub fn cast_vote(&self, actor: UserId, target: Target, vote: VoteType) -> Result<VoteTally> {
        let result = retry_on_conflict(|| {
            self.db.atomically(|db| {
                let me = Principal::load(db, actor)?;
                me.ensure_not_blocked()?;
                db.toggle_vote(me.user_id, &target, vote)
                    .map_err(ForumError::lookup(target.kind()))
            })
        });

        logged("cast_vote", actor, result).map(|tally| {
            info!(%target, voter = %actor, vote = %vote, "Vote toggled");
            tally
        })
    }

    pub fn toggle_heart(&self, actor: UserId, target: Target) -> Result<HeartState> {
        let result = retry_on_conflict(|| {
            self.db.atomically(|db| {
                let me = Principal::load(db, actor)?;
                me.ensure_not_blocked()?;
                db.toggle_heart(me.user_id, &target)
                    .map_err(ForumError::lookup(target.kind()))
            })
        });

        logged("toggle_heart", actor, result).map(|state| {
            info!(%target, user = %actor, hearted = state.hearted, "Heart toggled");
            state
        })
    }

    // ------------------------------------------------------------------
    // Moderation
    // ------------------------------------------------------------------

    /// Flip the pinned flag of a query or reply.  Returns the new value.
    pub fn toggle_pin(&self, actor: UserId, target: Target) -> Result<bool> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;
            if !authority::can_pin(&me) {
                return Err(denied(Action::Pin));
            }

            match target {
                Target::Query(id) => {
                    let query = db.get_query(id).map_err(ForumError::lookup("query"))?;
                    db.set_query_pinned(id, !query.is_pinned)?;
                    Ok(!query.is_pinned)
                }
                Target::Reply(id) => {
                    let reply = db.get_reply(id).map_err(ForumError::lookup("reply"))?;
                    db.set_reply_pinned(id, !reply.is_pinned)?;
                    Ok(!reply.is_pinned)
                }
            }
        });

        logged("toggle_pin", actor, result).map(|pinned| {
            info!(%target, moderator = %actor, pinned, "Pin toggled");
            pinned
        })
    }

    /// Flip the locked flag of a query.  Returns the new value.
    pub fn toggle_lock(&self, actor: UserId, id: QueryId) -> Result<bool> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;
            if !authority::can_lock(&me) {
                return Err(denied(Action::Lock));
            }

            let query = db.get_query(id).map_err(ForumError::lookup("query"))?;
            db.set_query_locked(id, !query.is_locked)?;
            Ok(!query.is_locked)
        });

        logged("toggle_lock", actor, result).map(|locked| {
            info!(query = %id, moderator = %actor, locked, "Query lock toggled");
            locked
        })
    }

    /// Block `target` if they are not blocked, unblock them otherwise.
    pub fn toggle_block(&self, actor: UserId, target: UserId) -> Result<BlockState> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;

            let user = db.get_user(target).map_err(ForumError::lookup("user"))?;
            let decision = authority::block_decision(&me, &user);
            if !decision.is_allowed() {
                return Err(ForumError::Authorization(decision.reason().to_string()));
            }

            let state = if user.is_forum_blocked {
                db.set_forum_block(user.id, None)?;
                BlockState {
                    user_id: user.id,
                    is_forum_blocked: false,
                    blocked_by_name: None,
                }
            } else {
                db.set_forum_block(user.id, Some(me.user_id))?;
                BlockState {
                    user_id: user.id,
                    is_forum_blocked: true,
                    blocked_by_name: Some(me.display_name.clone()),
                }
            };
            Ok(state)
        });

        logged("toggle_block", actor, result).map(|state| {
            info!(
                user = %target,
                moderator = %actor,
                blocked = state.is_forum_blocked,
                "Forum block toggled"
            );
            state
        })
    }

    /// Flip the global posting lock.  Returns the new settings.
    pub fn toggle_global_lock(&self, actor: UserId) -> Result<ForumSettings> {
        let result = self.db.atomically::<_, ForumError, _>(|db| {
            let me = Principal::load(db, actor)?;
            me.ensure_not_blocked()?;
            if !authority::can_toggle_global_lock(&me) {
                return Err(denied(Action::ToggleGlobalLock));
            }

            let mut settings = db.forum_settings()?;
            settings.chat_locked = !settings.chat_locked;
            db.save_forum_settings(&settings)?;
            Ok(settings)
        });

        logged("toggle_global_lock", actor, result).map(|settings| {
            info!(moderator = %actor, chat_locked = settings.chat_locked, "Global lock toggled");
            settings
        })
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// The ordered, annotated forum as seen by `viewer`.
    pub fn list_queries(&self, viewer: UserId) -> Result<ForumView> {
        self.db.snapshot(|db| {
            let me = Principal::load(db, viewer)?;
            view::build(db, &me, Utc::now())
        })
    }
}

fn validate_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ForumError::Validation("Post text cannot be empty.".into()));
    }
    if trimmed.chars().count() > MAX_POST_LENGTH {
        return Err(ForumError::Validation(format!(
            "Posts are limited to {MAX_POST_LENGTH} characters."
        )));
    }
    Ok(trimmed.to_string())
}

fn ensure_posting_open(db: &Database, me: &Principal) -> Result<()> {
    if !me.is_administrator() && db.forum_settings()?.chat_locked {
        return Err(ForumError::ForumLocked);
    }
    Ok(())
}

fn denied(action: Action) -> ForumError {
    let reason = match action {
        Action::Edit => "You can only edit your own posts.",
        Action::Delete => "You are not authorized to delete this post.",
        Action::Pin => "Only administrators can pin posts.",
        Action::Lock => "Only administrators can lock queries.",
        Action::Block => "You are not authorized to block this user.",
        Action::ToggleGlobalLock => "Only administrators can lock the forum.",
    };
    ForumError::Authorization(reason.to_string())
}

/// Re-run a toggle once if it lost a uniqueness race.
fn retry_on_conflict<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
    match op() {
        Err(ForumError::Conflict) => {
            warn!("Reaction toggle conflicted, retrying once");
            op()
        }
        other => other,
    }
}

fn logged<T>(operation: &'static str, actor: UserId, result: Result<T>) -> Result<T> {
    match &result {
        Err(ForumError::Storage(e)) => error!(operation, %actor, "Storage failure: {e}"),
        Err(e) => warn!(operation, %actor, "Request denied: {e}"),
        Ok(_) => {}
    }
    result
}
