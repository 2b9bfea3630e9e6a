//! Per-viewer projection of the forum for rendering.
//!
//! The whole forum is read once (queries, replies, users, votes, hearts)
//! and folded into a tree of view structs.  Reply trees are assembled
//! bottom-up from the arena's pre-order, so depth never turns into
//! recursion.

use std::collections::HashMap;

use campus_shared::{QueryId, ReplyId, Role, Target, UserId, VoteType};
use campus_store::{Database, Query, Reply, ReplyArena, User};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::authority;
use crate::error::Result;
use crate::principal::Principal;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumView {
    pub chat_locked: bool,
    pub viewer: ViewerStatus,
    pub queries: Vec<QueryView>,
}

/// What the viewer may do right now, for enabling or hiding controls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerStatus {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    pub is_super_administrator: bool,
    pub is_forum_blocked: bool,
    pub blocked_by_name: Option<String>,
    /// False when blocked, or when the global lock applies to this viewer.
    pub can_post: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

/// Aggregated reactions on one post, annotated for the viewer.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub like_count: u32,
    pub dislike_count: u32,
    pub viewer_vote: Option<VoteType>,
    pub heart_count: u32,
    pub viewer_hearted: bool,
    /// Display names of administrators who hearted the post.
    pub hearted_by_admins: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryView {
    pub id: QueryId,
    pub text: String,
    pub author: AuthorView,
    pub created_at: DateTime<Utc>,
    pub posted_ago: String,
    pub edited: bool,
    pub is_locked: bool,
    pub is_pinned: bool,
    #[serde(flatten)]
    pub reactions: ReactionSummary,
    pub can_edit: bool,
    pub can_delete: bool,
    /// Top-level replies in creation order.
    pub replies: Vec<ReplyView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub id: ReplyId,
    pub parent_id: Option<ReplyId>,
    pub text: String,
    pub author: AuthorView,
    pub created_at: DateTime<Utc>,
    pub posted_ago: String,
    pub edited: bool,
    pub is_pinned: bool,
    #[serde(flatten)]
    pub reactions: ReactionSummary,
    pub can_edit: bool,
    pub can_delete: bool,
    pub children: Vec<ReplyView>,
}

/// Lookup tables shared by every node of the projection.
struct Context<'a> {
    viewer: &'a Principal,
    users: HashMap<UserId, User>,
    reactions: HashMap<Target, ReactionSummary>,
    now: DateTime<Utc>,
}

impl Context<'_> {
    fn author(&self, id: UserId) -> AuthorView {
        match self.users.get(&id) {
            Some(user) => AuthorView {
                id,
                name: user.display_name.clone(),
                role: user.role,
            },
            None => AuthorView {
                id,
                name: "Unknown user".into(),
                role: Role::Student,
            },
        }
    }

    fn reactions(&self, target: Target) -> ReactionSummary {
        self.reactions.get(&target).cloned().unwrap_or_default()
    }

    fn query_view(&self, query: Query, replies: Vec<ReplyView>) -> QueryView {
        let author = self.author(query.author_id);
        QueryView {
            can_edit: authority::can_edit(self.viewer, query.author_id),
            can_delete: authority::can_delete(self.viewer, author.id, author.role),
            reactions: self.reactions(Target::Query(query.id)),
            posted_ago: posted_ago(query.created_at, self.now),
            id: query.id,
            text: query.text,
            author,
            created_at: query.created_at,
            edited: query.edited,
            is_locked: query.is_locked,
            is_pinned: query.is_pinned,
            replies,
        }
    }

    fn reply_view(&self, reply: &Reply, children: Vec<ReplyView>) -> ReplyView {
        let author = self.author(reply.author_id);
        ReplyView {
            can_edit: authority::can_edit(self.viewer, reply.author_id),
            can_delete: authority::can_delete(self.viewer, author.id, author.role),
            reactions: self.reactions(Target::Reply(reply.id)),
            posted_ago: posted_ago(reply.created_at, self.now),
            id: reply.id,
            parent_id: reply.parent_id,
            text: reply.text.clone(),
            author,
            created_at: reply.created_at,
            edited: reply.edited,
            is_pinned: reply.is_pinned,
            children,
        }
    }

    /// Assemble the reply forest of one query without recursion.
    fn reply_forest(&self, arena: &ReplyArena) -> Vec<ReplyView> {
        let mut built: HashMap<ReplyId, ReplyView> = HashMap::with_capacity(arena.len());

        // In reverse pre-order every node comes after all of its descendants.
        for id in arena.all_in_preorder().into_iter().rev() {
            let Some(reply) = arena.get(id) else { continue };
            let children = arena
                .children(id)
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(id, self.reply_view(reply, children));
        }

        arena
            .roots()
            .iter()
            .filter_map(|root| built.remove(root))
            .collect()
    }
}

/// Build the forum view for `viewer` from the current store contents.
pub fn build(db: &Database, viewer: &Principal, now: DateTime<Utc>) -> Result<ForumView> {
    let settings = db.forum_settings()?;

    let users: HashMap<UserId, User> = db
        .list_users()?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut reactions: HashMap<Target, ReactionSummary> = HashMap::new();
    for vote in db.list_votes()? {
        let entry = reactions.entry(vote.target).or_default();
        match vote.vote_type {
            VoteType::Like => entry.like_count += 1,
            VoteType::Dislike => entry.dislike_count += 1,
        }
        if vote.user_id == viewer.user_id {
            entry.viewer_vote = Some(vote.vote_type);
        }
    }
    for heart in db.list_hearts()? {
        let entry = reactions.entry(heart.target).or_default();
        entry.heart_count += 1;
        if heart.user_id == viewer.user_id {
            entry.viewer_hearted = true;
        }
        if heart.author_role.is_administrator() {
            entry.hearted_by_admins.push(heart.author_name);
        }
    }

    let mut replies_by_query: HashMap<QueryId, Vec<Reply>> = HashMap::new();
    for reply in db.list_all_replies()? {
        replies_by_query.entry(reply.query_id).or_default().push(reply);
    }

    let ctx = Context {
        viewer,
        users,
        reactions,
        now,
    };

    let mut queries: Vec<QueryView> = db
        .list_queries()?
        .into_iter()
        .map(|query| {
            let arena = ReplyArena::from_replies(
                replies_by_query.remove(&query.id).unwrap_or_default(),
            );
            let replies = ctx.reply_forest(&arena);
            ctx.query_view(query, replies)
        })
        .collect();
    sort_for_display(&mut queries);

    let can_post = !viewer.is_forum_blocked && (viewer.is_administrator() || !settings.chat_locked);

    Ok(ForumView {
        chat_locked: settings.chat_locked,
        viewer: ViewerStatus {
            user_id: viewer.user_id,
            display_name: viewer.display_name.clone(),
            role: viewer.role,
            is_super_administrator: viewer.is_super_administrator(),
            is_forum_blocked: viewer.is_forum_blocked,
            blocked_by_name: viewer.blocked_by_name.clone(),
            can_post,
        },
        queries,
    })
}

/// Pinned first, then queries by administrators, then newest first.
pub fn sort_for_display(queries: &mut [QueryView]) {
    queries.sort_by(|a, b| {
        let key = |q: &QueryView| (q.is_pinned, q.author.role.is_administrator(), q.created_at);
        key(b).cmp(&key(a))
    });
}

/// Coarse relative time such as "just now" or "3 days ago".
pub fn posted_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let weeks = days / 7;

    let (n, unit) = if minutes < 60 {
        (minutes, "minute")
    } else if hours < 24 {
        (hours, "hour")
    } else if days < 7 {
        (days, "day")
    } else if weeks < 4 {
        (weeks, "week")
    } else if days / 30 < 12 {
        // Days 28 and 29 are past four weeks but short of a month.
        ((days / 30).max(1), "month")
    } else {
        ((days / 365).max(1), "year")
    };

    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::Forum;
    use chrono::{Duration, TimeZone};

    fn add_user(db: &Database, name: &str, role: Role, department: Option<&str>) -> User {
        let user = User {
            id: UserId::new(),
            display_name: name.to_string(),
            role,
            department: department.map(str::to_string),
            is_forum_blocked: false,
            blocked_by: None,
            created_at: Utc::now(),
        };
        db.upsert_user(&user).unwrap();
        user
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn pinned_then_admin_then_newest() {
        let db = Database::open_in_memory().unwrap();
        let student = add_user(&db, "Asha", Role::Student, None);
        let admin = add_user(&db, "Prof. Rao", Role::Administrator, Some("CSE"));

        let mut a = Query::new(student.id, "A");
        a.created_at = at(1);
        a.is_pinned = true;
        let mut b = Query::new(admin.id, "B");
        b.created_at = at(2);
        let mut c = Query::new(admin.id, "C");
        c.created_at = at(3);
        c.is_pinned = true;
        let mut d = Query::new(student.id, "D");
        d.created_at = at(4);
        for q in [&a, &b, &c, &d] {
            db.insert_query(q).unwrap();
        }

        let forum = Forum::new(db);
        let view = forum.list_queries(student.id).unwrap();
        let order: Vec<&str> = view.queries.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(order, ["C", "A", "B", "D"]);
    }

    #[test]
    fn replies_nest_in_creation_order() {
        let db = Database::open_in_memory().unwrap();
        let asha = add_user(&db, "Asha", Role::Student, None);
        let q = Query::new(asha.id, "q");
        db.insert_query(&q).unwrap();

        let mut first = Reply::new(asha.id, q.id, None, "first");
        first.created_at = at(10);
        let mut second = Reply::new(asha.id, q.id, None, "second");
        second.created_at = at(20);
        let mut nested = Reply::new(asha.id, q.id, Some(first.id), "nested");
        nested.created_at = at(30);
        let mut deeper = Reply::new(asha.id, q.id, Some(nested.id), "deeper");
        deeper.created_at = at(40);
        for r in [&first, &second, &nested, &deeper] {
            db.insert_reply(r).unwrap();
        }

        let forum = Forum::new(db);
        let view = forum.list_queries(asha.id).unwrap();
        let replies = &view.queries[0].replies;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].text, "first");
        assert_eq!(replies[1].text, "second");
        assert_eq!(replies[0].children[0].text, "nested");
        assert_eq!(replies[0].children[0].children[0].text, "deeper");
        assert!(replies[1].children.is_empty());
    }

    #[test]
    fn reactions_are_annotated_per_viewer() {
        let db = Database::open_in_memory().unwrap();
        let asha = add_user(&db, "Asha", Role::Student, None);
        let ravi = add_user(&db, "Ravi", Role::Student, None);
        let rao = add_user(&db, "Prof. Rao", Role::Administrator, Some("CSE"));
        let forum = Forum::new(db);

        let q = forum.post_query(asha.id, "q").unwrap();
        let target = Target::Query(q.id);
        forum.cast_vote(ravi.id, target, VoteType::Like).unwrap();
        forum.cast_vote(rao.id, target, VoteType::Dislike).unwrap();
        forum.toggle_heart(rao.id, target).unwrap();
        forum.toggle_heart(ravi.id, target).unwrap();

        let view = forum.list_queries(ravi.id).unwrap();
        let r = &view.queries[0].reactions;
        assert_eq!((r.like_count, r.dislike_count), (1, 1));
        assert_eq!(r.viewer_vote, Some(VoteType::Like));
        assert_eq!(r.heart_count, 2);
        assert!(r.viewer_hearted);
        assert_eq!(r.hearted_by_admins, vec!["Prof. Rao".to_string()]);

        let view = forum.list_queries(asha.id).unwrap();
        let r = &view.queries[0].reactions;
        assert_eq!(r.viewer_vote, None);
        assert!(!r.viewer_hearted);
        assert!(view.queries[0].can_edit);
    }

    #[test]
    fn viewer_status_reflects_block_and_lock() {
        let db = Database::open_in_memory().unwrap();
        let asha = add_user(&db, "Asha", Role::Student, None);
        let dean = add_user(&db, "Dean", Role::Administrator, Some("ALL_BRANCHES"));
        let forum = Forum::new(db);

        assert!(forum.list_queries(asha.id).unwrap().viewer.can_post);

        forum.toggle_global_lock(dean.id).unwrap();
        let view = forum.list_queries(asha.id).unwrap();
        assert!(view.chat_locked);
        assert!(!view.viewer.can_post);
        let dean_view = forum.list_queries(dean.id).unwrap();
        assert!(dean_view.viewer.can_post);
        assert!(dean_view.viewer.is_super_administrator);

        forum.toggle_global_lock(dean.id).unwrap();
        forum.toggle_block(dean.id, asha.id).unwrap();
        let view = forum.list_queries(asha.id).unwrap();
        assert!(view.viewer.is_forum_blocked);
        assert_eq!(view.viewer.blocked_by_name.as_deref(), Some("Dean"));
        assert!(!view.viewer.can_post);
    }

    #[test]
    fn view_serialises_with_flattened_reactions() {
        let db = Database::open_in_memory().unwrap();
        let asha = add_user(&db, "Asha", Role::Student, None);
        let forum = Forum::new(db);
        forum.post_query(asha.id, "hello").unwrap();

        let json = serde_json::to_value(forum.list_queries(asha.id).unwrap()).unwrap();
        let query = &json["queries"][0];
        assert_eq!(query["text"], "hello");
        assert_eq!(query["likeCount"], 0);
        assert_eq!(query["viewerVote"], serde_json::Value::Null);
        assert_eq!(query["author"]["role"], "student");
        assert_eq!(query["postedAgo"], "just now");
        assert_eq!(json["chatLocked"], false);
    }

    #[test]
    fn posted_ago_thresholds() {
        let now = at(100_000_000);
        let ago = |d: Duration| posted_ago(now - d, now);

        assert_eq!(ago(Duration::seconds(59)), "just now");
        assert_eq!(ago(Duration::seconds(60)), "1 minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::hours(1)), "1 hour ago");
        assert_eq!(ago(Duration::hours(23)), "23 hours ago");
        assert_eq!(ago(Duration::days(2)), "2 days ago");
        assert_eq!(ago(Duration::days(7)), "1 week ago");
        assert_eq!(ago(Duration::days(27)), "3 weeks ago");
        assert_eq!(ago(Duration::days(29)), "1 month ago");
        assert_eq!(ago(Duration::days(90)), "3 months ago");
        assert_eq!(ago(Duration::days(365)), "1 year ago");
        assert_eq!(ago(Duration::days(800)), "2 years ago");
    }
}
