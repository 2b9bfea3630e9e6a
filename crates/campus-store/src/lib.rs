//! # campus-store
//!
//! Durable storage for the campus forum, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for every forum entity:
//! users mirrored from the identity service, the query/reply discussion tree,
//! votes, hearts and the process-wide forum settings.  Multi-step mutations
//! run inside [`Database::atomically`] so a failure never leaves a partial
//! write behind.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod reactions;
pub mod replies;
pub mod settings;
pub mod tree;
pub mod users;

mod error;
mod rows;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
pub use tree::ReplyArena;

#[cfg(test)]
pub(crate) mod test_support {
    use campus_shared::{Role, UserId};
    use chrono::Utc;

    use crate::{Database, User};

    pub fn seed_user(db: &Database, name: &str, role: Role) -> User {
        let user = User {
            id: UserId::new(),
            display_name: name.to_string(),
            role,
            department: None,
            is_forum_blocked: false,
            blocked_by: None,
            created_at: Utc::now(),
        };
        db.upsert_user(&user).expect("seed user");
        user
    }
}
