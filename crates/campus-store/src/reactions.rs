//! Vote and heart toggles.
//!
//! Both toggles are read-check-write sequences run inside one write
//! transaction.  The unique indexes on `(user, target)` back that up across
//! connections: a racing insert surfaces as [`StoreError::Conflict`] and the
//! caller can re-run the toggle.

use campus_shared::{Target, UserId, VoteType};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{HeartRecord, HeartState, Vote, VoteTally};
use crate::rows::{parsed_at, timestamp_to_sql, uuid_at};

/// Vote table and target column for a target kind.
fn vote_table(target: &Target) -> (&'static str, &'static str) {
    match target {
        Target::Query(_) => ("query_votes", "query_id"),
        Target::Reply(_) => ("reply_votes", "reply_id"),
    }
}

/// Heart column that holds a target of this kind.
fn heart_column(target: &Target) -> &'static str {
    match target {
        Target::Query(_) => "query_id",
        Target::Reply(_) => "reply_id",
    }
}

impl Database {
    pub fn target_exists(&self, target: &Target) -> Result<bool> {
        let sql = match target {
            Target::Query(_) => "SELECT 1 FROM queries WHERE id = ?1",
            Target::Reply(_) => "SELECT 1 FROM replies WHERE id = ?1",
        };
        Ok(self
            .conn()
            .query_row(sql, params![target.uuid().to_string()], |_| Ok(()))
            .optional()?
            .is_some())
    }

    // ------------------------------------------------------------------
    // Votes
    // ------------------------------------------------------------------

    pub fn find_vote(&self, user_id: UserId, target: &Target) -> Result<Option<(Uuid, VoteType)>> {
        let (table, column) = vote_table(target);
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT id, vote_type FROM {table} WHERE user_id = ?1 AND {column} = ?2"),
                params![user_id.to_string(), target.uuid().to_string()],
                |row| Ok((uuid_at(row, 0)?, parsed_at::<VoteType>(row, 1)?)),
            )
            .optional()?)
    }

    /// Apply a like/dislike toggle and return the resulting tally.
    ///
    /// - no vote yet: record `requested`
    /// - same vote again: remove it
    /// - opposite vote: switch the existing row in place
    pub fn toggle_vote(
        &self,
        user_id: UserId,
        target: &Target,
        requested: VoteType,
    ) -> Result<VoteTally> {
        self.atomically(|db| {
            if !db.target_exists(target)? {
                return Err(StoreError::NotFound);
            }

            let (table, column) = vote_table(target);
            match db.find_vote(user_id, target)? {
                None => {
                    db.conn()
                        .execute(
                            &format!(
                                "INSERT INTO {table} (id, user_id, {column}, vote_type)
                                 VALUES (?1, ?2, ?3, ?4)"
                            ),
                            params![
                                Uuid::new_v4().to_string(),
                                user_id.to_string(),
                                target.uuid().to_string(),
                                requested.as_str(),
                            ],
                        )
                        .map_err(StoreError::from_insert)?;
                }
                Some((vote_id, current)) if current == requested => {
                    db.conn().execute(
                        &format!("DELETE FROM {table} WHERE id = ?1"),
                        params![vote_id.to_string()],
                    )?;
                }
                Some((vote_id, _)) => {
                    db.conn().execute(
                        &format!("UPDATE {table} SET vote_type = ?1 WHERE id = ?2"),
                        params![requested.as_str(), vote_id.to_string()],
                    )?;
                }
            }

            db.vote_tally(user_id, target)
        })
    }

    /// Counts for `target` plus `viewer`'s own vote.
    pub fn vote_tally(&self, viewer: UserId, target: &Target) -> Result<VoteTally> {
        let (table, column) = vote_table(target);
        let (like_count, dislike_count) = self.conn().query_row(
            &format!(
                "SELECT
                    COALESCE(SUM(vote_type = 'like'), 0),
                    COALESCE(SUM(vote_type = 'dislike'), 0)
                 FROM {table} WHERE {column} = ?1"
            ),
            params![target.uuid().to_string()],
            |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
        )?;
        let viewer_vote = self.find_vote(viewer, target)?.map(|(_, v)| v);

        Ok(VoteTally {
            like_count,
            dislike_count,
            viewer_vote,
        })
    }

    /// Every vote in the forum.
    pub fn list_votes(&self) -> Result<Vec<Vote>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, 'query', query_id, vote_type FROM query_votes
             UNION ALL
             SELECT id, user_id, 'reply', reply_id, vote_type FROM reply_votes",
        )?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(2)?;
            let target_id: String = row.get(3)?;
            let target = Target::parse(&kind, &target_id).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(Vote {
                id: uuid_at(row, 0)?,
                user_id: parsed_at(row, 1)?,
                target,
                vote_type: parsed_at(row, 4)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Hearts
    // ------------------------------------------------------------------

    /// Add the user's heart to `target`, or take it back if already there.
    pub fn toggle_heart(&self, user_id: UserId, target: &Target) -> Result<HeartState> {
        self.atomically(|db| {
            if !db.target_exists(target)? {
                return Err(StoreError::NotFound);
            }

            let column = heart_column(target);
            let removed = db.conn().execute(
                &format!("DELETE FROM hearts WHERE user_id = ?1 AND {column} = ?2"),
                params![user_id.to_string(), target.uuid().to_string()],
            )?;

            let hearted = if removed > 0 {
                false
            } else {
                db.conn()
                    .execute(
                        &format!(
                            "INSERT INTO hearts (id, user_id, {column}, created_at)
                             VALUES (?1, ?2, ?3, ?4)"
                        ),
                        params![
                            Uuid::new_v4().to_string(),
                            user_id.to_string(),
                            target.uuid().to_string(),
                            timestamp_to_sql(&Utc::now()),
                        ],
                    )
                    .map_err(StoreError::from_insert)?;
                true
            };

            Ok(HeartState {
                hearted,
                heart_count: db.heart_count(target)?,
            })
        })
    }

    pub fn heart_count(&self, target: &Target) -> Result<u32> {
        let column = heart_column(target);
        Ok(self.conn().query_row(
            &format!("SELECT COUNT(*) FROM hearts WHERE {column} = ?1"),
            params![target.uuid().to_string()],
            |row| row.get(0),
        )?)
    }

    /// Every heart in the forum with its author's name and role, oldest
    /// first.
    pub fn list_hearts(&self) -> Result<Vec<HeartRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT h.user_id, h.query_id, h.reply_id, u.display_name, u.role
             FROM hearts h JOIN users u ON u.id = h.user_id
             ORDER BY h.created_at ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let query_id: Option<String> = row.get(1)?;
            let reply_id: Option<String> = row.get(2)?;
            let target = match (query_id, reply_id) {
                (Some(q), None) => Target::parse("query", &q),
                (None, Some(r)) => Target::parse("reply", &r),
                _ => Err(campus_shared::SharedError::UnknownTargetType(
                    "heart without exactly one target".into(),
                )),
            }
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

            Ok(HeartRecord {
                user_id: parsed_at(row, 0)?,
                target,
                author_name: row.get(3)?,
                author_role: parsed_at(row, 4)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}
