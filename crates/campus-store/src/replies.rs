//! CRUD operations for [`Reply`] records and subtree deletion.

use campus_shared::{QueryId, ReplyId};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{CascadeReport, Reply};
use crate::rows::{opt_uuid_at, parsed_at, timestamp_at, timestamp_to_sql, uuid_at};
use crate::tree::ReplyArena;

const REPLY_COLUMNS: &str =
    "id, query_id, parent_id, author_id, body, created_at, edited, is_pinned";

impl Database {
    /// Insert a reply.
    ///
    /// When `parent_id` is set the parent must belong to the same query;
    /// otherwise the row is rejected with [`StoreError::Corrupt`].
    pub fn insert_reply(&self, reply: &Reply) -> Result<()> {
        if let Some(parent_id) = reply.parent_id {
            let parent = self.get_reply(parent_id)?;
            if parent.query_id != reply.query_id {
                return Err(StoreError::Corrupt(format!(
                    "reply {} would cross threads: parent {} belongs to query {}",
                    reply.id, parent_id, parent.query_id
                )));
            }
        }

        self.conn().execute(
            "INSERT INTO replies (id, query_id, parent_id, author_id, body, created_at, edited, is_pinned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                reply.id.to_string(),
                reply.query_id.to_string(),
                reply.parent_id.map(|p| p.to_string()),
                reply.author_id.to_string(),
                reply.text,
                timestamp_to_sql(&reply.created_at),
                reply.edited,
                reply.is_pinned,
            ],
        )?;
        Ok(())
    }

    pub fn get_reply(&self, id: ReplyId) -> Result<Reply> {
        self.conn()
            .query_row(
                &format!("SELECT {REPLY_COLUMNS} FROM replies WHERE id = ?1"),
                params![id.to_string()],
                row_to_reply,
            )
            .map_err(StoreError::from_lookup)
    }

    /// Replies of one query in creation order.
    pub fn list_replies_for_query(&self, query_id: QueryId) -> Result<Vec<Reply>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REPLY_COLUMNS} FROM replies WHERE query_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![query_id.to_string()], row_to_reply)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Every reply in the forum in creation order.
    pub fn list_all_replies(&self) -> Result<Vec<Reply>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REPLY_COLUMNS} FROM replies ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map([], row_to_reply)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn reply_arena(&self, query_id: QueryId) -> Result<ReplyArena> {
        Ok(ReplyArena::from_replies(
            self.list_replies_for_query(query_id)?,
        ))
    }

    /// Replace the body and mark the reply as edited.
    pub fn update_reply_text(&self, id: ReplyId, text: &str) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE replies SET body = ?1, edited = 1 WHERE id = ?2",
            params![text, id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn set_reply_pinned(&self, id: ReplyId, pinned: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE replies SET is_pinned = ?1 WHERE id = ?2",
            params![pinned, id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Delete a reply and its whole subtree, with every vote and heart on
    /// any removed reply.  All or nothing.
    pub fn delete_reply_subtree(&self, id: ReplyId) -> Result<CascadeReport> {
        self.atomically(|db| {
            let reply = db.get_reply(id)?;
            let arena = db.reply_arena(reply.query_id)?;
            let mut report = CascadeReport::default();

            for reply_id in arena.descendants(id).into_iter().rev() {
                db.remove_reply_row(reply_id, &mut report)?;
            }

            tracing::debug!(reply_id = %id, ?report, "reply subtree removed");
            Ok(report)
        })
    }

    /// Remove one reply row and its reactions.  Its children must already be
    /// gone, otherwise the foreign key on `parent_id` rejects the delete.
    pub(crate) fn remove_reply_row(&self, id: ReplyId, report: &mut CascadeReport) -> Result<()> {
        let key = id.to_string();
        report.hearts_removed += self
            .conn()
            .execute("DELETE FROM hearts WHERE reply_id = ?1", params![key])?;
        report.votes_removed += self
            .conn()
            .execute("DELETE FROM reply_votes WHERE reply_id = ?1", params![key])?;
        report.replies_removed += self
            .conn()
            .execute("DELETE FROM replies WHERE id = ?1", params![key])?;
        Ok(())
    }
}

fn row_to_reply(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reply> {
    Ok(Reply {
        id: ReplyId(uuid_at(row, 0)?),
        query_id: parsed_at(row, 1)?,
        parent_id: opt_uuid_at(row, 2)?.map(ReplyId),
        author_id: parsed_at(row, 3)?,
        text: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
        edited: row.get(6)?,
        is_pinned: row.get(7)?,
    })
}
