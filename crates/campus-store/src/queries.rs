//! CRUD operations for [`Query`] records, including the cascading delete.

use campus_shared::QueryId;
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{CascadeReport, Query};
use crate::rows::{parsed_at, timestamp_at, timestamp_to_sql, uuid_at};

const QUERY_COLUMNS: &str = "id, author_id, body, created_at, edited, is_locked, is_pinned";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn insert_query(&self, query: &Query) -> Result<()> {
        self.conn().execute(
            "INSERT INTO queries (id, author_id, body, created_at, edited, is_locked, is_pinned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                query.id.to_string(),
                query.author_id.to_string(),
                query.text,
                timestamp_to_sql(&query.created_at),
                query.edited,
                query.is_locked,
                query.is_pinned,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_query(&self, id: QueryId) -> Result<Query> {
        self.conn()
            .query_row(
                &format!("SELECT {QUERY_COLUMNS} FROM queries WHERE id = ?1"),
                params![id.to_string()],
                row_to_query,
            )
            .map_err(StoreError::from_lookup)
    }

    /// List all queries, newest first.
    pub fn list_queries(&self) -> Result<Vec<Query>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {QUERY_COLUMNS} FROM queries ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], row_to_query)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace the body and mark the query as edited.
    pub fn update_query_text(&self, id: QueryId, text: &str) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE queries SET body = ?1, edited = 1 WHERE id = ?2",
            params![text, id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn set_query_pinned(&self, id: QueryId, pinned: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE queries SET is_pinned = ?1 WHERE id = ?2",
            params![pinned, id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn set_query_locked(&self, id: QueryId, locked: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE queries SET is_locked = ?1 WHERE id = ?2",
            params![locked, id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a query together with every reply under it and every vote and
    /// heart referencing any of them.  All or nothing.
    pub fn delete_query_cascade(&self, id: QueryId) -> Result<CascadeReport> {
        self.atomically(|db| {
            db.get_query(id)?;

            let arena = db.reply_arena(id)?;
            let mut report = CascadeReport::default();

            // Reverse pre-order removes children before their parents.
            for reply_id in arena.all_in_preorder().into_iter().rev() {
                db.remove_reply_row(reply_id, &mut report)?;
            }

            let key = id.to_string();
            report.hearts_removed += db
                .conn()
                .execute("DELETE FROM hearts WHERE query_id = ?1", params![key])?;
            report.votes_removed += db
                .conn()
                .execute("DELETE FROM query_votes WHERE query_id = ?1", params![key])?;
            report.queries_removed += db
                .conn()
                .execute("DELETE FROM queries WHERE id = ?1", params![key])?;

            tracing::debug!(query_id = %id, ?report, "query subtree removed");
            Ok(report)
        })
    }
}

fn row_to_query(row: &rusqlite::Row<'_>) -> rusqlite::Result<Query> {
    Ok(Query {
        id: QueryId(uuid_at(row, 0)?),
        author_id: parsed_at(row, 1)?,
        text: row.get(2)?,
        created_at: timestamp_at(row, 3)?,
        edited: row.get(4)?,
        is_locked: row.get(5)?,
        is_pinned: row.get(6)?,
    })
}
