//! v001 -- Initial schema creation.
//!
//! Creates the `users` mirror of the identity service and the key/value
//! `settings` table, seeded with the global posting lock switched off.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (owned by the identity service, mirrored here)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id               TEXT PRIMARY KEY NOT NULL,   -- UUID
    display_name     TEXT NOT NULL,
    role             TEXT NOT NULL CHECK (role IN ('student', 'administrator')),
    department       TEXT,                        -- 'ALL_BRANCHES' marks a super-administrator
    is_forum_blocked INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    blocked_by_id    TEXT,                        -- nullable FK -> users(id)
    created_at       TEXT NOT NULL,               -- RFC-3339

    FOREIGN KEY (blocked_by_id) REFERENCES users(id) ON DELETE SET NULL
);

-- ----------------------------------------------------------------
-- Settings (process-wide key/value switches)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);

INSERT OR IGNORE INTO settings (key, value) VALUES ('is_chat_locked', 'false');
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
