//! v002 -- Discussion tree and reactions.
//!
//! Child rows reference their parents without `ON DELETE CASCADE`: removing a
//! query or reply that still has replies, votes or hearts fails, so deletes
//! must walk the subtree explicitly.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS queries (
    id         TEXT PRIMARY KEY NOT NULL,
    author_id  TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    edited     INTEGER NOT NULL DEFAULT 0,
    is_locked  INTEGER NOT NULL DEFAULT 0,
    is_pinned  INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_queries_created ON queries(created_at DESC);

CREATE TABLE IF NOT EXISTS replies (
    id         TEXT PRIMARY KEY NOT NULL,
    query_id   TEXT NOT NULL,
    parent_id  TEXT,                              -- NULL = directly under the query
    author_id  TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    edited     INTEGER NOT NULL DEFAULT 0,
    is_pinned  INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (query_id)  REFERENCES queries(id),
    FOREIGN KEY (parent_id) REFERENCES replies(id),
    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_replies_query  ON replies(query_id, created_at);
CREATE INDEX IF NOT EXISTS idx_replies_parent ON replies(parent_id);

CREATE TABLE IF NOT EXISTS query_votes (
    id        TEXT PRIMARY KEY NOT NULL,
    user_id   TEXT NOT NULL,
    query_id  TEXT NOT NULL,
    vote_type TEXT NOT NULL CHECK (vote_type IN ('like', 'dislike')),

    FOREIGN KEY (user_id)  REFERENCES users(id),
    FOREIGN KEY (query_id) REFERENCES queries(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_query_votes_unique ON query_votes(user_id, query_id);
CREATE INDEX IF NOT EXISTS idx_query_votes_target ON query_votes(query_id);

CREATE TABLE IF NOT EXISTS reply_votes (
    id        TEXT PRIMARY KEY NOT NULL,
    user_id   TEXT NOT NULL,
    reply_id  TEXT NOT NULL,
    vote_type TEXT NOT NULL CHECK (vote_type IN ('like', 'dislike')),

    FOREIGN KEY (user_id)  REFERENCES users(id),
    FOREIGN KEY (reply_id) REFERENCES replies(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_reply_votes_unique ON reply_votes(user_id, reply_id);
CREATE INDEX IF NOT EXISTS idx_reply_votes_target ON reply_votes(reply_id);

CREATE TABLE IF NOT EXISTS hearts (
    id         TEXT PRIMARY KEY NOT NULL,
    user_id    TEXT NOT NULL,
    query_id   TEXT,
    reply_id   TEXT,
    created_at TEXT NOT NULL,

    CHECK ((query_id IS NULL) <> (reply_id IS NULL)),
    FOREIGN KEY (user_id)  REFERENCES users(id),
    FOREIGN KEY (query_id) REFERENCES queries(id),
    FOREIGN KEY (reply_id) REFERENCES replies(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_hearts_query_unique
    ON hearts(user_id, query_id) WHERE query_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_hearts_reply_unique
    ON hearts(user_id, reply_id) WHERE reply_id IS NOT NULL;
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
