//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{Result, StoreError};
use crate::migrations;

/// Upper bound on how long a writer waits for another connection's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/campus-forum/forum.db`
    /// - macOS:   `~/Library/Application Support/org.campus.campus-forum/forum.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\campus\campus-forum\data\forum.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("org", "campus", "campus-forum").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("forum.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::prepare(conn)
    }

    /// Open a private in-memory database. Used by tests and tooling.
    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    ///
    /// Callers should prefer the typed helpers, but direct access is
    /// occasionally needed for ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Run `f` as one write transaction.
    ///
    /// The transaction is opened with `BEGIN IMMEDIATE`, so the write lock is
    /// taken before `f` reads anything and concurrent writers serialize.
    /// It commits when `f` returns `Ok` and rolls back otherwise.  When a
    /// transaction is already open on this connection, `f` joins it instead
    /// of nesting.
    pub fn atomically<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        self.in_transaction(TransactionBehavior::Immediate, f)
    }

    /// Run read-only `f` against one consistent snapshot of the database.
    pub fn snapshot<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        self.in_transaction(TransactionBehavior::Deferred, f)
    }

    fn in_transaction<T, E, F>(
        &self,
        behavior: TransactionBehavior,
        f: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        let tx = Transaction::new_unchecked(&self.conn, behavior).map_err(StoreError::from)?;
        let value = f(self)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
    }

    #[test]
    fn atomically_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.atomically(|db| {
            db.conn().execute(
                "INSERT INTO settings (key, value) VALUES ('probe', 'x')",
                [],
            )?;
            Err(StoreError::Conflict)
        });
        assert!(matches!(result, Err(StoreError::Conflict)));

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM settings WHERE key = 'probe'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn nested_atomically_joins_outer_transaction() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.atomically(|db| {
            db.atomically(|db| {
                db.conn().execute(
                    "INSERT INTO settings (key, value) VALUES ('inner', 'x')",
                    [],
                )?;
                Ok::<_, StoreError>(())
            })?;
            Err(StoreError::NotFound)
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM settings WHERE key = 'inner'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
