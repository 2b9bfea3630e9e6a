//! CRUD operations for [`User`] records.

use campus_shared::UserId;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;
use crate::rows::{opt_uuid_at, parsed_at, timestamp_at, timestamp_to_sql, uuid_at};

const USER_COLUMNS: &str =
    "id, display_name, role, department, is_forum_blocked, blocked_by_id, created_at";

impl Database {
    /// Insert a user or refresh its identity fields.
    ///
    /// Block state is owned by the forum and is never overwritten here.
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, display_name, role, department, is_forum_blocked, blocked_by_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                role         = excluded.role,
                department   = excluded.department",
            params![
                user.id.to_string(),
                user.display_name,
                user.role.as_str(),
                user.department,
                user.is_forum_blocked,
                user.blocked_by.map(|id| id.to_string()),
                timestamp_to_sql(&user.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(StoreError::from_lookup)
    }

    pub fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .optional()?)
    }

    /// List all users, ordered by display name.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY display_name ASC"
        ))?;
        let rows = stmt.query_map([], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Block (`Some(admin)`) or unblock (`None`) a user.
    pub fn set_forum_block(&self, id: UserId, blocked_by: Option<UserId>) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET is_forum_blocked = ?1, blocked_by_id = ?2 WHERE id = ?3",
            params![
                blocked_by.is_some(),
                blocked_by.map(|b| b.to_string()),
                id.to_string()
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(uuid_at(row, 0)?),
        display_name: row.get(1)?,
        role: parsed_at(row, 2)?,
        department: row.get(3)?,
        is_forum_blocked: row.get(4)?,
        blocked_by: opt_uuid_at(row, 5)?.map(UserId),
        created_at: timestamp_at(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_shared::Role;
    use chrono::Utc;

    fn user(name: &str, role: Role) -> User {
        User {
            id: UserId::new(),
            display_name: name.into(),
            role,
            department: None,
            is_forum_blocked: false,
            blocked_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_keeps_block_state() {
        let db = Database::open_in_memory().unwrap();
        let admin = user("Prof. Rao", Role::Administrator);
        let mut student = user("Asha", Role::Student);
        db.upsert_user(&admin).unwrap();
        db.upsert_user(&student).unwrap();

        db.set_forum_block(student.id, Some(admin.id)).unwrap();

        student.display_name = "Asha K".into();
        db.upsert_user(&student).unwrap();

        let stored = db.get_user(student.id).unwrap();
        assert_eq!(stored.display_name, "Asha K");
        assert!(stored.is_forum_blocked);
        assert_eq!(stored.blocked_by, Some(admin.id));
    }

    #[test]
    fn unblock_clears_blocker() {
        let db = Database::open_in_memory().unwrap();
        let admin = user("Prof. Rao", Role::Administrator);
        let student = user("Asha", Role::Student);
        db.upsert_user(&admin).unwrap();
        db.upsert_user(&student).unwrap();

        db.set_forum_block(student.id, Some(admin.id)).unwrap();
        db.set_forum_block(student.id, None).unwrap();

        let stored = db.get_user(student.id).unwrap();
        assert!(!stored.is_forum_blocked);
        assert_eq!(stored.blocked_by, None);
    }

    #[test]
    fn missing_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_user(UserId::new()), Err(StoreError::NotFound)));
        assert!(db.find_user(UserId::new()).unwrap().is_none());
        assert!(matches!(
            db.set_forum_block(UserId::new(), None),
            Err(StoreError::NotFound)
        ));
    }
}
