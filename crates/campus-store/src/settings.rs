//! Process-wide forum switches stored in the `settings` table.

use campus_shared::constants::SETTING_CHAT_LOCKED;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;
use crate::models::ForumSettings;

impl Database {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Load the forum settings aggregate.  Missing keys read as defaults.
    pub fn forum_settings(&self) -> Result<ForumSettings> {
        let chat_locked = self
            .get_setting(SETTING_CHAT_LOCKED)?
            .map(|v| v == "true")
            .unwrap_or(false);
        Ok(ForumSettings { chat_locked })
    }

    pub fn save_forum_settings(&self, settings: &ForumSettings) -> Result<()> {
        self.set_setting(
            SETTING_CHAT_LOCKED,
            if settings.chat_locked { "true" } else { "false" },
        )
    }
}
