//! The identity context of one request.

use campus_shared::constants::UNKNOWN_BLOCKER_NAME;
use campus_shared::{Role, UserId};
use campus_store::{Database, User};
use serde::Serialize;

use crate::authority;
use crate::error::{ForumError, Result};

/// The authenticated caller as seen by the forum.
///
/// Loaded from the store at the start of every operation, inside the
/// operation's transaction, so the block flag cannot change under it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub is_forum_blocked: bool,
    /// Display name of the administrator who imposed the block.
    pub blocked_by_name: Option<String>,
}

impl Principal {
    pub fn load(db: &Database, user_id: UserId) -> Result<Self> {
        let user = db.get_user(user_id).map_err(ForumError::lookup("user"))?;
        Self::from_user(db, user)
    }

    pub fn from_user(db: &Database, user: User) -> Result<Self> {
        let blocked_by_name = if user.is_forum_blocked {
            let blocker = match user.blocked_by {
                Some(id) => db.find_user(id)?,
                None => None,
            };
            Some(
                blocker
                    .map(|b| b.display_name)
                    .unwrap_or_else(|| UNKNOWN_BLOCKER_NAME.to_string()),
            )
        } else {
            None
        };

        Ok(Self {
            user_id: user.id,
            display_name: user.display_name,
            role: user.role,
            department: user.department,
            is_forum_blocked: user.is_forum_blocked,
            blocked_by_name,
        })
    }

    pub fn is_administrator(&self) -> bool {
        self.role.is_administrator()
    }

    pub fn is_super_administrator(&self) -> bool {
        authority::is_super_administrator(self.role, self.department.as_deref())
    }

    /// Fail with [`ForumError::ForumBlocked`] if this caller is blocked.
    pub fn ensure_not_blocked(&self) -> Result<()> {
        if self.is_forum_blocked {
            return Err(ForumError::ForumBlocked {
                blocked_by: self
                    .blocked_by_name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_BLOCKER_NAME.to_string()),
            });
        }
        Ok(())
    }
}
