use campus_store::StoreError;
use thiserror::Error;

/// Why a forum operation was rejected.
///
/// The `Display` text of every variant is a human-readable reason that can
/// be shown to the user as-is.
#[derive(Error, Debug)]
pub enum ForumError {
    /// Empty or malformed input.  The user can correct it and resubmit.
    #[error("{0}")]
    Validation(String),

    /// The referenced item was deleted or never existed.
    #[error("This {0} no longer exists")]
    NotFound(&'static str),

    /// Ownership or role check failed.
    #[error("{0}")]
    Authorization(String),

    /// The caller has been blocked from the forum.
    #[error("You have been blocked from the forum by {blocked_by}")]
    ForumBlocked { blocked_by: String },

    /// The global posting lock is engaged and the caller is a student.
    #[error("The forum is currently locked for new posts")]
    ForumLocked,

    /// The query has been locked by a moderator and takes no new replies.
    #[error("This query has been locked by a moderator")]
    QueryLocked,

    /// A concurrent toggle on the same target won the race twice in a row.
    #[error("Another update to this item was in progress, please retry")]
    Conflict,

    /// Infrastructure failure in the store.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ForumError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ForumError::NotFound("item"),
            StoreError::Conflict => ForumError::Conflict,
            other => ForumError::Storage(other),
        }
    }
}

impl ForumError {
    /// Convert a store lookup failure, naming what was looked up.
    pub(crate) fn lookup(what: &'static str) -> impl FnOnce(StoreError) -> ForumError {
        move |e| match e {
            StoreError::NotFound => ForumError::NotFound(what),
            other => ForumError::from(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForumError>;
