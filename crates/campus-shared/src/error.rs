use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Unknown vote type: {0}")]
    UnknownVoteType(String),

    #[error("Unknown target type: {0}")]
    UnknownTargetType(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),
}
