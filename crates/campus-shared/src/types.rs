use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SharedError;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = SharedError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }
    };
}

id_type!(
    /// Identity of a portal user, issued by the identity service.
    UserId
);
id_type!(
    /// Identity of a top-level forum post.
    QueryId
);
id_type!(
    /// Identity of a threaded reply.
    ReplyId
);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Administrator => "administrator",
        }
    }

    pub fn is_administrator(&self) -> bool {
        matches!(self, Self::Administrator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "administrator" => Ok(Self::Administrator),
            other => Err(SharedError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Like,
    Dislike,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            other => Err(SharedError::UnknownVoteType(other.to_string())),
        }
    }
}

/// A post that reactions and pins can point at.
///
/// Exactly one kind is ever referenced, so a heart or vote can never be
/// attached to both a query and a reply (or to neither).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "targetType", content = "targetId", rename_all = "lowercase")]
pub enum Target {
    Query(QueryId),
    Reply(ReplyId),
}

impl Target {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Query(_) => "query",
            Self::Reply(_) => "reply",
        }
    }

    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Query(id) => id.0,
            Self::Reply(id) => id.0,
        }
    }

    /// Build a target from its wire representation (`"query"` / `"reply"`).
    pub fn parse(kind: &str, id: &str) -> Result<Self, SharedError> {
        match kind {
            "query" => Ok(Self::Query(id.parse()?)),
            "reply" => Ok(Self::Reply(id.parse()?)),
            other => Err(SharedError::UnknownTargetType(other.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.uuid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!(Role::Administrator.as_str(), "administrator");
        assert!("faculty".parse::<Role>().is_err());
    }

    #[test]
    fn vote_type_rejects_unknown_values() {
        assert_eq!("dislike".parse::<VoteType>().unwrap(), VoteType::Dislike);
        assert_eq!(
            "meh".parse::<VoteType>(),
            Err(SharedError::UnknownVoteType("meh".into()))
        );
    }

    #[test]
    fn target_serializes_as_tagged_pair() {
        let id = QueryId::new();
        let json = serde_json::to_value(Target::Query(id)).unwrap();
        assert_eq!(json["targetType"], "query");
        assert_eq!(json["targetId"], id.to_string());

        let back: Target = serde_json::from_value(json).unwrap();
        assert_eq!(back, Target::Query(id));
    }

    #[test]
    fn target_parse_checks_kind() {
        let id = ReplyId::new();
        let parsed = Target::parse("reply", &id.to_string()).unwrap();
        assert_eq!(parsed, Target::Reply(id));
        assert!(Target::parse("announcement", &id.to_string()).is_err());
        assert!(Target::parse("query", "not-a-uuid").is_err());
    }
}
