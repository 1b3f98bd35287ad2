use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The closed set of entities comments can attach to.
///
/// Client input naming a target type is resolved through `FromStr`; anything
/// outside this list is rejected before any lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentableKind {
    Post,
    Event,
}

impl CommentableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for CommentableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for CommentableKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" | "posts" => Ok(Self::Post),
            "event" | "events" => Ok(Self::Event),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// Polymorphic reference to a commentable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentableRef {
    pub kind: CommentableKind,
    pub id: Uuid,
}

impl CommentableRef {
    pub fn new(kind: CommentableKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for CommentableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Entities a like can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeableKind {
    Post,
    Comment,
}

impl LikeableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

impl FromStr for LikeableKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // Events are posts as far as likes are concerned.
            "post" | "posts" | "event" | "events" => Ok(Self::Post),
            "comment" | "comments" => Ok(Self::Comment),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub moderator: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub kind: CommentableKind,
    pub title: String,
    pub body: String,
    pub likers_count: u64,
    pub comments_count: u64,
    #[serde(default)]
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn commentable(&self) -> CommentableRef {
        CommentableRef::new(self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub approved: bool,
    pub commenter_id: Uuid,
    pub commenter_username: String,
    pub commentable: CommentableRef,
    pub parent_id: Option<Uuid>,
    /// Top-level comment this one is displayed under. `None` for thread roots.
    pub thread_root_id: Option<Uuid>,
    pub likers_count: u64,
    pub replies_count: u64,
    /// Per-viewer annotation, never persisted.
    #[serde(default)]
    pub liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Id of the thread root this comment belongs to (itself for roots).
    pub fn thread_id(&self) -> Uuid {
        self.thread_root_id.unwrap_or(self.id)
    }
}

/// A commentable together with its comments, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentThread {
    pub post: Post,
    pub comments: Vec<Comment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commentable_kind_parses_known_names_only() {
        assert_eq!("post".parse::<CommentableKind>(), Ok(CommentableKind::Post));
        assert_eq!(" Events ".parse::<CommentableKind>(), Ok(CommentableKind::Event));
        assert!("App\\Models\\User".parse::<CommentableKind>().is_err());
        assert!("".parse::<CommentableKind>().is_err());
    }

    #[test]
    fn likeable_kind_treats_events_as_posts() {
        assert_eq!("event".parse::<LikeableKind>(), Ok(LikeableKind::Post));
        assert_eq!("comment".parse::<LikeableKind>(), Ok(LikeableKind::Comment));
        assert!("user".parse::<LikeableKind>().is_err());
    }
}
