use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::events::StreamDirective;
use crate::models::{Actor, Comment, CommentableKind};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the gateway handshake.
/// Tokens are issued elsewhere; this service only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
    #[serde(default)]
    pub moderator: bool,
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Actor {
            id: claims.sub,
            username: claims.username,
            moderator: claims.moderator,
        }
    }
}

// -- Comments --

/// Required fields are optional here so that a missing value surfaces as a
/// field-level validation error instead of a body rejection.
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub commentable_type: Option<String>,
    #[serde(default)]
    pub commentable_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Ordered batch of streaming directives returned by every comment mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResponse {
    pub directives: Vec<StreamDirective>,
}

#[derive(Debug, Deserialize)]
pub struct CommentPageQuery {
    #[serde(default = "default_page_limit")]
    pub limit: u32,
    /// `next_cursor` of the previous page.
    pub before: Option<String>,
}

fn default_page_limit() -> u32 {
    20
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub next_cursor: Option<String>,
}

/// Position of the oldest comment already returned in a history listing.
///
/// Comments can share a timestamp, so the id breaks ties. Rendered as
/// `<created_at>_<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HistoryCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl HistoryCursor {
    pub fn at(comment: &Comment) -> Self {
        Self {
            created_at: comment.created_at,
            id: comment.id,
        }
    }

    /// Whether `comment` sorts strictly before this position, newest first.
    pub fn precedes(&self, comment: &Comment) -> bool {
        Self::at(comment) < *self
    }
}

impl fmt::Display for HistoryCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed history cursor '{0}'")]
pub struct InvalidCursor(pub String);

impl FromStr for HistoryCursor {
    type Err = InvalidCursor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCursor(s.to_string());
        let (at, id) = s.split_once('_').ok_or_else(invalid)?;
        Ok(Self {
            created_at: at.parse().map_err(|_| invalid())?,
            id: id.parse().map_err(|_| invalid())?,
        })
    }
}

// -- Posts --

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub kind: Option<CommentableKind>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: String,
}

// -- Likes --

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likers_count: u64,
}
