//! Database row types. These map directly to SQLite rows and are converted
//! into the shared models at the edge, so schema quirks stay in this crate.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use parley_types::models::{Comment, CommentableKind, CommentableRef, Post};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub likers_count: i64,
    pub comments_count: i64,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub commentable_type: String,
    pub commentable_id: String,
    pub commenter_id: String,
    pub commenter_username: String,
    pub parent_id: Option<String>,
    pub thread_root_id: Option<String>,
    pub text: String,
    pub approved: bool,
    pub likers_count: i64,
    pub replies_count: i64,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl PostRow {
    pub fn into_post(self) -> Post {
        Post {
            id: parse_uuid(&self.id, "id", &self.id),
            author_id: parse_uuid(&self.author_id, "author_id", &self.id),
            kind: parse_kind(&self.kind, &self.id),
            title: self.title,
            body: self.body,
            likers_count: self.likers_count.max(0) as u64,
            comments_count: self.comments_count.max(0) as u64,
            liked: false,
            created_at: parse_timestamp(&self.created_at, &self.id),
        }
    }
}

impl CommentRow {
    pub fn into_comment(self) -> Comment {
        let row_id = self.id.as_str();
        Comment {
            id: parse_uuid(row_id, "id", row_id),
            text: self.text,
            approved: self.approved,
            commenter_id: parse_uuid(&self.commenter_id, "commenter_id", row_id),
            commenter_username: self.commenter_username,
            commentable: CommentableRef::new(
                parse_kind(&self.commentable_type, row_id),
                parse_uuid(&self.commentable_id, "commentable_id", row_id),
            ),
            parent_id: self.parent_id.as_deref().map(|v| parse_uuid(v, "parent_id", row_id)),
            thread_root_id: self
                .thread_root_id
                .as_deref()
                .map(|v| parse_uuid(v, "thread_root_id", row_id)),
            likers_count: self.likers_count.max(0) as u64,
            replies_count: self.replies_count.max(0) as u64,
            liked: false,
            created_at: parse_timestamp(&self.created_at, row_id),
            updated_at: parse_timestamp(&self.updated_at, row_id),
            deleted_at: self.deleted_at.as_deref().map(|v| parse_timestamp(v, row_id)),
        }
    }
}

/// Fixed-width UTC timestamp, so string order matches time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, row_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; treat it as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on row '{}': {}", raw, row_id, e);
            DateTime::default()
        })
}

fn parse_uuid(raw: &str, field: &str, row_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", field, raw, row_id, e);
        Uuid::default()
    })
}

fn parse_kind(raw: &str, row_id: &str) -> CommentableKind {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt commentable kind on row '{}': {}", row_id, e);
        CommentableKind::Post
    })
}
