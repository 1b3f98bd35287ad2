use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use crate::Database;
use crate::models::{CommentRow, PostRow, UserRow, format_timestamp};
use parley_types::api::HistoryCursor;
use parley_types::models::{Comment, CommentableRef, LikeableKind, Post};

const COMMENT_SELECT: &str = "
    SELECT c.id, c.commentable_type, c.commentable_id, c.commenter_id, u.username,
           c.parent_id, c.thread_root_id, c.text, c.approved,
           (SELECT COUNT(*) FROM likes l
             WHERE l.likeable_type = 'comment' AND l.likeable_id = c.id),
           (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id),
           c.created_at, c.updated_at, c.deleted_at
    FROM comments c
    LEFT JOIN users u ON c.commenter_id = u.id";

const POST_SELECT: &str = "
    SELECT p.id, p.author_id, p.kind, p.title, p.body,
           (SELECT COUNT(*) FROM likes l
             WHERE l.likeable_type = 'post' AND l.likeable_id = p.id),
           (SELECT COUNT(*) FROM comments c
             WHERE c.commentable_type = p.kind AND c.commentable_id = p.id),
           p.created_at
    FROM posts p";

impl Database {
    // -- Users --

    /// Record the user behind a verified token, refreshing the display name.
    pub fn upsert_user(&self, id: Uuid, username: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET username = excluded.username",
                (id.to_string(), username, format_timestamp(Utc::now())),
            )?;
            Ok(())
        })
    }

    /// Record a token's user unless the stored row already matches.
    /// Returns whether anything was written.
    pub fn ensure_user(&self, id: Uuid, username: &str) -> Result<bool> {
        if self
            .get_user_by_id(id)?
            .is_some_and(|user| user.username == username)
        {
            return Ok(false);
        }
        self.upsert_user(id, username)?;
        Ok(true)
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                [id.to_string()],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Posts --

    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, kind, title, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    post.id.to_string(),
                    post.author_id.to_string(),
                    post.kind.as_str(),
                    post.title,
                    post.body,
                    format_timestamp(post.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE p.id = ?1", POST_SELECT);
            let row = conn.query_row(&sql, [id.to_string()], post_row).optional()?;
            Ok(row.map(PostRow::into_post))
        })
    }

    /// Lookup scoped to a kind: an event id does not resolve as a post.
    pub fn get_commentable(&self, target: &CommentableRef) -> Result<Option<Post>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE p.id = ?1 AND p.kind = ?2", POST_SELECT);
            let row = conn
                .query_row(&sql, (target.id.to_string(), target.kind.as_str()), post_row)
                .optional()?;
            Ok(row.map(PostRow::into_post))
        })
    }

    // -- Comments --

    pub fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
            let row = conn.query_row(&sql, [id.to_string()], comment_row).optional()?;
            Ok(row.map(CommentRow::into_comment))
        })
    }

    pub fn get_comments_for(&self, target: &CommentableRef) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.commentable_type = ?1 AND c.commentable_id = ?2
                 ORDER BY c.created_at ASC, c.id ASC",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((target.kind.as_str(), target.id.to_string()), comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(CommentRow::into_comment).collect())
        })
    }

    /// Live comments by one user, newest first. `before` is an exclusive
    /// `(created_at, id)` position.
    pub fn get_comments_by(
        &self,
        commenter_id: Uuid,
        before: Option<HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.commenter_id = ?1
                   AND c.deleted_at IS NULL
                   AND (?2 IS NULL OR (c.created_at, c.id) < (?2, ?3))
                 ORDER BY c.created_at DESC, c.id DESC
                 LIMIT ?4",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![
                        commenter_id.to_string(),
                        before.map(|b| format_timestamp(b.created_at)),
                        before.map(|b| b.id.to_string()),
                        limit
                    ],
                    comment_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(CommentRow::into_comment).collect())
        })
    }

    /// Insert, or on an existing id rewrite only `text` and `updated_at`.
    pub fn save_comment(&self, comment: &Comment) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, commentable_type, commentable_id, commenter_id,
                                       parent_id, thread_root_id, text, approved,
                                       created_at, updated_at, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                     text = excluded.text,
                     updated_at = excluded.updated_at",
                rusqlite::params![
                    comment.id.to_string(),
                    comment.commentable.kind.as_str(),
                    comment.commentable.id.to_string(),
                    comment.commenter_id.to_string(),
                    comment.parent_id.map(|id| id.to_string()),
                    comment.thread_root_id.map(|id| id.to_string()),
                    comment.text,
                    comment.approved,
                    format_timestamp(comment.created_at),
                    format_timestamp(comment.updated_at),
                    comment.deleted_at.map(format_timestamp),
                ],
            )?;
            Ok(())
        })
    }

    pub fn comment_has_children(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM comments WHERE parent_id = ?1)",
                [id.to_string()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Remove a comment and its likes, but only while nothing replies to it.
    /// Returns false if the row is missing or has gained a reply.
    pub fn delete_comment_if_childless(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let id = id.to_string();

            let removed = tx.execute(
                "DELETE FROM comments
                 WHERE id = ?1
                   AND NOT EXISTS (SELECT 1 FROM comments child WHERE child.parent_id = ?1)",
                [&id],
            )?;
            if removed > 0 {
                tx.execute(
                    "DELETE FROM likes WHERE likeable_type = 'comment' AND likeable_id = ?1",
                    [&id],
                )?;
            }

            tx.commit()?;
            Ok(removed > 0)
        })
    }

    /// Set the tombstone. An existing tombstone keeps its original time.
    pub fn mark_comment_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE comments SET deleted_at = COALESCE(deleted_at, ?2) WHERE id = ?1",
                (id.to_string(), format_timestamp(at)),
            )?;
            Ok(())
        })
    }

    // -- Likes --

    /// Toggle a like: removes if exists, inserts if not.
    /// Returns (liked, likers_count) after the change.
    pub fn toggle_like(&self, user_id: Uuid, kind: LikeableKind, likeable_id: Uuid) -> Result<(bool, u64)> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let (user, target) = (user_id.to_string(), likeable_id.to_string());

            let removed = tx.execute(
                "DELETE FROM likes WHERE likeable_type = ?1 AND likeable_id = ?2 AND user_id = ?3",
                (kind.as_str(), &target, &user),
            )?;
            let liked = removed == 0;
            if liked {
                tx.execute(
                    "INSERT INTO likes (likeable_type, likeable_id, user_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    (kind.as_str(), &target, &user, format_timestamp(Utc::now())),
                )?;
            }

            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM likes WHERE likeable_type = ?1 AND likeable_id = ?2",
                (kind.as_str(), &target),
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok((liked, count.max(0) as u64))
        })
    }

    /// Batch check which of `ids` the viewer has liked.
    pub fn get_liked_by(&self, viewer: Uuid, kind: LikeableKind, ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (3..ids.len() + 3).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT likeable_id FROM likes
                 WHERE user_id = ?1 AND likeable_type = ?2 AND likeable_id IN ({})",
                placeholders.join(", ")
            );

            let mut values = vec![viewer.to_string(), kind.as_str().to_string()];
            values.extend(ids.iter().map(Uuid::to_string));

            let mut stmt = conn.prepare(&sql)?;
            let liked = stmt
                .query_map(rusqlite::params_from_iter(values.iter()), |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(liked.iter().filter_map(|raw| raw.parse().ok()).collect())
        })
    }

    /// The commentable a likeable belongs to, or `None` if it does not exist.
    pub fn likeable_topic(&self, kind: LikeableKind, id: Uuid) -> Result<Option<CommentableRef>> {
        match kind {
            LikeableKind::Post => Ok(self.get_post(id)?.map(|p| p.commentable())),
            LikeableKind::Comment => Ok(self.get_comment(id)?.map(|c| c.commentable)),
        }
    }
}

fn post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        likers_count: row.get(5)?,
        comments_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn comment_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        commentable_type: row.get(1)?,
        commentable_id: row.get(2)?,
        commenter_id: row.get(3)?,
        commenter_username: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "unknown".to_string()),
        parent_id: row.get(5)?,
        thread_root_id: row.get(6)?,
        text: row.get(7)?,
        approved: row.get(8)?,
        likers_count: row.get(9)?,
        replies_count: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        deleted_at: row.get(13)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
