use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use parley_types::api::HistoryCursor;
use parley_types::models::{Comment, CommentableRef, LikeableKind, Post};

/// Persistence consumed by the thread manager.
///
/// Loaded comments carry `likers_count` and `replies_count`; `liked` is left
/// `false` and filled in by the caller for a specific viewer.
pub trait EntityStore {
    /// Resolve a commentable target. `None` if no entity of that kind exists.
    fn find_commentable(&self, target: &CommentableRef) -> Result<Option<Post>>;

    fn find_comment(&self, id: Uuid) -> Result<Option<Comment>>;

    /// Direct and nested comments on `target`, oldest first.
    fn comments_for(&self, target: &CommentableRef) -> Result<Vec<Comment>>;

    /// A commenter's live comments ordered by `(created_at, id)` descending,
    /// strictly past `before`.
    fn comments_by(
        &self,
        commenter_id: Uuid,
        before: Option<HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<Comment>>;

    /// Insert a new comment, or for an existing id overwrite `text` and
    /// `updated_at` only. References are never rewritten.
    fn save_comment(&self, comment: &Comment) -> Result<()>;

    fn has_children(&self, id: Uuid) -> Result<bool>;

    /// Permanently remove the comment only if nothing references it as a
    /// parent, checked and applied atomically. Returns whether a row was removed.
    fn delete_if_childless(&self, id: Uuid) -> Result<bool>;

    /// Tombstone the comment. An existing tombstone keeps its original time.
    fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Subset of `ids` the viewer has liked.
    fn liked_by(&self, viewer: Uuid, kind: LikeableKind, ids: &[Uuid]) -> Result<HashSet<Uuid>>;
}

impl<T: EntityStore + ?Sized> EntityStore for Arc<T> {
    fn find_commentable(&self, target: &CommentableRef) -> Result<Option<Post>> {
        (**self).find_commentable(target)
    }

    fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        (**self).find_comment(id)
    }

    fn comments_for(&self, target: &CommentableRef) -> Result<Vec<Comment>> {
        (**self).comments_for(target)
    }

    fn comments_by(
        &self,
        commenter_id: Uuid,
        before: Option<HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        (**self).comments_by(commenter_id, before, limit)
    }

    fn save_comment(&self, comment: &Comment) -> Result<()> {
        (**self).save_comment(comment)
    }

    fn has_children(&self, id: Uuid) -> Result<bool> {
        (**self).has_children(id)
    }

    fn delete_if_childless(&self, id: Uuid) -> Result<bool> {
        (**self).delete_if_childless(id)
    }

    fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        (**self).mark_deleted(id, at)
    }

    fn liked_by(&self, viewer: Uuid, kind: LikeableKind, ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        (**self).liked_by(viewer, kind, ids)
    }
}
