//! In-process `EntityStore`, used by tests and by embedders that do not need
//! durability. Counters are derived on read, like the SQL store does.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use parley_types::api::HistoryCursor;
use parley_types::models::{Comment, CommentableRef, LikeableKind, Post};

use crate::store::EntityStore;

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    posts: HashMap<Uuid, Post>,
    /// Insertion order doubles as creation order.
    comments: Vec<Comment>,
    likes: HashSet<(LikeableKind, Uuid, Uuid)>,
}

impl Inner {
    fn likers(&self, kind: LikeableKind, id: Uuid) -> u64 {
        self.likes
            .iter()
            .filter(|(k, target, _)| *k == kind && *target == id)
            .count() as u64
    }

    fn hydrate(&self, comment: &Comment) -> Comment {
        let mut c = comment.clone();
        c.likers_count = self.likers(LikeableKind::Comment, c.id);
        c.replies_count = self
            .comments
            .iter()
            .filter(|other| other.parent_id == Some(c.id))
            .count() as u64;
        c.liked = false;
        c
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| anyhow!("store lock poisoned: {}", e))
    }

    pub fn insert_post(&self, post: Post) -> Result<()> {
        self.lock()?.posts.insert(post.id, post);
        Ok(())
    }

    /// Toggle a like. Returns true if it now exists.
    pub fn toggle_like(&self, user_id: Uuid, kind: LikeableKind, id: Uuid) -> Result<bool> {
        let mut inner = self.lock()?;
        let key = (kind, id, user_id);
        if inner.likes.remove(&key) {
            Ok(false)
        } else {
            inner.likes.insert(key);
            Ok(true)
        }
    }
}

impl EntityStore for MemoryStore {
    fn find_commentable(&self, target: &CommentableRef) -> Result<Option<Post>> {
        let inner = self.lock()?;
        Ok(inner
            .posts
            .get(&target.id)
            .filter(|p| p.kind == target.kind)
            .map(|p| {
                let mut post = p.clone();
                post.likers_count = inner.likers(LikeableKind::Post, post.id);
                post.comments_count = inner
                    .comments
                    .iter()
                    .filter(|c| c.commentable == *target)
                    .count() as u64;
                post
            }))
    }

    fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let inner = self.lock()?;
        Ok(inner
            .comments
            .iter()
            .find(|c| c.id == id)
            .map(|c| inner.hydrate(c)))
    }

    fn comments_for(&self, target: &CommentableRef) -> Result<Vec<Comment>> {
        let inner = self.lock()?;
        Ok(inner
            .comments
            .iter()
            .filter(|c| c.commentable == *target)
            .map(|c| inner.hydrate(c))
            .collect())
    }

    fn comments_by(
        &self,
        commenter_id: Uuid,
        before: Option<HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        let inner = self.lock()?;
        let mut mine: Vec<&Comment> = inner
            .comments
            .iter()
            .filter(|c| c.commenter_id == commenter_id && !c.is_deleted())
            .filter(|c| before.is_none_or(|b| b.precedes(c)))
            .collect();
        mine.sort_by_key(|c| std::cmp::Reverse(HistoryCursor::at(c)));
        Ok(mine
            .into_iter()
            .take(limit as usize)
            .map(|c| inner.hydrate(c))
            .collect())
    }

    fn save_comment(&self, comment: &Comment) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.comments.iter_mut().find(|c| c.id == comment.id) {
            existing.text = comment.text.clone();
            existing.updated_at = comment.updated_at;
            return Ok(());
        }
        if let Some(parent_id) = comment.parent_id {
            if !inner.comments.iter().any(|c| c.id == parent_id) {
                bail!("parent comment {} does not exist", parent_id);
            }
        }
        inner.comments.push(comment.clone());
        Ok(())
    }

    fn has_children(&self, id: Uuid) -> Result<bool> {
        Ok(self
            .lock()?
            .comments
            .iter()
            .any(|c| c.parent_id == Some(id)))
    }

    fn delete_if_childless(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.lock()?;
        if inner.comments.iter().any(|c| c.parent_id == Some(id)) {
            return Ok(false);
        }
        let before = inner.comments.len();
        inner.comments.retain(|c| c.id != id);
        let removed = inner.comments.len() != before;
        if removed {
            inner
                .likes
                .retain(|(kind, target, _)| !(*kind == LikeableKind::Comment && *target == id));
        }
        Ok(removed)
    }

    fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(c) = inner.comments.iter_mut().find(|c| c.id == id) {
            c.deleted_at.get_or_insert(at);
        }
        Ok(())
    }

    fn liked_by(&self, viewer: Uuid, kind: LikeableKind, ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        let inner = self.lock()?;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| inner.likes.contains(&(kind, *id, viewer)))
            .collect())
    }
}
