use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use parley_types::api::HistoryCursor;
use parley_types::models::{Actor, Comment, CommentThread, CommentableRef, LikeableKind};

use crate::error::{CommentError, Result};
use crate::events::CommentEvent;
use crate::gate::{Action, AuthorizationGate, Subject};
use crate::store::EntityStore;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Owns the comment lifecycle over an entity store and an authorization gate.
///
/// Every operation is one unit of work against the store and returns a
/// [`CommentEvent`] describing what happened.
pub struct CommentThreads<S, G> {
    store: S,
    gate: G,
}

impl<S: EntityStore, G: AuthorizationGate> CommentThreads<S, G> {
    pub fn new(store: S, gate: G) -> Self {
        Self { store, gate }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load `target` with all of its comments, annotated for `viewer`.
    pub fn list_for_entity(&self, viewer: &Actor, target: &CommentableRef) -> Result<CommentThread> {
        let mut post = self
            .store
            .find_commentable(target)?
            .ok_or_else(|| CommentError::not_found(target.kind.as_str(), target.id))?;
        post.liked = self
            .store
            .liked_by(viewer.id, LikeableKind::Post, &[post.id])?
            .contains(&post.id);

        let mut comments = self.store.comments_for(target)?;
        self.annotate(viewer, &mut comments)?;

        Ok(CommentThread { post, comments })
    }

    pub fn create(&self, actor: &Actor, target: &CommentableRef, message: &str) -> Result<CommentEvent> {
        self.authorize(actor, Action::Create, Subject::CommentType)?;
        let text = validate_message(message)?;

        if self.store.find_commentable(target)?.is_none() {
            return Err(CommentError::not_found(target.kind.as_str(), target.id));
        }

        let comment = new_comment(actor, *target, text, None);
        self.store.save_comment(&comment)?;

        info!("{} commented {} on {}", actor.username, comment.id, target);
        Ok(CommentEvent::Created { comment })
    }

    pub fn reply(&self, actor: &Actor, parent_id: Uuid, message: &str) -> Result<CommentEvent> {
        let parent = self.load(parent_id)?;
        self.authorize(actor, Action::Reply, Subject::Comment(&parent))?;
        let text = validate_message(message)?;

        // The target always comes from the parent, never from the request.
        let reply = new_comment(actor, parent.commentable, text, Some(&parent));
        self.store.save_comment(&reply)?;

        let parent = self.store.find_comment(parent.id)?.unwrap_or(parent);

        info!(
            "{} replied {} to {} (thread {})",
            actor.username,
            reply.id,
            parent.id,
            reply.thread_id()
        );
        Ok(CommentEvent::Replied { reply, parent })
    }

    /// Overwrite the text of a comment. Nothing else changes.
    pub fn update(&self, actor: &Actor, comment_id: Uuid, message: &str) -> Result<CommentEvent> {
        let mut comment = self.load(comment_id)?;
        self.authorize(actor, Action::Update, Subject::Comment(&comment))?;
        let text = validate_message(message)?;

        comment.text = text;
        comment.updated_at = Utc::now();
        self.store.save_comment(&comment)?;

        info!("{} edited comment {}", actor.username, comment.id);
        Ok(CommentEvent::Updated { comment })
    }

    /// Tombstone the comment if it has replies, erase it otherwise.
    ///
    /// The child check runs on every call. If a reply lands between the check
    /// and the removal, the conditional delete refuses and the comment is
    /// tombstoned instead, so a parent is never removed from under a reply.
    pub fn delete(&self, actor: &Actor, comment_id: Uuid) -> Result<CommentEvent> {
        let comment = self.load(comment_id)?;
        self.authorize(actor, Action::Delete, Subject::Comment(&comment))?;

        if !self.store.has_children(comment.id)? {
            if self.store.delete_if_childless(comment.id)? {
                info!("{} deleted comment {}", actor.username, comment.id);
                return Ok(CommentEvent::HardDeleted { comment });
            }
            if self.store.find_comment(comment.id)?.is_none() {
                debug!("Comment {} was removed by a concurrent delete", comment.id);
                return Err(CommentError::not_found("comment", comment.id));
            }
            warn!("Comment {} gained a reply while being deleted, tombstoning", comment.id);
        }

        self.store.mark_deleted(comment.id, Utc::now())?;
        let comment = self.load(comment.id)?;

        info!(
            "{} tombstoned comment {} ({} replies kept)",
            actor.username, comment.id, comment.replies_count
        );
        Ok(CommentEvent::SoftDeleted { comment })
    }

    pub fn find_comment(&self, comment_id: Uuid) -> Result<Comment> {
        self.load(comment_id)
    }

    /// One page of a user's live comments, newest first.
    /// Returns the cursor for the next page when this one is full.
    pub fn comments_by(
        &self,
        viewer: &Actor,
        commenter_id: Uuid,
        before: Option<HistoryCursor>,
        limit: u32,
    ) -> Result<(Vec<Comment>, Option<HistoryCursor>)> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let mut comments = self.store.comments_by(commenter_id, before, limit)?;
        self.annotate(viewer, &mut comments)?;

        let next = if comments.len() as u32 == limit {
            comments.last().map(HistoryCursor::at)
        } else {
            None
        };
        Ok((comments, next))
    }

    fn load(&self, id: Uuid) -> Result<Comment> {
        self.store
            .find_comment(id)?
            .ok_or_else(|| CommentError::not_found("comment", id))
    }

    fn authorize(&self, actor: &Actor, action: Action, subject: Subject<'_>) -> Result<()> {
        if self.gate.can(actor, action, subject) {
            Ok(())
        } else {
            debug!("{} ({}) denied {}", actor.username, actor.id, action);
            Err(CommentError::Unauthorized { action })
        }
    }

    fn annotate(&self, viewer: &Actor, comments: &mut [Comment]) -> Result<()> {
        if comments.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
        let liked = self.store.liked_by(viewer.id, LikeableKind::Comment, &ids)?;
        for c in comments.iter_mut() {
            c.liked = liked.contains(&c.id);
        }
        Ok(())
    }
}

fn validate_message(message: &str) -> Result<String> {
    let text = message.trim();
    if text.is_empty() {
        return Err(CommentError::validation("message", "The message field is required."));
    }
    Ok(text.to_string())
}

fn new_comment(actor: &Actor, commentable: CommentableRef, text: String, parent: Option<&Comment>) -> Comment {
    let now = Utc::now();
    Comment {
        id: Uuid::new_v4(),
        text,
        approved: true,
        commenter_id: actor.id,
        commenter_username: actor.username.clone(),
        commentable,
        parent_id: parent.map(|p| p.id),
        thread_root_id: parent.map(Comment::thread_id),
        likers_count: 0,
        replies_count: 0,
        liked: false,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}
