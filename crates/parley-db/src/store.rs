use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use parley_core::EntityStore;
use parley_types::api::HistoryCursor;
use parley_types::models::{Comment, CommentableRef, LikeableKind, Post};

use crate::Database;

impl EntityStore for Database {
    fn find_commentable(&self, target: &CommentableRef) -> Result<Option<Post>> {
        self.get_commentable(target)
    }

    fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.get_comment(id)
    }

    fn comments_for(&self, target: &CommentableRef) -> Result<Vec<Comment>> {
        self.get_comments_for(target)
    }

    fn comments_by(
        &self,
        commenter_id: Uuid,
        before: Option<HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        self.get_comments_by(commenter_id, before, limit)
    }

    fn save_comment(&self, comment: &Comment) -> Result<()> {
        Database::save_comment(self, comment)
    }

    fn has_children(&self, id: Uuid) -> Result<bool> {
        self.comment_has_children(id)
    }

    fn delete_if_childless(&self, id: Uuid) -> Result<bool> {
        self.delete_comment_if_childless(id)
    }

    fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.mark_comment_deleted(id, at)
    }

    fn liked_by(&self, viewer: Uuid, kind: LikeableKind, ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        self.get_liked_by(viewer, kind, ids)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use parley_core::{CommentEvent, CommentPolicy, CommentThreads};
    use parley_types::models::{Actor, CommentableKind};

    fn user(db: &Database, name: &str) -> Actor {
        let actor = Actor {
            id: Uuid::new_v4(),
            username: name.into(),
            moderator: false,
        };
        db.upsert_user(actor.id, &actor.username).unwrap();
        actor
    }

    fn post(db: &Database, author: &Actor, kind: CommentableKind) -> CommentableRef {
        let post = Post {
            id: Uuid::new_v4(),
            author_id: author.id,
            kind,
            title: "Spring meetup".into(),
            body: "Bring snacks".into(),
            likers_count: 0,
            comments_count: 0,
            liked: false,
            created_at: Utc::now(),
        };
        db.insert_post(&post).unwrap();
        post.commentable()
    }

    fn threads() -> (CommentThreads<Arc<Database>, CommentPolicy>, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        (CommentThreads::new(db.clone(), CommentPolicy), db)
    }

    fn created(event: CommentEvent) -> Comment {
        match event {
            CommentEvent::Created { comment } => comment,
            other => panic!("expected Created, got {:?}", other),
        }
    }

    #[test]
    fn commentable_lookup_is_scoped_by_kind() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "author");
        let event = post(&db, &author, CommentableKind::Event);

        assert!(db.find_commentable(&event).unwrap().is_some());
        let as_post = CommentableRef::new(CommentableKind::Post, event.id);
        assert!(db.find_commentable(&as_post).unwrap().is_none());
    }

    #[test]
    fn stored_comment_roundtrips() {
        let (threads, db) = threads();
        let u = user(&db, "u");
        let target = post(&db, &u, CommentableKind::Post);

        let c = created(threads.create(&u, &target, "hi").unwrap());
        let stored = db.find_comment(c.id).unwrap().unwrap();

        assert_eq!(stored.text, "hi");
        assert_eq!(stored.commenter_id, u.id);
        assert_eq!(stored.commenter_username, "u");
        assert_eq!(stored.commentable, target);
        assert_eq!(stored.parent_id, None);
        assert!(stored.approved);
    }

    #[test]
    fn save_never_rewrites_references() {
        let (threads, db) = threads();
        let u = user(&db, "u");
        let target = post(&db, &u, CommentableKind::Post);
        let c = created(threads.create(&u, &target, "hi").unwrap());

        let mut tampered = c.clone();
        tampered.text = "edited".into();
        tampered.commenter_id = user(&db, "intruder").id;
        tampered.commentable = CommentableRef::new(CommentableKind::Event, Uuid::new_v4());
        db.save_comment(&tampered).unwrap();

        let stored = db.find_comment(c.id).unwrap().unwrap();
        assert_eq!(stored.text, "edited");
        assert_eq!(stored.commenter_id, u.id);
        assert_eq!(stored.commentable, target);
    }

    #[test]
    fn conditional_delete_refuses_parents() {
        let (threads, db) = threads();
        let u = user(&db, "u");
        let target = post(&db, &u, CommentableKind::Post);
        let parent = created(threads.create(&u, &target, "parent").unwrap());
        threads.reply(&u, parent.id, "child").unwrap();

        assert!(db.has_children(parent.id).unwrap());
        assert!(!db.delete_if_childless(parent.id).unwrap());
        assert!(db.find_comment(parent.id).unwrap().is_some());
    }

    #[test]
    fn delete_state_machine_against_sqlite() {
        let (threads, db) = threads();
        let owner = user(&db, "owner");
        let target = post(&db, &owner, CommentableKind::Post);
        let c2 = created(threads.create(&owner, &target, "parent").unwrap());
        let c3 = match threads.reply(&owner, c2.id, "child").unwrap() {
            CommentEvent::Replied { reply, parent } => {
                assert_eq!(parent.replies_count, 1);
                reply
            }
            other => panic!("expected Replied, got {:?}", other),
        };

        assert!(matches!(threads.delete(&owner, c2.id).unwrap(), CommentEvent::SoftDeleted { .. }));
        let tombstone = db.find_comment(c2.id).unwrap().unwrap();
        assert!(tombstone.deleted_at.is_some());
        assert_eq!(db.find_comment(c3.id).unwrap().unwrap().text, "child");

        assert!(matches!(threads.delete(&owner, c3.id).unwrap(), CommentEvent::HardDeleted { .. }));
        assert!(db.find_comment(c3.id).unwrap().is_none());
    }

    #[test]
    fn hard_delete_removes_likes() {
        let (threads, db) = threads();
        let u = user(&db, "u");
        let target = post(&db, &u, CommentableKind::Post);
        let c = created(threads.create(&u, &target, "likeable").unwrap());
        db.toggle_like(u.id, LikeableKind::Comment, c.id).unwrap();

        threads.delete(&u, c.id).unwrap();

        let remaining: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM likes", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn reply_to_vanished_parent_is_rejected_by_the_schema() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "u");
        let target = post(&db, &u, CommentableKind::Post);
        let now = Utc::now();
        let orphan = Comment {
            id: Uuid::new_v4(),
            text: "orphan".into(),
            approved: true,
            commenter_id: u.id,
            commenter_username: u.username.clone(),
            commentable: target,
            parent_id: Some(Uuid::new_v4()),
            thread_root_id: None,
            likers_count: 0,
            replies_count: 0,
            liked: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        assert!(db.save_comment(&orphan).is_err());
    }

    #[test]
    fn toggling_a_like_twice_restores_the_count() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "u");
        let other = user(&db, "other");
        let target = post(&db, &u, CommentableKind::Post);

        assert_eq!(db.toggle_like(u.id, LikeableKind::Post, target.id).unwrap(), (true, 1));
        assert_eq!(db.toggle_like(other.id, LikeableKind::Post, target.id).unwrap(), (true, 2));
        assert_eq!(db.toggle_like(u.id, LikeableKind::Post, target.id).unwrap(), (false, 1));

        let liked = db.liked_by(other.id, LikeableKind::Post, &[target.id]).unwrap();
        assert!(liked.contains(&target.id));
        assert!(db.liked_by(u.id, LikeableKind::Post, &[target.id]).unwrap().is_empty());
        assert_eq!(db.find_commentable(&target).unwrap().unwrap().likers_count, 1);
    }

    #[test]
    fn listing_counts_and_orders_comments() {
        let (threads, db) = threads();
        let u = user(&db, "u");
        let target = post(&db, &u, CommentableKind::Event);
        let first = created(threads.create(&u, &target, "first").unwrap());
        std::thread::sleep(std::time::Duration::from_millis(2));
        threads.reply(&u, first.id, "second").unwrap();
        db.toggle_like(u.id, LikeableKind::Comment, first.id).unwrap();

        let thread = threads.list_for_entity(&u, &target).unwrap();

        assert_eq!(thread.post.comments_count, 2);
        assert_eq!(thread.comments.len(), 2);
        assert_eq!(thread.comments[0].id, first.id);
        assert_eq!(thread.comments[0].replies_count, 1);
        assert_eq!(thread.comments[0].likers_count, 1);
        assert!(thread.comments[0].liked);
        assert_eq!(thread.comments[1].thread_root_id, Some(first.id));
    }

    #[test]
    fn history_skips_tombstones_and_pages() {
        let (threads, db) = threads();
        let u = user(&db, "u");
        let target = post(&db, &u, CommentableKind::Post);
        let mut ids = Vec::new();
        for i in 0..3 {
            std::thread::sleep(std::time::Duration::from_millis(2));
            ids.push(created(threads.create(&u, &target, &format!("c{}", i)).unwrap()).id);
        }
        std::thread::sleep(std::time::Duration::from_millis(2));
        threads.reply(&u, ids[0], "keeps c0 alive").unwrap();
        threads.delete(&u, ids[0]).unwrap();

        let (page, next) = threads.comments_by(&u, u.id, None, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[1].id, ids[2]);

        let (page, next) = threads.comments_by(&u, u.id, next, 2).unwrap();
        assert_eq!(page.iter().map(|c| c.id).collect::<Vec<_>>(), vec![ids[1]]);
        assert!(next.is_none());
    }

    #[test]
    fn history_cursor_breaks_timestamp_ties_by_id() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "u");
        let target = post(&db, &u, CommentableKind::Post);
        let at = Utc::now();
        for text in ["a", "b", "c"] {
            let comment = Comment {
                id: Uuid::new_v4(),
                text: text.into(),
                approved: true,
                commenter_id: u.id,
                commenter_username: u.username.clone(),
                commentable: target,
                parent_id: None,
                thread_root_id: None,
                likers_count: 0,
                replies_count: 0,
                liked: false,
                created_at: at,
                updated_at: at,
                deleted_at: None,
            };
            db.save_comment(&comment).unwrap();
        }

        let first = db.comments_by(u.id, None, 2).unwrap();
        let cursor = first.last().map(HistoryCursor::at);
        let second = db.comments_by(u.id, cursor, 2).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        let mut seen: Vec<_> = first.iter().chain(&second).map(|c| c.text.clone()).collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn known_users_are_not_rewritten() {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4();

        assert!(db.ensure_user(id, "ada").unwrap());
        assert!(!db.ensure_user(id, "ada").unwrap());
        assert!(db.ensure_user(id, "ada_l").unwrap());
        assert_eq!(db.get_user_by_id(id).unwrap().unwrap().username, "ada_l");
    }
}
