use anyhow::Result;

use parley_core::CommentEvent;
use parley_types::events::StreamDirective;
use parley_types::models::Comment;

use crate::fragments::{COMMENTS_CONTAINER, Fragments, dom_id, thread_dom_id};

/// Translate a lifecycle event into the ordered directives a client applies.
pub fn directives(fragments: &Fragments, event: &CommentEvent) -> Result<Vec<StreamDirective>> {
    let directives = match event {
        CommentEvent::Created { comment } => vec![StreamDirective::append(
            COMMENTS_CONTAINER,
            fragments.root_comment(comment)?,
        )],
        // Replies always land in the root's container, even when replying to a reply.
        CommentEvent::Replied { reply, parent } => vec![
            StreamDirective::append(thread_dom_id(reply.thread_id()), fragments.comment(reply)?),
            StreamDirective::update(dom_id(parent.id), fragments.comment_body(parent)?),
        ],
        CommentEvent::Updated { comment } => vec![StreamDirective::replace(
            dom_id(comment.id),
            fragments.comment(comment)?,
        )],
        CommentEvent::SoftDeleted { comment } => vec![StreamDirective::update(
            dom_id(comment.id),
            fragments.comment_body(comment)?,
        )],
        CommentEvent::HardDeleted { comment } => vec![StreamDirective::remove(dom_id(comment.id))],
    };
    Ok(directives)
}

pub fn reply_form(fragments: &Fragments, comment: &Comment) -> Result<Vec<StreamDirective>> {
    Ok(vec![StreamDirective::replace(dom_id(comment.id), fragments.reply_form(comment)?)])
}

pub fn edit_form(fragments: &Fragments, comment: &Comment) -> Result<Vec<StreamDirective>> {
    Ok(vec![StreamDirective::replace(dom_id(comment.id), fragments.edit_form(comment)?)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments::tests::comment;
    use chrono::Utc;
    use parley_types::events::StreamAction;

    fn reply_to(parent: &Comment, text: &str) -> Comment {
        let mut reply = comment(text);
        reply.commentable = parent.commentable;
        reply.parent_id = Some(parent.id);
        reply.thread_root_id = Some(parent.thread_id());
        reply
    }

    #[test]
    fn created_appends_to_the_comments_container() {
        let fragments = Fragments::new().unwrap();
        let c = comment("first");

        let out = directives(&fragments, &CommentEvent::Created { comment: c.clone() }).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].action, StreamAction::Append);
        assert_eq!(out[0].target, "comments-wrapper");
        assert!(out[0].content.as_deref().unwrap().contains("first"));
    }

    #[test]
    fn reply_appends_then_updates_parent() {
        let fragments = Fragments::new().unwrap();
        let mut parent = comment("parent");
        let reply = reply_to(&parent, "child");
        parent.replies_count = 1;

        let out = directives(&fragments, &CommentEvent::Replied { reply, parent: parent.clone() }).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].action, StreamAction::Append);
        assert_eq!(out[0].target, thread_dom_id(parent.id));
        assert_eq!(out[1].action, StreamAction::Update);
        assert_eq!(out[1].target, dom_id(parent.id));
        assert!(out[1].content.as_deref().unwrap().contains("1 replies"));
    }

    #[test]
    fn reply_to_reply_targets_the_root_thread() {
        let fragments = Fragments::new().unwrap();
        let root = comment("root");
        let middle = reply_to(&root, "middle");
        let leaf = reply_to(&middle, "leaf");

        let out = directives(&fragments, &CommentEvent::Replied { reply: leaf, parent: middle.clone() }).unwrap();

        assert_eq!(out[0].target, thread_dom_id(root.id));
        assert_eq!(out[1].target, dom_id(middle.id));
    }

    #[test]
    fn update_and_deletes_target_the_comment() {
        let fragments = Fragments::new().unwrap();
        let mut c = comment("text");

        let updated = directives(&fragments, &CommentEvent::Updated { comment: c.clone() }).unwrap();
        assert_eq!(updated[0].action, StreamAction::Replace);
        assert_eq!(updated[0].target, dom_id(c.id));

        let removed = directives(&fragments, &CommentEvent::HardDeleted { comment: c.clone() }).unwrap();
        assert_eq!(removed, vec![StreamDirective::remove(dom_id(c.id))]);

        c.deleted_at = Some(Utc::now());
        let soft = directives(&fragments, &CommentEvent::SoftDeleted { comment: c.clone() }).unwrap();
        assert_eq!(soft[0].action, StreamAction::Update);
        assert_eq!(soft[0].target, dom_id(c.id));
        assert!(soft[0].content.as_deref().unwrap().contains("This comment was deleted."));
    }

    #[test]
    fn forms_replace_the_comment_node() {
        let fragments = Fragments::new().unwrap();
        let c = comment("text");

        let reply = reply_form(&fragments, &c).unwrap();
        let edit = edit_form(&fragments, &c).unwrap();

        for out in [reply, edit] {
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].action, StreamAction::Replace);
            assert_eq!(out[0].target, dom_id(c.id));
        }
    }
}
