use std::fmt;

use parley_types::models::{Actor, Comment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Reply,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Reply => "reply",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// What an action is checked against: the comment type as a whole
/// (coarse "may this actor comment at all") or a specific comment.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    CommentType,
    Comment(&'a Comment),
}

/// Yes/no answer to "may `actor` perform `action` on `subject`".
pub trait AuthorizationGate {
    fn can(&self, actor: &Actor, action: Action, subject: Subject<'_>) -> bool;
}

impl<F> AuthorizationGate for F
where
    F: Fn(&Actor, Action, Subject<'_>) -> bool,
{
    fn can(&self, actor: &Actor, action: Action, subject: Subject<'_>) -> bool {
        self(actor, action, subject)
    }
}

/// Default rules.
///
/// Tombstoned comments accept neither replies nor edits. Deleting stays open
/// to the owner and moderators so a childless tombstone can be purged.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentPolicy;

impl AuthorizationGate for CommentPolicy {
    fn can(&self, actor: &Actor, action: Action, subject: Subject<'_>) -> bool {
        match (action, subject) {
            (Action::Create, Subject::CommentType) => true,
            (Action::Reply, Subject::Comment(parent)) => !parent.is_deleted(),
            (Action::Update, Subject::Comment(comment)) => {
                comment.commenter_id == actor.id && !comment.is_deleted()
            }
            (Action::Delete, Subject::Comment(comment)) => {
                comment.commenter_id == actor.id || actor.moderator
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_types::models::{CommentableKind, CommentableRef};
    use uuid::Uuid;

    fn actor(moderator: bool) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            username: "alice".into(),
            moderator,
        }
    }

    fn comment_by(owner: Uuid) -> Comment {
        let now = Utc::now();
        Comment {
            id: Uuid::new_v4(),
            text: "hello".into(),
            approved: true,
            commenter_id: owner,
            commenter_username: "owner".into(),
            commentable: CommentableRef::new(CommentableKind::Post, Uuid::new_v4()),
            parent_id: None,
            thread_root_id: None,
            likers_count: 0,
            replies_count: 0,
            liked: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn anyone_may_comment_and_reply() {
        let stranger = actor(false);
        let c = comment_by(Uuid::new_v4());
        assert!(CommentPolicy.can(&stranger, Action::Create, Subject::CommentType));
        assert!(CommentPolicy.can(&stranger, Action::Reply, Subject::Comment(&c)));
    }

    #[test]
    fn only_owner_updates() {
        let owner = actor(false);
        let moderator = actor(true);
        let c = comment_by(owner.id);
        assert!(CommentPolicy.can(&owner, Action::Update, Subject::Comment(&c)));
        assert!(!CommentPolicy.can(&moderator, Action::Update, Subject::Comment(&c)));
    }

    #[test]
    fn moderators_may_delete_others_comments() {
        let stranger = actor(false);
        let moderator = actor(true);
        let c = comment_by(Uuid::new_v4());
        assert!(!CommentPolicy.can(&stranger, Action::Delete, Subject::Comment(&c)));
        assert!(CommentPolicy.can(&moderator, Action::Delete, Subject::Comment(&c)));
    }

    #[test]
    fn tombstones_reject_replies_and_edits() {
        let owner = actor(false);
        let mut c = comment_by(owner.id);
        c.deleted_at = Some(Utc::now());
        assert!(!CommentPolicy.can(&owner, Action::Reply, Subject::Comment(&c)));
        assert!(!CommentPolicy.can(&owner, Action::Update, Subject::Comment(&c)));
        assert!(CommentPolicy.can(&owner, Action::Delete, Subject::Comment(&c)));
    }

    #[test]
    fn instance_actions_need_an_instance() {
        let owner = actor(true);
        assert!(!CommentPolicy.can(&owner, Action::Delete, Subject::CommentType));
    }

    fn deny_all(_: &Actor, _: Action, _: Subject<'_>) -> bool {
        false
    }

    #[test]
    fn functions_are_gates() {
        assert!(!deny_all.can(&actor(true), Action::Create, Subject::CommentType));
    }
}
