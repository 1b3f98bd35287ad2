use parley_types::models::{Comment, CommentableRef};

/// What a successful mutation did. Presentation layers translate these into
/// client updates; nothing here knows about markup.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentEvent {
    Created { comment: Comment },
    /// `parent` is reloaded after the insert so its counters include `reply`.
    Replied { reply: Comment, parent: Comment },
    Updated { comment: Comment },
    /// The comment still has replies and was tombstoned in place.
    SoftDeleted { comment: Comment },
    /// The comment had no replies and is gone. Holds the last stored state.
    HardDeleted { comment: Comment },
}

impl CommentEvent {
    /// The comment the event is about (the new reply for `Replied`).
    pub fn comment(&self) -> &Comment {
        match self {
            Self::Created { comment }
            | Self::Updated { comment }
            | Self::SoftDeleted { comment }
            | Self::HardDeleted { comment } => comment,
            Self::Replied { reply, .. } => reply,
        }
    }

    pub fn topic(&self) -> CommentableRef {
        self.comment().commentable
    }
}
