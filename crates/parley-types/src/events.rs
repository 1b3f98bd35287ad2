use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CommentableRef, LikeableKind};

/// The four partial-page mutations a client knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamAction {
    Append,
    Replace,
    Update,
    Remove,
}

/// One incremental DOM mutation aimed at an element id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDirective {
    pub action: StreamAction,
    pub target: String,
    /// Rendered markup. Absent for `remove`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl StreamDirective {
    pub fn append(target: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action: StreamAction::Append,
            target: target.into(),
            content: Some(content.into()),
        }
    }

    pub fn replace(target: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action: StreamAction::Replace,
            target: target.into(),
            content: Some(content.into()),
        }
    }

    pub fn update(target: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action: StreamAction::Update,
            target: target.into(),
            content: Some(content.into()),
        }
    }

    pub fn remove(target: impl Into<String>) -> Self {
        Self {
            action: StreamAction::Remove,
            target: target.into(),
            content: None,
        }
    }
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, username: String },

    /// Directives produced by a comment mutation on `topic`
    Stream {
        topic: CommentableRef,
        directives: Vec<StreamDirective>,
    },

    /// A like was added or removed
    LikeUpdate {
        topic: CommentableRef,
        likeable_kind: LikeableKind,
        likeable_id: Uuid,
        likers_count: u64,
    },
}

impl GatewayEvent {
    /// Returns the commentable this event is scoped to.
    /// Events that return `None` are delivered to every connection.
    pub fn topic(&self) -> Option<CommentableRef> {
        match self {
            Self::Stream { topic, .. } => Some(*topic),
            Self::LikeUpdate { topic, .. } => Some(*topic),
            Self::Ready { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Replace the set of commentables this connection follows.
    Subscribe { topics: Vec<CommentableRef> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentableKind;

    #[test]
    fn remove_directive_omits_content() {
        let json = serde_json::to_value(StreamDirective::remove("comment_1")).unwrap();
        assert_eq!(json, serde_json::json!({ "action": "remove", "target": "comment_1" }));
    }

    #[test]
    fn subscribe_command_wire_format() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"Subscribe","data":{{"topics":[{{"kind":"event","id":"{id}"}}]}}}}"#);
        match serde_json::from_str::<GatewayCommand>(&raw).unwrap() {
            GatewayCommand::Subscribe { topics } => {
                assert_eq!(topics, vec![CommentableRef::new(CommentableKind::Event, id)]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
