use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use parley_types::events::GatewayEvent;
use parley_types::models::CommentableRef;

/// An event serialized once and shared by every connection.
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub topic: Option<CommentableRef>,
    pub json: Arc<str>,
}

/// Fans gateway events out to all connected clients. Each connection filters
/// by the topics it subscribed to.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<Broadcast>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event. A send with no connected clients is not an error.
    pub fn broadcast(&self, event: GatewayEvent) {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Dropping unserializable gateway event: {}", e);
                return;
            }
        };
        let _ = self.inner.broadcast_tx.send(Broadcast {
            topic: event.topic(),
            json: json.into(),
        });
    }

    pub fn connection_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::events::StreamDirective;
    use parley_types::models::CommentableKind;
    use uuid::Uuid;

    #[tokio::test]
    async fn broadcast_carries_topic_and_payload() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();
        assert_eq!(dispatcher.connection_count(), 1);

        let topic = CommentableRef::new(CommentableKind::Post, Uuid::new_v4());
        dispatcher.broadcast(GatewayEvent::Stream {
            topic,
            directives: vec![StreamDirective::remove("comment_x")],
        });

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.topic, Some(topic));
        let value: serde_json::Value = serde_json::from_str(&msg.json).unwrap();
        assert_eq!(value["type"], "Stream");
        assert_eq!(value["data"]["directives"][0]["action"], "remove");
    }

    #[test]
    fn broadcast_without_listeners_is_fine() {
        Dispatcher::new().broadcast(GatewayEvent::Ready {
            user_id: Uuid::new_v4(),
            username: "nobody".into(),
        });
    }
}
