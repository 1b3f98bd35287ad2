use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use parley_types::api::Claims;
use parley_types::events::{GatewayCommand, GatewayEvent};
use parley_types::models::CommentableRef;

use crate::dispatcher::{Broadcast, Dispatcher};

/// Ping cadence. Two unanswered pings in a row drop the connection.
const PING_EVERY: Duration = Duration::from_secs(15);
const MAX_MISSED_PONGS: u8 = 2;

const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Commentables a connection follows. Replaced wholesale on every Subscribe.
#[derive(Clone, Default)]
struct Topics(Arc<RwLock<HashSet<CommentableRef>>>);

impl Topics {
    fn replace(&self, topics: Vec<CommentableRef>) {
        match self.0.write() {
            Ok(mut current) => *current = topics.into_iter().collect(),
            Err(e) => debug!("topic lock poisoned: {}", e),
        }
    }

    /// Untargeted broadcasts go to everyone; targeted ones only to followers.
    fn wants(&self, msg: &Broadcast) -> bool {
        match msg.topic {
            None => true,
            Some(topic) => self.0.read().map(|t| t.contains(&topic)).unwrap_or(false),
        }
    }
}

/// Liveness tracking shared between the reader (records pongs) and the writer
/// (sends pings).
#[derive(Clone)]
struct Heartbeat {
    answered: Arc<AtomicBool>,
    missed: u8,
}

impl Heartbeat {
    fn new() -> Self {
        Self {
            answered: Arc::new(AtomicBool::new(true)),
            missed: 0,
        }
    }

    fn pong(&self) {
        self.answered.store(true, Ordering::Release);
    }

    /// Called on every tick; false once the peer has gone quiet for too long.
    fn alive(&mut self) -> bool {
        if self.answered.swap(false, Ordering::Acquire) {
            self.missed = 0;
        } else {
            self.missed += 1;
        }
        self.missed < MAX_MISSED_PONGS
    }
}

/// Serve one gateway client: Identify within the timeout, receive Ready, then
/// get live directives for every commentable it subscribes to.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let (mut sink, mut stream) = socket.split();

    let Some((user_id, username)) = identify(&mut stream, &jwt_secret).await else {
        warn!("Gateway client did not identify in time, closing");
        return;
    };
    info!("{} ({}) joined the gateway", username, user_id);

    let ready = match serde_json::to_string(&GatewayEvent::Ready {
        user_id,
        username: username.clone(),
    }) {
        Ok(json) => json,
        Err(e) => {
            warn!("Could not encode Ready: {}", e);
            return;
        }
    };
    if sink.send(Message::Text(ready.into())).await.is_err() {
        return;
    }

    let topics = Topics::default();
    let heartbeat = Heartbeat::new();

    let mut writer = tokio::spawn(forward(
        sink,
        dispatcher.subscribe(),
        topics.clone(),
        heartbeat.clone(),
    ));
    let mut reader = tokio::spawn(read_commands(stream, topics, heartbeat, user_id, username.clone()));

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }
    info!("{} ({}) left the gateway", username, user_id);
}

async fn forward(
    mut sink: SplitSink<WebSocket, Message>,
    mut events: broadcast::Receiver<Broadcast>,
    topics: Topics,
    mut heartbeat: Heartbeat,
) {
    let mut ping = tokio::time::interval(PING_EVERY);
    ping.tick().await;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(msg) if topics.wants(&msg) => {
                    if sink.send(Message::Text(msg.json.to_string().into())).await.is_err() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Gateway client lagged, skipped {} events", skipped),
                Err(RecvError::Closed) => return,
            },
            _ = ping.tick() => {
                if !heartbeat.alive() {
                    warn!("No pong for {} pings, dropping gateway client", MAX_MISSED_PONGS);
                    return;
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn read_commands(
    mut stream: SplitStream<WebSocket>,
    topics: Topics,
    heartbeat: Heartbeat,
    user_id: Uuid,
    username: String,
) {
    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                Ok(GatewayCommand::Subscribe { topics: followed }) => {
                    info!("{} ({}) follows {} commentables", username, user_id, followed.len());
                    topics.replace(followed);
                }
                Ok(GatewayCommand::Identify { .. }) => debug!("{} identified twice, ignoring", username),
                Err(e) => warn!(
                    "{} ({}) sent an unreadable command: {} ({})",
                    username,
                    user_id,
                    e,
                    text.chars().take(200).collect::<String>()
                ),
            },
            Message::Pong(_) => heartbeat.pong(),
            Message::Close(_) => return,
            _ => {}
        }
    }
}

/// Wait for the first Identify and verify its token.
async fn identify(stream: &mut SplitStream<WebSocket>, jwt_secret: &str) -> Option<(Uuid, String)> {
    let first_identify = async {
        while let Some(Ok(msg)) = stream.next().await {
            let Message::Text(text) = msg else { continue };
            if let Ok(GatewayCommand::Identify { token }) = serde_json::from_str(&text) {
                return verify_token(&token, jwt_secret);
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, first_identify).await.ok().flatten()
}

fn verify_token(token: &str, jwt_secret: &str) -> Option<(Uuid, String)> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?
    .claims;
    Some((claims.sub, claims.username))
}
