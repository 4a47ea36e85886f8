//! # souk-gateway
//!
//! Real-time WebSocket gateway for Souk. A client connects to `/gateway`,
//! receives `Hello`, identifies with its access token and from then on gets
//! every [`GatewayEvent`] addressed to it as a `Dispatch`.
//!
//! The gateway also owns presence: identifying and heartbeats keep the user
//! online, and closing the user's last session marks them offline. The
//! notification dispatcher reads that presence to decide when to email.

pub mod session;

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

use souk_common::auth::{self, ACCESS};
use souk_common::gateway_event::GatewayEvent;
use souk_db::presence::PresenceStore;
use souk_db::repository::notifications;
use souk_db::Database;

use session::SessionManager;

/// Upper bound on the heartbeat interval announced in `Hello`.
const MAX_HEARTBEAT_INTERVAL_MS: u64 = 45_000;

#[derive(Clone)]
pub struct GatewayState {
    /// Shared with the API and the notifier, which publish into it.
    pub broadcast: broadcast::Sender<GatewayEvent>,
    pub db: Database,
    pub presence: PresenceStore,
    pub sessions: Arc<SessionManager>,
    pub heartbeat_interval_ms: u64,
}

impl GatewayState {
    /// Clients are asked to heartbeat at half the presence TTL so a single
    /// late beat does not flip them offline.
    pub fn new(
        db: Database,
        presence: PresenceStore,
        broadcast: broadcast::Sender<GatewayEvent>,
        presence_ttl_secs: u64,
    ) -> Self {
        Self {
            broadcast,
            db,
            presence,
            sessions: Arc::new(SessionManager::new()),
            heartbeat_interval_ms: heartbeat_interval_ms(presence_ttl_secs),
        }
    }
}

fn heartbeat_interval_ms(presence_ttl_secs: u64) -> u64 {
    (presence_ttl_secs.saturating_mul(1000) / 2).clamp(1000, MAX_HEARTBEAT_INTERVAL_MS)
}

/// Gateway opcodes, framed as `{"op": ..., "d": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum GatewayMessage {
    /// Server → Client: sent on connect
    Hello { heartbeat_interval: u64 },

    /// Client → Server: authenticate with an access token
    Identify { token: String },

    /// Server → Client: identified
    Ready {
        session_id: String,
        user_id: Uuid,
        unread_notifications: i64,
    },

    /// Client → Server: keepalive
    Heartbeat {
        #[serde(default)]
        timestamp: i64,
    },

    /// Server → Client
    HeartbeatAck { timestamp: i64 },

    /// Server → Client: an event for this user
    Dispatch {
        event: String,
        data: serde_json::Value,
        sequence: u64,
    },

    /// Server → Client: the token was rejected; identify again
    InvalidSession,
}

impl GatewayMessage {
    fn frame(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Message::Text(text.into())),
            Err(e) => {
                tracing::error!("Failed to encode gateway message: {e}");
                None
            }
        }
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/gateway", get(ws_handler))
        .with_state(Arc::new(state))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<GatewayState>>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>) {
    let (mut sender, mut receiver) = socket.split();
    let session_id = Uuid::now_v7().to_string();

    // Replies from the receive loop (Ready, HeartbeatAck) go through here so
    // only the send task ever writes to the socket.
    let (direct_tx, mut direct_rx) = mpsc::channel::<GatewayMessage>(64);
    // Set once the client identifies; the send task forwards nothing before.
    let (user_tx, user_rx) = watch::channel::<Option<Uuid>>(None);

    // Subscribe before Hello so nothing published after identify is missed.
    let mut events = state.broadcast.subscribe();

    let hello = GatewayMessage::Hello {
        heartbeat_interval: state.heartbeat_interval_ms,
    };
    let Some(hello) = hello.frame() else { return };
    if sender.send(hello).await.is_err() {
        return;
    }

    let send_session = session_id.clone();
    let send_task = tokio::spawn(async move {
        let mut sequence = 0u64;
        loop {
            let outgoing = tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        if *user_rx.borrow() != Some(event.user_id) {
                            continue;
                        }
                        sequence += 1;
                        GatewayMessage::Dispatch {
                            event: event.event_type,
                            data: event.data,
                            sequence,
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(session = %send_session, skipped, "Gateway session lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                direct = direct_rx.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
            };
            let Some(frame) = outgoing.frame() else { continue };
            if sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut user_id: Option<Uuid> = None;

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(msg) = serde_json::from_str::<GatewayMessage>(&text) else {
            continue;
        };
        match msg {
            GatewayMessage::Identify { token } => {
                if user_id.is_some() {
                    continue;
                }
                let Some(uid) = identify(&token) else {
                    let _ = direct_tx.send(GatewayMessage::InvalidSession).await;
                    continue;
                };

                state.sessions.register(&session_id, uid).await;
                if let Err(e) = state.presence.touch(uid).await {
                    tracing::warn!(user = %uid, "Failed to record presence: {e}");
                }
                let unread = notifications::unread_count(&state.db.pool, uid)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(user = %uid, "Failed to count unread notifications: {e}");
                        0
                    });

                user_id = Some(uid);
                let _ = user_tx.send(Some(uid));
                let _ = direct_tx
                    .send(GatewayMessage::Ready {
                        session_id: session_id.clone(),
                        user_id: uid,
                        unread_notifications: unread,
                    })
                    .await;
                tracing::info!(session = %session_id, user = %uid, "Gateway READY sent");
            }

            GatewayMessage::Heartbeat { .. } => {
                if let Some(uid) = state.sessions.heartbeat(&session_id).await {
                    if let Err(e) = state.presence.touch(uid).await {
                        tracing::warn!(user = %uid, "Failed to refresh presence: {e}");
                    }
                }
                let _ = direct_tx
                    .send(GatewayMessage::HeartbeatAck {
                        timestamp: chrono::Utc::now().timestamp_millis(),
                    })
                    .await;
            }

            // Server-only opcodes
            _ => {}
        }
    }

    if let Some((uid, last)) = state.sessions.remove(&session_id).await {
        if last {
            if let Err(e) = state.presence.mark_offline(uid).await {
                tracing::warn!(user = %uid, "Failed to mark user offline: {e}");
            }
        }
    }

    send_task.abort();
    tracing::info!(session = %session_id, "Client disconnected from gateway");
}

/// The user an access token belongs to. Refresh tokens are refused.
fn identify(token: &str) -> Option<Uuid> {
    let config = souk_common::config::get();
    let claims = auth::validate_token(token, &config.auth.jwt_secret).ok()?;
    if claims.token_type != ACCESS {
        return None;
    }
    claims.sub.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_use_op_and_d() {
        let msg: GatewayMessage =
            serde_json::from_str(r#"{"op":"Identify","d":{"token":"abc"}}"#).unwrap();
        assert_eq!(msg, GatewayMessage::Identify { token: "abc".into() });

        let beat: GatewayMessage = serde_json::from_str(r#"{"op":"Heartbeat","d":{}}"#).unwrap();
        assert_eq!(beat, GatewayMessage::Heartbeat { timestamp: 0 });

        let ack = serde_json::to_value(GatewayMessage::HeartbeatAck { timestamp: 7 }).unwrap();
        assert_eq!(ack, serde_json::json!({"op": "HeartbeatAck", "d": {"timestamp": 7}}));
    }

    #[test]
    fn heartbeat_interval_follows_presence_ttl() {
        assert_eq!(heartbeat_interval_ms(120), 45_000);
        assert_eq!(heartbeat_interval_ms(60), 30_000);
        assert_eq!(heartbeat_interval_ms(0), 1000);
    }
}
