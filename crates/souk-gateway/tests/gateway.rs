use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use souk_common::auth::{Claims, ACCESS, REFRESH};
use souk_common::config;
use souk_common::gateway_event::{events, GatewayEvent};
use souk_common::models::user::UserRole;
use souk_db::presence::PresenceStore;
use souk_db::Database;
use souk_gateway::{build_router, GatewayState};

const SECRET: &str = "gateway-test-secret";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Harness {
    url: String,
    events: broadcast::Sender<GatewayEvent>,
    presence: PresenceStore,
}

async fn start() -> Harness {
    config::install(config::defaults("sqlite::memory:", SECRET).unwrap());
    let db = Database::connect_url("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();

    let presence = PresenceStore::in_memory(120);
    let (events, _) = broadcast::channel(16);
    let state = GatewayState::new(db, presence.clone(), events.clone(), 120);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    Harness {
        url: format!("ws://{addr}/gateway"),
        events,
        presence,
    }
}

fn token(user_id: Uuid, token_type: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: "ada@example.com".into(),
        role: UserRole::Customer,
        iat: now,
        exp: now + 600,
        token_type: token_type.into(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn next(ws: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("gateway went quiet")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send(ws: &mut Socket, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

async fn connect(h: &Harness) -> Socket {
    let (mut ws, _) = connect_async(h.url.as_str()).await.unwrap();
    let hello = next(&mut ws).await;
    assert_eq!(hello["op"], "Hello");
    assert_eq!(hello["d"]["heartbeat_interval"], 45_000);
    ws
}

#[tokio::test]
async fn identified_session_receives_its_own_events() {
    let h = start().await;
    let user = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let mut ws = connect(&h).await;

    send(&mut ws, json!({"op": "Identify", "d": {"token": token(user, ACCESS)}})).await;
    let ready = next(&mut ws).await;
    assert_eq!(ready["op"], "Ready");
    assert_eq!(ready["d"]["user_id"], user.to_string());
    assert_eq!(ready["d"]["unread_notifications"], 0);
    assert!(h.presence.get(user).await.unwrap().online);

    h.events
        .send(GatewayEvent::to_user(stranger, events::ORDER_UPDATE, json!({"n": 0})))
        .unwrap();
    h.events
        .send(GatewayEvent::to_user(user, events::NOTIFICATION_CREATE, json!({"n": 1})))
        .unwrap();

    let dispatch = next(&mut ws).await;
    assert_eq!(dispatch["op"], "Dispatch");
    assert_eq!(dispatch["d"]["event"], events::NOTIFICATION_CREATE);
    assert_eq!(dispatch["d"]["data"]["n"], 1);
    assert_eq!(dispatch["d"]["sequence"], 1);

    send(&mut ws, json!({"op": "Heartbeat", "d": {"timestamp": 1}})).await;
    assert_eq!(next(&mut ws).await["op"], "HeartbeatAck");

    ws.close(None).await.unwrap();
    let mut offline = false;
    for _ in 0..50 {
        let presence = h.presence.get(user).await.unwrap();
        if !presence.online {
            assert!(presence.last_seen.is_some());
            offline = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(offline, "user still online after their only session closed");
}

#[tokio::test]
async fn bad_tokens_get_invalid_session() {
    let h = start().await;
    let mut ws = connect(&h).await;

    send(&mut ws, json!({"op": "Identify", "d": {"token": "garbage"}})).await;
    assert_eq!(next(&mut ws).await["op"], "InvalidSession");

    let user = Uuid::new_v4();
    send(&mut ws, json!({"op": "Identify", "d": {"token": token(user, REFRESH)}})).await;
    assert_eq!(next(&mut ws).await["op"], "InvalidSession");
    assert!(!h.presence.get(user).await.unwrap().online);

    // Unidentified sessions still get acks but no events.
    h.events
        .send(GatewayEvent::to_user(user, events::NOTIFICATION_CREATE, json!({})))
        .unwrap();
    send(&mut ws, json!({"op": "Heartbeat", "d": {"timestamp": 2}})).await;
    assert_eq!(next(&mut ws).await["op"], "HeartbeatAck");
}
