//! Test harness: a fresh in-memory database per app and a JSON client.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tower::ServiceExt;
use uuid::Uuid;

use souk_api::{auth, build_router, AppState};
use souk_common::config;
use souk_common::models::user::UserRole;
use souk_db::presence::PresenceStore;
use souk_db::repository::users;
use souk_db::Database;
use souk_notify::{EmailQueue, Notifier, RoutingConfig};

pub const PASSWORD: &str = "correct horse battery";
pub const WEBHOOK_SECRET: &str = "whsec_test";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn install_config() -> &'static config::AppConfig {
    let mut cfg = config::defaults("sqlite::memory:", "test-secret-key").expect("defaults");
    cfg.payments.webhook_secret = WEBHOOK_SECRET.into();
    config::install(cfg)
}

pub async fn spawn() -> TestApp {
    install_config();
    let db = Database::connect_url("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();

    let presence = PresenceStore::in_memory(120);
    let (gateway_tx, _) = broadcast::channel(64);
    let notifier = Notifier::new(
        db.pool.clone(),
        presence.clone(),
        gateway_tx.clone(),
        Arc::new(EmailQueue::new()),
        RoutingConfig::default(),
    );
    let state = AppState {
        db,
        gateway_tx,
        notifier,
        presence,
    };
    TestApp {
        router: build_router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(format!("/api/v0{uri}"));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), None).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    /// Register through the API; returns the new user's id and access token.
    pub async fn register(&self, email: &str, role: &str) -> (Uuid, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": "Test",
                    "last_name": "User",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {email}: {body}");
        (id_of(&body["data"]["user"]), body["data"]["access_token"].as_str().unwrap().to_string())
    }

    /// Admins can't self-register, so they are written straight to the database.
    pub async fn admin(&self) -> (Uuid, String) {
        let id = Uuid::now_v7();
        let hash = auth::hash_password(PASSWORD).unwrap();
        users::create_user(
            &self.state.db.pool,
            &users::NewUser {
                id,
                email: "admin@souk.test",
                phone: None,
                first_name: "Site",
                last_name: "Admin",
                password_hash: &hash,
                role: UserRole::Admin,
            },
        )
        .await
        .unwrap();

        let (status, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({ "email": "admin@souk.test", "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login: {body}");
        (id, body["data"]["access_token"].as_str().unwrap().to_string())
    }

    /// A market owned by `agent_token`'s user.
    pub async fn market(&self, agent_token: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/markets",
                agent_token,
                serde_json::json!({
                    "name": "Balogun Market",
                    "address": "Balogun Street, Lagos Island",
                    "city": "Lagos",
                    "state": "Lagos",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create market: {body}");
        id_of(&body["data"])
    }

    /// Take an agent through KYC approval and make them available in `market_id`.
    pub async fn verify_agent(&self, agent_token: &str, admin_token: &str, market_id: Uuid) {
        let (status, body) = self
            .post(
                "/kyc",
                agent_token,
                serde_json::json!({
                    "id_type": "nin",
                    "id_number": "12345678901",
                    "document_url": "https://files.souk.test/id.png",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "submit kyc: {body}");
        let submission = id_of(&body["data"]);

        let (status, body) = self
            .post_empty(&format!("/admin/kyc/{submission}/approve"), admin_token)
            .await;
        assert_eq!(status, StatusCode::OK, "approve kyc: {body}");

        let (status, body) = self
            .patch(
                "/agents/me/availability",
                agent_token,
                serde_json::json!({ "is_available": true, "market_id": market_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "availability: {body}");
    }

    /// A draft list with two items: 2 x 50_000 and 1 x 300_000 kobo.
    pub async fn draft_list(&self, customer_token: &str, market_id: Uuid) -> Uuid {
        let (status, body) = self
            .post(
                "/shopping-lists",
                customer_token,
                serde_json::json!({
                    "market_id": market_id,
                    "title": "Weekly groceries",
                    "items": [
                        { "name": "Tomatoes", "quantity": 2, "unit": "basket", "estimated_price": 50_000 },
                        { "name": "Rice", "quantity": 1, "unit": "bag", "estimated_price": 300_000 },
                    ],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create list: {body}");
        id_of(&body["data"])
    }
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("no id in {value}"))
}
