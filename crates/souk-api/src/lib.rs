//! # souk-api
//!
//! REST API layer for Souk: accounts, the market catalog, shopping lists,
//! orders, payments, chat, notifications and the admin console.

pub mod auth;
pub mod middleware;
pub mod routes;
pub mod workflow;

use std::sync::Arc;

use axum::Router;
use tokio::sync::broadcast;
use uuid::Uuid;

use souk_common::gateway_event::GatewayEvent;
use souk_db::presence::PresenceStore;
use souk_db::Database;
use souk_notify::Notifier;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Broadcast sender to push events to the WebSocket gateway.
    pub gateway_tx: broadcast::Sender<GatewayEvent>,
    pub notifier: Notifier,
    pub presence: PresenceStore,
}

impl AppState {
    /// Push a real-time event to one user's gateway sessions.
    /// Nobody listening is not an error.
    pub fn publish<T: serde::Serialize>(&self, user_id: Uuid, event_type: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(data) => {
                let _ = self
                    .gateway_tx
                    .send(GatewayEvent::to_user(user_id, event_type, data));
            }
            Err(e) => tracing::error!(event_type, "Failed to serialize gateway event: {e}"),
        }
    }
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::addresses::router())
        .merge(routes::markets::router())
        .merge(routes::categories::router())
        .merge(routes::products::router())
        .merge(routes::shopping_lists::router())
        .merge(routes::orders::router())
        .merge(routes::payments::router())
        .merge(routes::payments::webhook_router())
        .merge(routes::chat::router())
        .merge(routes::notifications::router())
        .merge(routes::agents::router())
        .merge(routes::kyc::router())
        .merge(routes::reviews::router())
        .merge(routes::support::router())
        .merge(routes::admin::router());

    Router::new()
        .nest("/api/v0", api_routes)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(Arc::new(state))
}
