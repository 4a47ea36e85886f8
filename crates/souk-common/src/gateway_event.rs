//! Gateway event type, shared between the API, the notifier and the gateway.
//!
//! Producers create these when something a user should see in real time
//! happens (a notification, a chat message, an order status change) and the
//! gateway forwards them to that user's connected sessions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event names sent over the gateway.
pub mod events {
    pub const NOTIFICATION_CREATE: &str = "NOTIFICATION_CREATE";
    pub const CHAT_MESSAGE_CREATE: &str = "CHAT_MESSAGE_CREATE";
    pub const ORDER_UPDATE: &str = "ORDER_UPDATE";
    pub const SHOPPING_LIST_UPDATE: &str = "SHOPPING_LIST_UPDATE";
}

/// Events broadcast through the gateway to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Event type (e.g., "NOTIFICATION_CREATE", "CHAT_MESSAGE_CREATE")
    pub event_type: String,
    /// Event payload as JSON
    pub data: serde_json::Value,
    /// The user this event is addressed to
    pub user_id: Uuid,
}

impl GatewayEvent {
    pub fn to_user(user_id: Uuid, event_type: &str, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            data,
            user_id,
        }
    }
}
