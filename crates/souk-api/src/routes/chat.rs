//! Per-order chat between the customer and the assigned agent.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use souk_common::config;
use souk_common::error::SoukError;
use souk_common::gateway_event::events;
use souk_common::ids::generate_id;
use souk_common::models::chat::{ChatMessage, MessageQuery, SendMessageRequest};
use souk_common::models::notification::NotificationKind;
use souk_common::models::workflow::Party;
use souk_common::validation::validate_request;
use souk_db::repository::chat;
use souk_notify::NewNotification;

use super::{created, max_page, ok, ApiResult, Created};
use crate::workflow::{link, orders::load_visible};
use crate::{middleware::AuthContext, AppState};

const DEFAULT_HISTORY: u32 = 50;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders/{order_id}/messages", get(list_messages).post(send_message))
        .route("/orders/{order_id}/messages/read", post(mark_read))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

#[derive(Debug, Serialize)]
pub struct ReadReceipt {
    pub marked: u64,
}

/// GET /api/v0/orders/{order_id}/messages
///
/// Admins can read a thread but only the two participants write to it.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
) -> ApiResult<Vec<ChatMessage>> {
    let (order, _) = load_visible(&state, &auth, order_id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY).clamp(1, max_page());
    let messages = chat::list_for_order(&state.db.pool, order.id, query.before, i64::from(limit)).await?;
    ok("Messages", messages)
}

/// POST /api/v0/orders/{order_id}/messages
async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Created<ChatMessage> {
    validate_request(&body)?;
    let content = body.content.trim();
    if content.is_empty() {
        return Err(SoukError::Validation {
            message: "Message cannot be empty".into(),
        });
    }
    let max = config::get().limits.max_message_length as usize;
    if content.chars().count() > max {
        return Err(SoukError::Validation {
            message: format!("Message cannot exceed {max} characters"),
        });
    }

    let (order, party) = load_visible(&state, &auth, order_id).await?;
    let recipient = match party {
        Party::Customer => order.agent_id,
        Party::Agent => order.customer_id,
        _ => return Err(SoukError::Forbidden),
    };

    let message = chat::create_message(&state.db.pool, generate_id(), order.id, auth.user_id, content).await?;
    tracing::debug!(order_id = %order.id, message_id = %message.id, "Chat message sent");

    state.publish(recipient, events::CHAT_MESSAGE_CREATE, &message);
    state
        .notifier
        .notify_quietly(
            NewNotification::new(
                recipient,
                NotificationKind::ChatMessage,
                format!("New message on order {}", order.order_number),
                preview(content),
            )
            .with_data(link("order_id", order.id)),
        )
        .await;

    created("Message sent", message)
}

/// POST /api/v0/orders/{order_id}/messages/read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<ReadReceipt> {
    let (order, party) = load_visible(&state, &auth, order_id).await?;
    if !matches!(party, Party::Customer | Party::Agent) {
        return Err(SoukError::Forbidden);
    }
    let marked = chat::mark_read(&state.db.pool, order.id, auth.user_id).await?;
    ok("Messages marked read", ReadReceipt { marked })
}

/// First line of a message, cut to fit a notification.
fn preview(content: &str) -> String {
    const MAX: usize = 80;
    let line = content.lines().next().unwrap_or_default();
    if line.chars().count() <= MAX {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(MAX - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn previews_are_single_line_and_bounded() {
        assert_eq!(preview("tomatoes are out\nshall I get peppers?"), "tomatoes are out");
        let long = "a".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 80);
        assert!(p.ends_with('…'));
    }
}
