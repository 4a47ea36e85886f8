//! The caller's notification inbox.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{delete, get, post},
    Extension, Router,
};
use uuid::Uuid;

use souk_common::error::SoukError;
use souk_common::models::notification::{Notification, NotificationQuery, UnreadCount};
use souk_common::response::{PageParams, Paginated};
use souk_db::repository::notifications;

use super::{max_page, ok, ApiResult};
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/{notification_id}/read", post(mark_read))
        .route("/notifications/{notification_id}", delete(delete_notification))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// GET /api/v0/notifications
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<NotificationQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Notification>> {
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items =
        notifications::list_for_user(&state.db.pool, auth.user_id, filter.unread_only, limit, offset)
            .await?;
    let total = notifications::count_for_user(&state.db.pool, auth.user_id, filter.unread_only).await?;
    ok("Notifications", Paginated::new(items, total, page, max))
}

/// GET /api/v0/notifications/unread-count
async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<UnreadCount> {
    let unread = notifications::unread_count(&state.db.pool, auth.user_id).await?;
    ok("Unread count", UnreadCount { unread })
}

/// POST /api/v0/notifications/{notification_id}/read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<()> {
    if !notifications::mark_read(&state.db.pool, notification_id, auth.user_id).await? {
        return Err(SoukError::not_found("Notification"));
    }
    ok("Notification marked read", ())
}

/// POST /api/v0/notifications/read-all
async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<UnreadCount> {
    let marked = notifications::mark_all_read(&state.db.pool, auth.user_id).await?;
    tracing::debug!(user_id = %auth.user_id, marked, "Notifications marked read");
    ok("All notifications marked read", UnreadCount { unread: 0 })
}

/// DELETE /api/v0/notifications/{notification_id}
async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<()> {
    if !notifications::delete(&state.db.pool, notification_id, auth.user_id).await? {
        return Err(SoukError::not_found("Notification"));
    }
    ok("Notification deleted", ())
}
