//! Orders: checkout from an accepted shopping list, then the fulfilment actions.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use souk_common::error::SoukResult;
use souk_common::models::order::{
    CreateOrderRequest, Order, OrderQuery, OrderStatus, ReasonRequest, StatusChange, StatusEntity,
};
use souk_common::response::{PageParams, Paginated};
use souk_common::validation::validate_request;
use souk_db::repository::orders::{self, OrderScope};
use souk_db::repository::status_changes;

use super::{created, max_page, ok, optional_body, ApiResult, Created};
use crate::workflow::orders as workflow;
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{order_id}", get(get_order))
        .route("/orders/{order_id}/history", get(order_history))
        .route("/orders/{order_id}/accept", post(accept))
        .route("/orders/{order_id}/reject", post(reject))
        .route("/orders/{order_id}/start", post(start))
        .route("/orders/{order_id}/shopping", post(shopping))
        .route("/orders/{order_id}/complete", post(complete))
        .route("/orders/{order_id}/cancel", post(cancel))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// POST /api/v0/orders
///
/// Checkout: prices the accepted list and opens a pending, unpaid order.
async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateOrderRequest>,
) -> Created<Order> {
    validate_request(&body)?;
    created("Order placed", workflow::checkout(&state, &auth, &body).await?)
}

/// GET /api/v0/orders
///
/// Admins see every order; everyone else sees the ones they take part in.
async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<OrderQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Order>> {
    let scope = if auth.is_admin() {
        OrderScope::All
    } else {
        OrderScope::Participant(auth.user_id)
    };
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items = orders::list_orders(&state.db.pool, scope, filter.status, limit, offset).await?;
    let total = orders::count_orders(&state.db.pool, scope, filter.status).await?;
    ok("Orders", Paginated::new(items, total, page, max))
}

/// GET /api/v0/orders/{order_id}
async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Order> {
    let (order, _) = workflow::load_visible(&state, &auth, order_id).await?;
    ok("Order", order)
}

/// GET /api/v0/orders/{order_id}/history
async fn order_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Vec<StatusChange>> {
    let (order, _) = workflow::load_visible(&state, &auth, order_id).await?;
    let history = status_changes::history(&state.db.pool, StatusEntity::Order, order.id).await?;
    ok("Order history", history)
}

async fn move_to(
    state: &AppState,
    auth: &AuthContext,
    order_id: Uuid,
    target: OrderStatus,
    body: &Bytes,
) -> SoukResult<Order> {
    let body: ReasonRequest = optional_body(body)?;
    validate_request(&body)?;
    workflow::transition(state, auth, order_id, target, body.reason.as_deref()).await
}

/// POST /api/v0/orders/{order_id}/accept
async fn accept(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Order> {
    let order = workflow::transition(&state, &auth, order_id, OrderStatus::Accepted, None).await?;
    ok("Order accepted", order)
}

/// POST /api/v0/orders/{order_id}/reject
async fn reject(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Order> {
    let order = move_to(&state, &auth, order_id, OrderStatus::Rejected, &body).await?;
    ok("Order rejected", order)
}

/// POST /api/v0/orders/{order_id}/start
async fn start(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Order> {
    let order = workflow::transition(&state, &auth, order_id, OrderStatus::InProgress, None).await?;
    ok("Order in progress", order)
}

/// POST /api/v0/orders/{order_id}/shopping
async fn shopping(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Order> {
    let order = workflow::transition(&state, &auth, order_id, OrderStatus::Shopping, None).await?;
    ok("Shopping started", order)
}

/// POST /api/v0/orders/{order_id}/complete
async fn complete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Order> {
    let order = workflow::transition(&state, &auth, order_id, OrderStatus::Completed, None).await?;
    ok("Order completed", order)
}

/// POST /api/v0/orders/{order_id}/cancel
async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Order> {
    let order = move_to(&state, &auth, order_id, OrderStatus::Cancelled, &body).await?;
    ok("Order cancelled", order)
}
