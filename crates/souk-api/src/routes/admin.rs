//! Platform administration: dashboard numbers, user moderation, manual assignment.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souk_common::error::SoukError;
use souk_common::models::agent::KycReviewStatus;
use souk_common::models::order::{Order, OrderQuery, OrderStatus};
use souk_common::models::shopping_list::{ShoppingList, ShoppingListStatus};
use souk_common::models::user::{UserResponse, UserRole, UserStatus};
use souk_common::response::{PageParams, Paginated};
use souk_db::repository::orders::{self, OrderScope};
use souk_db::repository::{kyc, shopping_lists, support, users};

use super::{max_page, ok, ApiResult};
use crate::{middleware::AuthContext, workflow, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{user_id}/suspend", post(suspend_user))
        .route("/admin/users/{user_id}/activate", post(activate_user))
        .route("/admin/shopping-lists/{list_id}/assign", post(assign_list))
        .route("/admin/orders", get(list_orders))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

#[derive(Debug, Serialize)]
pub struct PlatformStats {
    pub users: BTreeMap<&'static str, i64>,
    pub orders: BTreeMap<&'static str, i64>,
    pub shopping_lists: BTreeMap<&'static str, i64>,
    /// Sum of totals of paid orders, in kobo
    pub paid_volume: i64,
    pub pending_kyc: i64,
    pub open_tickets: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct AssignAgentRequest {
    pub agent_id: Uuid,
}

/// GET /api/v0/admin/stats
async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<PlatformStats> {
    auth.require_admin()?;
    let pool = &state.db.pool;

    let mut by_role = BTreeMap::new();
    for role in UserRole::ALL {
        by_role.insert(role.as_str(), users::count_users(pool, Some(*role)).await?);
    }
    let mut by_order_status = BTreeMap::new();
    for status in OrderStatus::ALL {
        by_order_status.insert(status.as_str(), orders::count_by_status(pool, *status).await?);
    }
    let mut by_list_status = BTreeMap::new();
    for status in ShoppingListStatus::ALL {
        by_list_status.insert(status.as_str(), shopping_lists::count_by_status(pool, *status).await?);
    }

    ok(
        "Platform stats",
        PlatformStats {
            users: by_role,
            orders: by_order_status,
            shopping_lists: by_list_status,
            paid_volume: orders::paid_volume(pool).await?,
            pending_kyc: kyc::count(pool, Some(KycReviewStatus::Pending)).await?,
            open_tickets: support::count_open(pool).await?,
        },
    )
}

/// GET /api/v0/admin/users
async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<UserQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<UserResponse>> {
    auth.require_admin()?;
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items = users::list_users(&state.db.pool, filter.role, limit, offset)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    let total = users::count_users(&state.db.pool, filter.role).await?;
    ok("Users", Paginated::new(items, total, page, max))
}

async fn set_user_status(
    state: &AppState,
    auth: &AuthContext,
    user_id: Uuid,
    status: UserStatus,
) -> Result<UserResponse, SoukError> {
    auth.require_admin()?;
    if user_id == auth.user_id {
        return Err(SoukError::bad_request("You cannot change your own account status"));
    }
    let user = users::set_status(&state.db.pool, user_id, status)
        .await?
        .ok_or_else(|| SoukError::not_found("User"))?;
    tracing::info!(user_id = %user.id, status = %status, by = %auth.user_id, "User status changed");
    Ok(user.into())
}

/// POST /api/v0/admin/users/{user_id}/suspend
async fn suspend_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<UserResponse> {
    let user = set_user_status(&state, &auth, user_id, UserStatus::Suspended).await?;
    ok("User suspended", user)
}

/// POST /api/v0/admin/users/{user_id}/activate
async fn activate_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<UserResponse> {
    let user = set_user_status(&state, &auth, user_id, UserStatus::Active).await?;
    ok("User activated", user)
}

/// POST /api/v0/admin/shopping-lists/{list_id}/assign
async fn assign_list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
    Json(body): Json<AssignAgentRequest>,
) -> ApiResult<ShoppingList> {
    let list = workflow::lists::assign(&state, &auth, list_id, body.agent_id).await?;
    ok("Shopping list assigned", list)
}

/// GET /api/v0/admin/orders
async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<OrderQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Order>> {
    auth.require_admin()?;
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items = orders::list_orders(&state.db.pool, OrderScope::All, filter.status, limit, offset).await?;
    let total = orders::count_orders(&state.db.pool, OrderScope::All, filter.status).await?;
    ok("Orders", Paginated::new(items, total, page, max))
}
