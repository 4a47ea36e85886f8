//! Saved delivery addresses. A user's first address becomes the default.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use souk_common::error::{SoukError, SoukResult};
use souk_common::ids::generate_id;
use souk_common::models::address::{CreateAddressRequest, UpdateAddressRequest, UserAddress};
use souk_common::validation::validate_request;
use souk_db::repository::addresses;

use super::{created, ok, ApiResult, Created};
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/{address_id}", patch(update_address).delete(delete_address))
        .route("/addresses/{address_id}/default", post(make_default))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// Fetch an address that belongs to the caller. Other users' addresses are
/// reported as missing.
async fn owned(state: &AppState, auth: &AuthContext, address_id: Uuid) -> SoukResult<UserAddress> {
    addresses::find_by_id(&state.db.pool, address_id)
        .await?
        .filter(|a| a.user_id == auth.user_id)
        .ok_or_else(|| SoukError::not_found("Address"))
}

/// GET /api/v0/addresses
async fn list_addresses(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Vec<UserAddress>> {
    let list = addresses::list_for_user(&state.db.pool, auth.user_id).await?;
    ok("Addresses", list)
}

/// POST /api/v0/addresses
async fn create_address(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateAddressRequest>,
) -> Created<UserAddress> {
    validate_request(&body)?;

    let mut tx = state.db.pool.begin().await?;
    let first = addresses::count_for_user(&mut *tx, auth.user_id).await? == 0;
    let is_default = first || body.is_default.unwrap_or(false);
    if is_default {
        addresses::clear_default(&mut *tx, auth.user_id).await?;
    }
    let address =
        addresses::create_address(&mut *tx, generate_id(), auth.user_id, &body, is_default).await?;
    tx.commit().await?;

    created("Address saved", address)
}

/// PATCH /api/v0/addresses/{address_id}
async fn update_address(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(address_id): Path<Uuid>,
    Json(body): Json<UpdateAddressRequest>,
) -> ApiResult<UserAddress> {
    validate_request(&body)?;
    owned(&state, &auth, address_id).await?;

    let address = addresses::update_address(&state.db.pool, address_id, &body).await?;
    ok("Address updated", address)
}

/// DELETE /api/v0/addresses/{address_id}
async fn delete_address(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(address_id): Path<Uuid>,
) -> ApiResult<()> {
    owned(&state, &auth, address_id).await?;
    if addresses::in_use(&state.db.pool, address_id).await? {
        return Err(SoukError::Conflict {
            message: "Address is used by a shopping list or order".into(),
        });
    }

    addresses::delete_address(&state.db.pool, address_id).await?;
    ok("Address deleted", ())
}

/// POST /api/v0/addresses/{address_id}/default
async fn make_default(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(address_id): Path<Uuid>,
) -> ApiResult<UserAddress> {
    owned(&state, &auth, address_id).await?;

    let mut tx = state.db.pool.begin().await?;
    addresses::clear_default(&mut *tx, auth.user_id).await?;
    let address = addresses::mark_default(&mut *tx, address_id).await?;
    tx.commit().await?;

    ok("Default address updated", address)
}
