//! Markets: search, registration by agents and admins, owner management.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use souk_common::error::{SoukError, SoukResult};
use souk_common::ids::generate_id;
use souk_common::models::catalog::{Product, ProductQuery};
use souk_common::models::market::{CreateMarketRequest, Market, MarketQuery, UpdateMarketRequest};
use souk_common::models::user::UserRole;
use souk_common::response::{PageParams, Paginated};
use souk_common::validation::{validate_name, validate_request};
use souk_db::repository::{markets, products};

use super::{created, max_page, ok, ApiResult, Created};
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/markets", get(search_markets).post(create_market))
        .route(
            "/markets/{market_id}",
            get(get_market).patch(update_market).delete(delete_market),
        )
        .route("/markets/{market_id}/products", get(market_products))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

pub(crate) async fn find_market(state: &AppState, market_id: Uuid) -> SoukResult<Market> {
    markets::find_by_id(&state.db.pool, market_id)
        .await?
        .ok_or_else(|| SoukError::not_found("Market"))
}

/// The market's owner or an admin.
pub(crate) fn ensure_manager(market: &Market, auth: &AuthContext) -> SoukResult<()> {
    if market.owner_id == auth.user_id || auth.is_admin() {
        Ok(())
    } else {
        Err(SoukError::Forbidden)
    }
}

/// GET /api/v0/markets
async fn search_markets(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MarketQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Market>> {
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items = markets::search(&state.db.pool, &filter, limit, offset).await?;
    let total = markets::count(&state.db.pool, &filter).await?;
    ok("Markets", Paginated::new(items, total, page, max))
}

/// POST /api/v0/markets
async fn create_market(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateMarketRequest>,
) -> Created<Market> {
    auth.require_role(&[UserRole::Agent, UserRole::Admin])?;
    validate_request(&body)?;
    validate_name(&body.name)?;

    let market = markets::create_market(&state.db.pool, generate_id(), auth.user_id, &body).await?;
    tracing::info!(market_id = %market.id, owner_id = %auth.user_id, "Market created");
    created("Market created", market)
}

/// GET /api/v0/markets/{market_id}
async fn get_market(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
) -> ApiResult<Market> {
    ok("Market", find_market(&state, market_id).await?)
}

/// PATCH /api/v0/markets/{market_id}
async fn update_market(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(market_id): Path<Uuid>,
    Json(body): Json<UpdateMarketRequest>,
) -> ApiResult<Market> {
    validate_request(&body)?;
    if let Some(name) = &body.name {
        validate_name(name)?;
    }
    let market = find_market(&state, market_id).await?;
    ensure_manager(&market, &auth)?;

    let market = markets::update_market(&state.db.pool, market_id, &body).await?;
    ok("Market updated", market)
}

/// DELETE /api/v0/markets/{market_id}
async fn delete_market(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(market_id): Path<Uuid>,
) -> ApiResult<()> {
    let market = find_market(&state, market_id).await?;
    ensure_manager(&market, &auth)?;

    markets::soft_delete(&state.db.pool, market_id).await?;
    tracing::info!(market_id = %market_id, by = %auth.user_id, "Market deleted");
    ok("Market deleted", ())
}

/// GET /api/v0/markets/{market_id}/products
async fn market_products(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
    Query(mut filter): Query<ProductQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Product>> {
    find_market(&state, market_id).await?;
    filter.market_id = Some(market_id);

    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items = products::search(&state.db.pool, &filter, limit, offset).await?;
    let total = products::count(&state.db.pool, &filter).await?;
    ok("Products", Paginated::new(items, total, page, max))
}
