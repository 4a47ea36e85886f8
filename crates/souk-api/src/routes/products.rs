//! Products sold in markets. Listed by the market's owner or an admin.

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
use souk_common::models::catalog::{CreateProductRequest, Product, ProductQuery, UpdateProductRequest};
use souk_common::response::{PageParams, Paginated};
use souk_common::validation::{validate_name, validate_request};
use souk_db::repository::{categories, products};

use super::markets::{ensure_manager, find_market};
use super::{created, max_page, ok, ApiResult, Created};
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(search_products).post(create_product))
        .route(
            "/products/{product_id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

async fn find_product(state: &AppState, product_id: Uuid) -> SoukResult<Product> {
    products::find_by_id(&state.db.pool, product_id)
        .await?
        .ok_or_else(|| SoukError::not_found("Product"))
}

/// The vendor who listed it, the market owner, or an admin.
async fn ensure_can_edit(state: &AppState, auth: &AuthContext, product: &Product) -> SoukResult<()> {
    if product.vendor_id == auth.user_id || auth.is_admin() {
        return Ok(());
    }
    let market = find_market(state, product.market_id).await?;
    ensure_manager(&market, auth)
}

async fn ensure_category(state: &AppState, category_id: Option<Uuid>) -> SoukResult<()> {
    if let Some(category_id) = category_id {
        let active = categories::find_by_id(&state.db.pool, category_id)
            .await?
            .is_some_and(|c| c.is_active);
        if !active {
            return Err(SoukError::not_found("Category"));
        }
    }
    Ok(())
}

/// GET /api/v0/products
async fn search_products(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProductQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Product>> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(SoukError::bad_request("min_price cannot exceed max_price"));
        }
    }
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items = products::search(&state.db.pool, &filter, limit, offset).await?;
    let total = products::count(&state.db.pool, &filter).await?;
    ok("Products", Paginated::new(items, total, page, max))
}

/// POST /api/v0/products
async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateProductRequest>,
) -> Created<Product> {
    validate_request(&body)?;
    validate_name(&body.name)?;

    let market = find_market(&state, body.market_id).await?;
    ensure_manager(&market, &auth)?;
    ensure_category(&state, body.category_id).await?;

    let product = products::create_product(&state.db.pool, generate_id(), auth.user_id, &body).await?;
    tracing::info!(product_id = %product.id, market_id = %market.id, "Product created");
    created("Product created", product)
}

/// GET /api/v0/products/{product_id}
async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Product> {
    ok("Product", find_product(&state, product_id).await?)
}

/// PATCH /api/v0/products/{product_id}
async fn update_product(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> ApiResult<Product> {
    validate_request(&body)?;
    if let Some(name) = &body.name {
        validate_name(name)?;
    }
    let product = find_product(&state, product_id).await?;
    ensure_can_edit(&state, &auth, &product).await?;
    ensure_category(&state, body.category_id).await?;

    let product = products::update_product(&state.db.pool, product_id, &body).await?;
    ok("Product updated", product)
}

/// DELETE /api/v0/products/{product_id}
async fn delete_product(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<()> {
    let product = find_product(&state, product_id).await?;
    ensure_can_edit(&state, &auth, &product).await?;

    products::soft_delete(&state.db.pool, product_id).await?;
    ok("Product deleted", ())
}
