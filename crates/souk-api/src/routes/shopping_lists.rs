//! Shopping lists: drafting, items, and the status actions.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use souk_common::config;
use souk_common::error::{SoukError, SoukResult};
use souk_common::ids::generate_id;
use souk_common::models::order::{ReasonRequest, StatusChange, StatusEntity};
use souk_common::models::shopping_list::{
    CreateShoppingListRequest, SetActualPriceRequest, ShoppingList, ShoppingListDetail,
    ShoppingListItem, ShoppingListItemRequest, ShoppingListQuery, ShoppingListStatus,
    UpdateShoppingListItemRequest, UpdateShoppingListRequest,
};
use souk_common::models::workflow::Party;
use souk_common::response::{PageParams, Paginated};
use souk_common::validation::{validate_name, validate_request};
use souk_db::repository::{addresses, products, shopping_lists, status_changes};

use super::markets::find_market;
use super::{created, max_page, ok, optional_body, ApiResult, Created};
use crate::workflow::lists as workflow;
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shopping-lists", get(my_lists).post(create_list))
        .route(
            "/shopping-lists/{list_id}",
            get(get_list).patch(update_list).delete(delete_list),
        )
        .route("/shopping-lists/{list_id}/history", get(list_history))
        .route("/shopping-lists/{list_id}/items", post(add_item))
        .route(
            "/shopping-lists/{list_id}/items/{item_id}",
            patch(update_item).delete(remove_item),
        )
        .route("/shopping-lists/{list_id}/items/{item_id}/price", patch(set_price))
        .route("/shopping-lists/{list_id}/submit", post(submit))
        .route("/shopping-lists/{list_id}/accept", post(accept))
        .route("/shopping-lists/{list_id}/decline", post(decline))
        .route("/shopping-lists/{list_id}/start", post(start))
        .route("/shopping-lists/{list_id}/complete", post(complete))
        .route("/shopping-lists/{list_id}/cancel", post(cancel))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// The caller's own list, still a draft.
async fn editable(state: &AppState, auth: &AuthContext, list_id: Uuid) -> SoukResult<ShoppingList> {
    let (list, party) = workflow::load_visible(state, auth, list_id).await?;
    if party != Party::Customer {
        return Err(SoukError::Forbidden);
    }
    if !list.status.is_editable() {
        return Err(SoukError::Conflict {
            message: format!("Shopping list is {} and can no longer be edited", list.status),
        });
    }
    Ok(list)
}

async fn ensure_own_address(state: &AppState, auth: &AuthContext, address_id: Option<Uuid>) -> SoukResult<()> {
    if let Some(address_id) = address_id {
        let owned = addresses::find_by_id(&state.db.pool, address_id)
            .await?
            .is_some_and(|a| a.user_id == auth.user_id);
        if !owned {
            return Err(SoukError::not_found("Address"));
        }
    }
    Ok(())
}

/// Item fields after filling gaps from the linked catalog product.
struct ResolvedItem {
    product_id: Option<Uuid>,
    estimated_price: i64,
    unit: Option<String>,
}

async fn resolve_item(
    state: &AppState,
    market_id: Uuid,
    item: &ShoppingListItemRequest,
) -> SoukResult<ResolvedItem> {
    validate_name(&item.name)?;
    let Some(product_id) = item.product_id else {
        return Ok(ResolvedItem {
            product_id: None,
            estimated_price: item.estimated_price.unwrap_or(0),
            unit: item.unit.clone(),
        });
    };

    let product = products::find_by_id(&state.db.pool, product_id)
        .await?
        .ok_or_else(|| SoukError::not_found("Product"))?;
    if product.market_id != market_id {
        return Err(SoukError::bad_request(
            "Product is not sold in this shopping list's market",
        ));
    }
    Ok(ResolvedItem {
        product_id: Some(product.id),
        estimated_price: item.estimated_price.unwrap_or(product.price),
        unit: item.unit.clone().or(product.unit),
    })
}

fn item_limit_reached() -> SoukError {
    SoukError::LimitReached {
        message: format!(
            "a shopping list holds at most {} items",
            config::get().limits.max_list_items
        ),
    }
}

/// GET /api/v0/shopping-lists
async fn my_lists(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<ShoppingListQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<ShoppingList>> {
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items =
        shopping_lists::list_for_user(&state.db.pool, auth.user_id, filter.status, limit, offset)
            .await?;
    let total = shopping_lists::count_for_user(&state.db.pool, auth.user_id, filter.status).await?;
    ok("Shopping lists", Paginated::new(items, total, page, max))
}

/// POST /api/v0/shopping-lists
async fn create_list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateShoppingListRequest>,
) -> Created<ShoppingListDetail> {
    auth.require_role(workflow::AUTHORS)?;
    validate_request(&body)?;
    validate_name(&body.title)?;

    if body.items.len() > config::get().limits.max_list_items as usize {
        return Err(item_limit_reached());
    }
    let market = find_market(&state, body.market_id).await?;
    if !market.is_active {
        return Err(SoukError::bad_request("Market is not currently active"));
    }
    ensure_own_address(&state, &auth, body.delivery_address_id).await?;

    let mut resolved = Vec::with_capacity(body.items.len());
    for item in &body.items {
        resolved.push(resolve_item(&state, market.id, item).await?);
    }

    let mut tx = state.db.pool.begin().await?;
    let list = shopping_lists::create_list(
        &mut *tx,
        generate_id(),
        auth.user_id,
        market.id,
        body.title.trim(),
        body.notes.as_deref(),
        body.delivery_address_id,
    )
    .await?;
    let mut items = Vec::with_capacity(body.items.len());
    for (item, r) in body.items.iter().zip(&resolved) {
        let new = shopping_lists::NewItem {
            id: generate_id(),
            product_id: r.product_id,
            name: item.name.trim(),
            quantity: item.quantity,
            unit: r.unit.as_deref(),
            estimated_price: r.estimated_price,
            notes: item.notes.as_deref(),
        };
        items.push(shopping_lists::add_item(&mut *tx, list.id, &new).await?);
    }
    tx.commit().await?;

    tracing::info!(list_id = %list.id, items = items.len(), "Shopping list created");
    created("Shopping list created", ShoppingListDetail::new(list, items))
}

/// GET /api/v0/shopping-lists/{list_id}
async fn get_list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<ShoppingListDetail> {
    let (list, _) = workflow::load_visible(&state, &auth, list_id).await?;
    let items = shopping_lists::list_items(&state.db.pool, list.id).await?;
    ok("Shopping list", ShoppingListDetail::new(list, items))
}

/// GET /api/v0/shopping-lists/{list_id}/history
async fn list_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<Vec<StatusChange>> {
    let (list, _) = workflow::load_visible(&state, &auth, list_id).await?;
    let history =
        status_changes::history(&state.db.pool, StatusEntity::ShoppingList, list.id).await?;
    ok("Shopping list history", history)
}

/// PATCH /api/v0/shopping-lists/{list_id}
async fn update_list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
    Json(body): Json<UpdateShoppingListRequest>,
) -> ApiResult<ShoppingList> {
    validate_request(&body)?;
    if let Some(title) = &body.title {
        validate_name(title)?;
    }
    editable(&state, &auth, list_id).await?;
    ensure_own_address(&state, &auth, body.delivery_address_id).await?;

    let list = shopping_lists::update_details(
        &state.db.pool,
        list_id,
        body.title.as_deref().map(str::trim),
        body.notes.as_deref(),
        body.delivery_address_id,
    )
    .await?;
    ok("Shopping list updated", list)
}

/// DELETE /api/v0/shopping-lists/{list_id}
async fn delete_list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<()> {
    editable(&state, &auth, list_id).await?;

    let mut tx = state.db.pool.begin().await?;
    shopping_lists::delete_items(&mut *tx, list_id).await?;
    shopping_lists::delete_list(&mut *tx, list_id).await?;
    tx.commit().await?;
    ok("Shopping list deleted", ())
}

/// POST /api/v0/shopping-lists/{list_id}/items
async fn add_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
    Json(body): Json<ShoppingListItemRequest>,
) -> Created<ShoppingListItem> {
    validate_request(&body)?;
    let list = editable(&state, &auth, list_id).await?;

    let count = shopping_lists::count_items(&state.db.pool, list.id).await?;
    if count >= i64::from(config::get().limits.max_list_items) {
        return Err(item_limit_reached());
    }
    let r = resolve_item(&state, list.market_id, &body).await?;
    let item = shopping_lists::add_item(
        &state.db.pool,
        list.id,
        &shopping_lists::NewItem {
            id: generate_id(),
            product_id: r.product_id,
            name: body.name.trim(),
            quantity: body.quantity,
            unit: r.unit.as_deref(),
            estimated_price: r.estimated_price,
            notes: body.notes.as_deref(),
        },
    )
    .await?;
    created("Item added", item)
}

/// PATCH /api/v0/shopping-lists/{list_id}/items/{item_id}
async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path((list_id, item_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateShoppingListItemRequest>,
) -> ApiResult<ShoppingListItem> {
    validate_request(&body)?;
    if let Some(name) = &body.name {
        validate_name(name)?;
    }
    editable(&state, &auth, list_id).await?;
    shopping_lists::find_item(&state.db.pool, list_id, item_id)
        .await?
        .ok_or_else(|| SoukError::not_found("Item"))?;

    let item = shopping_lists::update_item(&state.db.pool, item_id, &body).await?;
    ok("Item updated", item)
}

/// DELETE /api/v0/shopping-lists/{list_id}/items/{item_id}
async fn remove_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path((list_id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    editable(&state, &auth, list_id).await?;
    shopping_lists::find_item(&state.db.pool, list_id, item_id)
        .await?
        .ok_or_else(|| SoukError::not_found("Item"))?;

    shopping_lists::delete_item(&state.db.pool, item_id).await?;
    ok("Item removed", ())
}

/// PATCH /api/v0/shopping-lists/{list_id}/items/{item_id}/price
///
/// The assigned agent records what an item really cost.
async fn set_price(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path((list_id, item_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<SetActualPriceRequest>,
) -> ApiResult<ShoppingListItem> {
    validate_request(&body)?;
    let (list, party) = workflow::load_visible(&state, &auth, list_id).await?;
    if party != Party::Agent {
        return Err(SoukError::Forbidden);
    }
    if !matches!(
        list.status,
        ShoppingListStatus::Accepted | ShoppingListStatus::InProgress
    ) {
        return Err(SoukError::Conflict {
            message: format!("Prices cannot be recorded while the list is {}", list.status),
        });
    }
    shopping_lists::find_item(&state.db.pool, list_id, item_id)
        .await?
        .ok_or_else(|| SoukError::not_found("Item"))?;

    let item = shopping_lists::set_actual_price(&state.db.pool, item_id, body.actual_price).await?;
    ok("Price recorded", item)
}

/// POST /api/v0/shopping-lists/{list_id}/submit
///
/// Submits the draft and assigns an available agent in the list's market.
async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<ShoppingList> {
    ok("Shopping list submitted", workflow::submit(&state, &auth, list_id).await?)
}

/// POST /api/v0/shopping-lists/{list_id}/accept
async fn accept(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<ShoppingList> {
    let list = workflow::advance(&state, &auth, list_id, ShoppingListStatus::Accepted).await?;
    ok("Shopping list accepted", list)
}

/// POST /api/v0/shopping-lists/{list_id}/decline
async fn decline(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<ShoppingList> {
    ok("Shopping list declined", workflow::decline(&state, &auth, list_id).await?)
}

/// POST /api/v0/shopping-lists/{list_id}/start
///
/// Refused until the list's order is paid and accepted.
async fn start(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<ShoppingList> {
    let list = workflow::advance(&state, &auth, list_id, ShoppingListStatus::InProgress).await?;
    ok("Shopping started", list)
}

/// POST /api/v0/shopping-lists/{list_id}/complete
async fn complete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<ShoppingList> {
    let list = workflow::advance(&state, &auth, list_id, ShoppingListStatus::Completed).await?;
    ok("Shopping list completed", list)
}

/// POST /api/v0/shopping-lists/{list_id}/cancel
///
/// Takes an unpaid open order down with the list.
async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(list_id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<ShoppingList> {
    let body: ReasonRequest = optional_body(&body)?;
    validate_request(&body)?;
    let list = workflow::cancel(&state, &auth, list_id, body.reason.as_deref()).await?;
    ok("Shopping list cancelled", list)
}
