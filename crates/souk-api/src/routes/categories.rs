//! Product categories. Anyone signed in can read them; admins manage them.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, patch},
    Extension, Json, Router,
};
use uuid::Uuid;

use souk_common::error::SoukError;
use souk_common::ids::generate_id;
use souk_common::models::catalog::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use souk_common::validation::{validate_name, validate_request};
use souk_db::repository::categories;

use super::{created, ok, ApiResult, Created};
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{category_id}",
            patch(update_category).delete(delete_category),
        )
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// GET /api/v0/categories
///
/// Admins also see deactivated categories.
async fn list_categories(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Vec<Category>> {
    let list = categories::list(&state.db.pool, auth.is_admin()).await?;
    ok("Categories", list)
}

/// POST /api/v0/categories
async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateCategoryRequest>,
) -> Created<Category> {
    auth.require_admin()?;
    validate_request(&body)?;
    validate_name(&body.name)?;

    if categories::find_by_name(&state.db.pool, body.name.trim()).await?.is_some() {
        return Err(SoukError::AlreadyExists {
            resource: "Category".into(),
        });
    }

    let category = categories::create_category(
        &state.db.pool,
        generate_id(),
        body.name.trim(),
        body.description.as_deref(),
    )
    .await?;
    created("Category created", category)
}

/// PATCH /api/v0/categories/{category_id}
async fn update_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(category_id): Path<Uuid>,
    Json(body): Json<UpdateCategoryRequest>,
) -> ApiResult<Category> {
    auth.require_admin()?;
    validate_request(&body)?;

    if let Some(name) = body.name.as_deref().map(str::trim) {
        validate_name(name)?;
        let taken = categories::find_by_name(&state.db.pool, name)
            .await?
            .is_some_and(|c| c.id != category_id);
        if taken {
            return Err(SoukError::AlreadyExists {
                resource: "Category".into(),
            });
        }
    }

    let category = categories::update_category(
        &state.db.pool,
        category_id,
        body.name.as_deref().map(str::trim),
        body.description.as_deref(),
        body.is_active,
    )
    .await?
    .ok_or_else(|| SoukError::not_found("Category"))?;
    ok("Category updated", category)
}

/// DELETE /api/v0/categories/{category_id}
///
/// Products keep their category, so deleting only hides it.
async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<()> {
    auth.require_admin()?;
    if !categories::deactivate(&state.db.pool, category_id).await? {
        return Err(SoukError::not_found("Category"));
    }
    ok("Category deactivated", ())
}
