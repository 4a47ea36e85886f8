//! Customer reviews of the agent who fulfilled an order.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    middleware,
    routing::post,
    Extension, Json, Router,
};
use uuid::Uuid;

use souk_common::error::SoukError;
use souk_common::ids::generate_id;
use souk_common::models::order::OrderStatus;
use souk_common::models::review::{CreateReviewRequest, Review};
use souk_common::models::workflow::Party;
use souk_common::validation::validate_request;
use souk_db::repository::reviews;

use super::{created, Created};
use crate::workflow::orders::load_visible;
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders/{order_id}/review", post(create_review))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// POST /api/v0/orders/{order_id}/review
///
/// One review per order, written by its customer once it is completed.
async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<CreateReviewRequest>,
) -> Created<Review> {
    validate_request(&body)?;
    let (order, party) = load_visible(&state, &auth, order_id).await?;
    if party != Party::Customer {
        return Err(SoukError::Forbidden);
    }
    if order.status != OrderStatus::Completed {
        return Err(SoukError::Conflict {
            message: "Only completed orders can be reviewed".into(),
        });
    }
    if reviews::find_by_order(&state.db.pool, order.id).await?.is_some() {
        return Err(SoukError::AlreadyExists {
            resource: "Review".into(),
        });
    }

    let review = reviews::create_review(
        &state.db.pool,
        generate_id(),
        order.id,
        auth.user_id,
        order.agent_id,
        body.rating,
        body.comment.as_deref().map(str::trim),
    )
    .await?;
    tracing::info!(order_id = %order.id, agent_id = %order.agent_id, rating = review.rating, "Review left");
    created("Review submitted", review)
}
