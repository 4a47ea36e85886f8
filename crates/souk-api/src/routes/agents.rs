//! Agent self-service and public agent profiles.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, patch},
    Extension, Json, Router,
};
use uuid::Uuid;

use souk_common::error::{SoukError, SoukResult};
use souk_common::models::agent::{
    AgentProfile, AgentPublicProfile, AgentStats, KycStatus, UpdateAvailabilityRequest,
};
use souk_common::models::review::{average_rating, Review};
use souk_common::models::user::UserRole;
use souk_common::response::{PageParams, Paginated};
use souk_db::repository::{agents, orders, reviews, users};

use super::markets::find_market;
use super::{max_page, ok, ApiResult};
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agents/me", get(my_profile))
        .route("/agents/me/availability", patch(update_availability))
        .route("/agents/me/stats", get(my_stats))
        .route("/agents/{agent_id}", get(public_profile))
        .route("/agents/{agent_id}/reviews", get(agent_reviews))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

pub(crate) async fn find_profile(state: &AppState, agent_id: Uuid) -> SoukResult<AgentProfile> {
    agents::find_profile(&state.db.pool, agent_id)
        .await?
        .ok_or_else(|| SoukError::not_found("Agent"))
}

/// GET /api/v0/agents/me
async fn my_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<AgentProfile> {
    auth.require_role(&[UserRole::Agent])?;
    ok("Agent profile", find_profile(&state, auth.user_id).await?)
}

/// PATCH /api/v0/agents/me/availability
async fn update_availability(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<UpdateAvailabilityRequest>,
) -> ApiResult<AgentProfile> {
    auth.require_role(&[UserRole::Agent])?;
    let profile = find_profile(&state, auth.user_id).await?;
    if body.is_available && profile.kyc_status != KycStatus::Approved {
        return Err(SoukError::bad_request(
            "KYC must be approved before taking work",
        ));
    }
    if let Some(market_id) = body.market_id {
        find_market(&state, market_id).await?;
    }

    let profile = agents::set_availability(&state.db.pool, auth.user_id, body.is_available, body.market_id)
        .await?
        .ok_or_else(|| SoukError::not_found("Agent"))?;
    tracing::info!(
        agent_id = %auth.user_id,
        available = profile.is_available,
        market_id = ?profile.market_id,
        "Agent availability changed"
    );
    ok("Availability updated", profile)
}

/// GET /api/v0/agents/me/stats
async fn my_stats(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<AgentStats> {
    auth.require_role(&[UserRole::Agent])?;
    let profile = find_profile(&state, auth.user_id).await?;
    let ratings = reviews::ratings_for_agent(&state.db.pool, auth.user_id).await?;

    ok(
        "Agent stats",
        AgentStats {
            active_orders: orders::count_active_for_agent(&state.db.pool, auth.user_id).await?,
            completed_orders: profile.completed_orders,
            total_earnings: agents::earnings(&state.db.pool, auth.user_id).await?,
            average_rating: average_rating(&ratings),
            review_count: ratings.len() as i64,
        },
    )
}

/// GET /api/v0/agents/{agent_id}
async fn public_profile(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<Uuid>,
) -> ApiResult<AgentPublicProfile> {
    let user = users::find_by_id(&state.db.pool, agent_id)
        .await?
        .filter(|u| u.role == UserRole::Agent)
        .ok_or_else(|| SoukError::not_found("Agent"))?;
    let profile = find_profile(&state, agent_id).await?;
    let ratings = reviews::ratings_for_agent(&state.db.pool, agent_id).await?;

    ok(
        "Agent",
        AgentPublicProfile {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            kyc_status: profile.kyc_status,
            is_available: profile.is_available,
            market_id: profile.market_id,
            completed_orders: profile.completed_orders,
            average_rating: average_rating(&ratings),
            review_count: ratings.len() as i64,
        },
    )
}

/// GET /api/v0/agents/{agent_id}/reviews
async fn agent_reviews(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<Uuid>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Review>> {
    find_profile(&state, agent_id).await?;
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items = reviews::list_for_agent(&state.db.pool, agent_id, limit, offset).await?;
    let total = reviews::ratings_for_agent(&state.db.pool, agent_id).await?.len() as i64;
    ok("Reviews", Paginated::new(items, total, page, max))
}
