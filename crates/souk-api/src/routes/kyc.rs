//! Agent identity verification: submission by agents, review by admins.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use souk_common::error::SoukError;
use souk_common::ids::generate_id;
use souk_common::models::agent::{
    KycReviewStatus, KycStatus, KycSubmission, RejectKycRequest, SubmitKycRequest,
};
use souk_common::models::notification::NotificationKind;
use souk_common::models::user::UserRole;
use souk_common::response::{PageParams, Paginated};
use souk_common::validation::validate_request;
use souk_db::repository::{agents, kyc};
use souk_notify::NewNotification;

use super::agents::find_profile;
use super::{created, max_page, ok, ApiResult, Created};
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/kyc", post(submit))
        .route("/kyc/me", get(my_submission))
        .route("/admin/kyc", get(review_queue))
        .route("/admin/kyc/{submission_id}/approve", post(approve))
        .route("/admin/kyc/{submission_id}/reject", post(reject))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

#[derive(Debug, Default, Deserialize)]
pub struct KycQuery {
    pub status: Option<KycReviewStatus>,
}

/// POST /api/v0/kyc
async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<SubmitKycRequest>,
) -> Created<KycSubmission> {
    auth.require_role(&[UserRole::Agent])?;
    validate_request(&body)?;

    let profile = find_profile(&state, auth.user_id).await?;
    match profile.kyc_status {
        KycStatus::Approved => {
            return Err(SoukError::Conflict {
                message: "KYC is already approved".into(),
            });
        }
        KycStatus::Pending => {
            return Err(SoukError::Conflict {
                message: "A submission is already awaiting review".into(),
            });
        }
        KycStatus::NotSubmitted | KycStatus::Rejected => {}
    }

    let mut tx = state.db.pool.begin().await?;
    let submission = kyc::create_submission(
        &mut *tx,
        generate_id(),
        auth.user_id,
        body.id_type,
        body.id_number.trim(),
        &body.document_url,
        body.selfie_url.as_deref(),
    )
    .await?;
    agents::set_kyc_status(&mut *tx, auth.user_id, KycStatus::Pending).await?;
    tx.commit().await?;

    tracing::info!(agent_id = %auth.user_id, submission_id = %submission.id, "KYC submitted");
    created("KYC submitted", submission)
}

/// GET /api/v0/kyc/me
async fn my_submission(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<KycSubmission> {
    auth.require_role(&[UserRole::Agent])?;
    let submission = kyc::latest_for_agent(&state.db.pool, auth.user_id)
        .await?
        .ok_or_else(|| SoukError::not_found("KYC submission"))?;
    ok("KYC submission", submission)
}

/// GET /api/v0/admin/kyc
async fn review_queue(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<KycQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<KycSubmission>> {
    auth.require_admin()?;
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items = kyc::list(&state.db.pool, filter.status, limit, offset).await?;
    let total = kyc::count(&state.db.pool, filter.status).await?;
    ok("KYC submissions", Paginated::new(items, total, page, max))
}

async fn decide(
    state: &AppState,
    auth: &AuthContext,
    submission_id: Uuid,
    decision: KycReviewStatus,
    reason: Option<&str>,
) -> Result<KycSubmission, SoukError> {
    auth.require_admin()?;
    let existing = kyc::find_by_id(&state.db.pool, submission_id)
        .await?
        .ok_or_else(|| SoukError::not_found("KYC submission"))?;

    let profile_status = match decision {
        KycReviewStatus::Approved => KycStatus::Approved,
        _ => KycStatus::Rejected,
    };
    let mut tx = state.db.pool.begin().await?;
    let Some(submission) = kyc::review(&mut *tx, submission_id, decision, auth.user_id, reason).await? else {
        return Err(SoukError::Conflict {
            message: format!("Submission was already {}", existing.status),
        });
    };
    agents::set_kyc_status(&mut *tx, submission.agent_id, profile_status).await?;
    tx.commit().await?;

    tracing::info!(
        submission_id = %submission.id,
        agent_id = %submission.agent_id,
        decision = %decision,
        by = %auth.user_id,
        "KYC reviewed"
    );

    let (title, body) = match decision {
        KycReviewStatus::Approved => (
            "Verification approved",
            "You can now mark yourself available and receive shopping lists.".to_string(),
        ),
        _ => (
            "Verification rejected",
            format!(
                "Your verification was rejected: {}. You can submit again.",
                reason.unwrap_or("no reason given")
            ),
        ),
    };
    state
        .notifier
        .notify_quietly(NewNotification::new(
            submission.agent_id,
            NotificationKind::KycUpdate,
            title,
            body,
        ))
        .await;
    Ok(submission)
}

/// POST /api/v0/admin/kyc/{submission_id}/approve
async fn approve(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(submission_id): Path<Uuid>,
) -> ApiResult<KycSubmission> {
    let submission = decide(&state, &auth, submission_id, KycReviewStatus::Approved, None).await?;
    ok("KYC approved", submission)
}

/// POST /api/v0/admin/kyc/{submission_id}/reject
async fn reject(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(submission_id): Path<Uuid>,
    Json(body): Json<RejectKycRequest>,
) -> ApiResult<KycSubmission> {
    validate_request(&body)?;
    let reason = body.reason.trim();
    let submission =
        decide(&state, &auth, submission_id, KycReviewStatus::Rejected, Some(reason)).await?;
    ok("KYC rejected", submission)
}
