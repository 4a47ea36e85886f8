//! KYC submissions and their review.

use sqlx::{Any, AnyPool, Executor};
use uuid::Uuid;

use souk_common::models::agent::{IdType, KycReviewStatus, KycSubmission};

use crate::any_compat::{id, now};

pub async fn create_submission<'e, E>(
    db: E,
    submission_id: Uuid,
    agent_id: Uuid,
    id_type: IdType,
    id_number: &str,
    document_url: &str,
    selfie_url: Option<&str>,
) -> Result<KycSubmission, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, KycSubmission>(
        r#"
        INSERT INTO kyc_submissions (id, agent_id, id_type, id_number, document_url, selfie_url, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
        RETURNING *
        "#,
    )
    .bind(id(submission_id))
    .bind(id(agent_id))
    .bind(id_type.as_str())
    .bind(id_number)
    .bind(document_url)
    .bind(selfie_url)
    .bind(now())
    .fetch_one(db)
    .await
}

pub async fn find_by_id(pool: &AnyPool, submission_id: Uuid) -> Result<Option<KycSubmission>, sqlx::Error> {
    sqlx::query_as::<_, KycSubmission>("SELECT * FROM kyc_submissions WHERE id = $1")
        .bind(id(submission_id))
        .fetch_optional(pool)
        .await
}

/// The agent's most recent submission.
pub async fn latest_for_agent(pool: &AnyPool, agent_id: Uuid) -> Result<Option<KycSubmission>, sqlx::Error> {
    sqlx::query_as::<_, KycSubmission>(
        "SELECT * FROM kyc_submissions WHERE agent_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(id(agent_id))
    .fetch_optional(pool)
    .await
}

/// Review queue, oldest first so submissions are handled in order.
pub async fn list(
    pool: &AnyPool,
    status: Option<KycReviewStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<KycSubmission>, sqlx::Error> {
    sqlx::query_as::<_, KycSubmission>(
        r#"
        SELECT * FROM kyc_submissions
        WHERE ($1 IS NULL OR status = $1)
        ORDER BY id ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &AnyPool, status: Option<KycReviewStatus>) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM kyc_submissions WHERE ($1 IS NULL OR status = $1)")
            .bind(status.map(|s| s.as_str()))
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

/// Record an admin decision. Only pending submissions are updated; `None`
/// means the submission was already reviewed (or does not exist).
pub async fn review<'e, E>(
    db: E,
    submission_id: Uuid,
    status: KycReviewStatus,
    reviewer_id: Uuid,
    reason: Option<&str>,
) -> Result<Option<KycSubmission>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, KycSubmission>(
        r#"
        UPDATE kyc_submissions SET
            status = $2,
            reviewed_by = $3,
            rejection_reason = $4,
            reviewed_at = $5
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id(submission_id))
    .bind(status.as_str())
    .bind(id(reviewer_id))
    .bind(reason)
    .bind(now())
    .fetch_optional(db)
    .await
}
