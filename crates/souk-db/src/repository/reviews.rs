use sqlx::AnyPool;
use uuid::Uuid;

use souk_common::models::review::Review;

use crate::any_compat::{id, now};

pub async fn create_review(
    pool: &AnyPool,
    review_id: Uuid,
    order_id: Uuid,
    reviewer_id: Uuid,
    agent_id: Uuid,
    rating: i64,
    comment: Option<&str>,
) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (id, order_id, reviewer_id, agent_id, rating, comment, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(id(review_id))
    .bind(id(order_id))
    .bind(id(reviewer_id))
    .bind(id(agent_id))
    .bind(rating)
    .bind(comment)
    .bind(now())
    .fetch_one(pool)
    .await
}

pub async fn find_by_order(pool: &AnyPool, order_id: Uuid) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE order_id = $1")
        .bind(id(order_id))
        .fetch_optional(pool)
        .await
}

pub async fn list_for_agent(
    pool: &AnyPool,
    agent_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE agent_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
    )
    .bind(id(agent_id))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Every rating the agent received; averaged by the caller.
pub async fn ratings_for_agent(pool: &AnyPool, agent_id: Uuid) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT rating FROM reviews WHERE agent_id = $1")
        .bind(id(agent_id))
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(r,)| r).collect())
}
