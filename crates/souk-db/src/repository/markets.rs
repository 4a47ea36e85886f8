//! Market repository.

use sqlx::AnyPool;
use uuid::Uuid;

use souk_common::models::market::{CreateMarketRequest, Market, MarketQuery, MarketType, UpdateMarketRequest};

use crate::any_compat::{id, like_pattern, now};

pub async fn create_market(
    pool: &AnyPool,
    market_id: Uuid,
    owner_id: Uuid,
    req: &CreateMarketRequest,
) -> Result<Market, sqlx::Error> {
    let at = now();
    sqlx::query_as::<_, Market>(
        r#"
        INSERT INTO markets (id, name, description, address, city, state, latitude, longitude,
                             market_type, operating_hours, owner_id, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1, $12, $12)
        RETURNING *
        "#,
    )
    .bind(id(market_id))
    .bind(req.name.trim())
    .bind(req.description.as_deref())
    .bind(req.address.as_str())
    .bind(req.city.as_str())
    .bind(req.state.as_str())
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(req.market_type.unwrap_or(MarketType::LocalMarket).as_str())
    .bind(req.operating_hours.as_deref())
    .bind(id(owner_id))
    .bind(at)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &AnyPool, market_id: Uuid) -> Result<Option<Market>, sqlx::Error> {
    sqlx::query_as::<_, Market>("SELECT * FROM markets WHERE id = $1 AND deleted_at IS NULL")
        .bind(id(market_id))
        .fetch_optional(pool)
        .await
}

pub async fn update_market(
    pool: &AnyPool,
    market_id: Uuid,
    req: &UpdateMarketRequest,
) -> Result<Market, sqlx::Error> {
    sqlx::query_as::<_, Market>(
        r#"
        UPDATE markets SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            address = COALESCE($4, address),
            city = COALESCE($5, city),
            state = COALESCE($6, state),
            market_type = COALESCE($7, market_type),
            operating_hours = COALESCE($8, operating_hours),
            is_active = COALESCE($9, is_active),
            updated_at = $10
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id(market_id))
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.description.as_deref())
    .bind(req.address.as_deref())
    .bind(req.city.as_deref())
    .bind(req.state.as_deref())
    .bind(req.market_type.map(|t| t.as_str()))
    .bind(req.operating_hours.as_deref())
    .bind(req.is_active.map(i64::from))
    .bind(now())
    .fetch_one(pool)
    .await
}

pub async fn soft_delete(pool: &AnyPool, market_id: Uuid) -> Result<(), sqlx::Error> {
    let at = now();
    sqlx::query("UPDATE markets SET deleted_at = $2, is_active = 0, updated_at = $2 WHERE id = $1")
        .bind(id(market_id))
        .bind(at)
        .execute(pool)
        .await?;
    Ok(())
}

const SEARCH_FILTER: &str = r#"
    deleted_at IS NULL AND is_active = 1
    AND ($1 IS NULL OR LOWER(name) LIKE $1 ESCAPE '\' OR LOWER(address) LIKE $1 ESCAPE '\')
    AND ($2 IS NULL OR LOWER(city) = $2)
    AND ($3 IS NULL OR market_type = $3)
"#;

/// Active markets matching the filters, by name.
pub async fn search(
    pool: &AnyPool,
    query: &MarketQuery,
    limit: i64,
    offset: i64,
) -> Result<Vec<Market>, sqlx::Error> {
    let sql = format!("SELECT * FROM markets WHERE {SEARCH_FILTER} ORDER BY name ASC, id ASC LIMIT $4 OFFSET $5");
    sqlx::query_as::<_, Market>(&sql)
        .bind(query.q.as_deref().map(like_pattern))
        .bind(query.city.as_deref().map(|c| c.trim().to_lowercase()))
        .bind(query.market_type.map(|t| t.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &AnyPool, query: &MarketQuery) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM markets WHERE {SEARCH_FILTER}");
    let row: (i64,) = sqlx::query_as(&sql)
        .bind(query.q.as_deref().map(like_pattern))
        .bind(query.city.as_deref().map(|c| c.trim().to_lowercase()))
        .bind(query.market_type.map(|t| t.as_str()))
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn count_active(pool: &AnyPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM markets WHERE deleted_at IS NULL AND is_active = 1")
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}
