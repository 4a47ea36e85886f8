use sqlx::AnyPool;
use uuid::Uuid;

use souk_common::models::catalog::Category;

use crate::any_compat::{id, now};

pub async fn create_category(
    pool: &AnyPool,
    category_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (id, name, description, is_active, created_at)
        VALUES ($1, $2, $3, 1, $4)
        RETURNING *
        "#,
    )
    .bind(id(category_id))
    .bind(name)
    .bind(description)
    .bind(now())
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &AnyPool, category_id: Uuid) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id(category_id))
        .fetch_optional(pool)
        .await
}

pub async fn find_by_name(pool: &AnyPool, name: &str) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE LOWER(name) = LOWER($1)")
        .bind(name)
        .fetch_optional(pool)
        .await
}

/// Active categories only unless `include_inactive`.
pub async fn list(pool: &AnyPool, include_inactive: bool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE ($1 = 1 OR is_active = 1) ORDER BY name ASC",
    )
    .bind(i64::from(include_inactive))
    .fetch_all(pool)
    .await
}

pub async fn update_category(
    pool: &AnyPool,
    category_id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        UPDATE categories SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            is_active = COALESCE($4, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id(category_id))
    .bind(name)
    .bind(description)
    .bind(is_active.map(i64::from))
    .fetch_optional(pool)
    .await
}

/// Categories are deactivated, never removed; products keep their reference.
pub async fn deactivate(pool: &AnyPool, category_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE categories SET is_active = 0 WHERE id = $1")
        .bind(id(category_id))
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
