//! Product repository. Prices are kobo.

use sqlx::{Any, AnyPool, Executor};
use uuid::Uuid;

use souk_common::models::catalog::{CreateProductRequest, Product, ProductQuery, UpdateProductRequest};

use crate::any_compat::{flag, id, like_pattern, now, opt_id};

pub async fn create_product(
    pool: &AnyPool,
    product_id: Uuid,
    vendor_id: Uuid,
    req: &CreateProductRequest,
) -> Result<Product, sqlx::Error> {
    let at = now();
    sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (id, market_id, vendor_id, category_id, name, description, price,
                              unit, is_available, image_url, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, $9, $10, $10)
        RETURNING *
        "#,
    )
    .bind(id(product_id))
    .bind(id(req.market_id))
    .bind(id(vendor_id))
    .bind(opt_id(req.category_id))
    .bind(req.name.trim())
    .bind(req.description.as_deref())
    .bind(req.price)
    .bind(req.unit.as_deref())
    .bind(req.image_url.as_deref())
    .bind(at)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id<'e, E>(db: E, product_id: Uuid) -> Result<Option<Product>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND deleted_at IS NULL")
        .bind(id(product_id))
        .fetch_optional(db)
        .await
}

pub async fn update_product(
    pool: &AnyPool,
    product_id: Uuid,
    req: &UpdateProductRequest,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        UPDATE products SET
            category_id = COALESCE($2, category_id),
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            price = COALESCE($5, price),
            unit = COALESCE($6, unit),
            is_available = COALESCE($7, is_available),
            image_url = COALESCE($8, image_url),
            updated_at = $9
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id(product_id))
    .bind(opt_id(req.category_id))
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.description.as_deref())
    .bind(req.price)
    .bind(req.unit.as_deref())
    .bind(req.is_available.map(flag))
    .bind(req.image_url.as_deref())
    .bind(now())
    .fetch_one(pool)
    .await
}

pub async fn soft_delete(pool: &AnyPool, product_id: Uuid) -> Result<(), sqlx::Error> {
    let at = now();
    sqlx::query("UPDATE products SET deleted_at = $2, is_available = 0, updated_at = $2 WHERE id = $1")
        .bind(id(product_id))
        .bind(at)
        .execute(pool)
        .await?;
    Ok(())
}

const SEARCH_FILTER: &str = r#"
    deleted_at IS NULL AND is_available = 1
    AND ($1 IS NULL OR LOWER(name) LIKE $1 ESCAPE '\')
    AND ($2 IS NULL OR market_id = $2)
    AND ($3 IS NULL OR category_id = $3)
    AND ($4 IS NULL OR price >= $4)
    AND ($5 IS NULL OR price <= $5)
"#;

/// Available products matching the filters, cheapest first.
pub async fn search(
    pool: &AnyPool,
    query: &ProductQuery,
    limit: i64,
    offset: i64,
) -> Result<Vec<Product>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM products WHERE {SEARCH_FILTER} ORDER BY price ASC, id ASC LIMIT $6 OFFSET $7"
    );
    sqlx::query_as::<_, Product>(&sql)
        .bind(query.q.as_deref().map(like_pattern))
        .bind(opt_id(query.market_id))
        .bind(opt_id(query.category_id))
        .bind(query.min_price)
        .bind(query.max_price)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &AnyPool, query: &ProductQuery) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM products WHERE {SEARCH_FILTER}");
    let row: (i64,) = sqlx::query_as(&sql)
        .bind(query.q.as_deref().map(like_pattern))
        .bind(opt_id(query.market_id))
        .bind(opt_id(query.category_id))
        .bind(query.min_price)
        .bind(query.max_price)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
