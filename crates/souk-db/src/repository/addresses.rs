//! Saved delivery addresses. At most one per user is the default.

use sqlx::{Any, AnyPool, Executor};
use uuid::Uuid;

use souk_common::models::address::{CreateAddressRequest, UpdateAddressRequest, UserAddress};

use crate::any_compat::{flag, id, now};

pub async fn create_address<'e, E>(
    db: E,
    address_id: Uuid,
    user_id: Uuid,
    req: &CreateAddressRequest,
    is_default: bool,
) -> Result<UserAddress, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, UserAddress>(
        r#"
        INSERT INTO user_addresses (id, user_id, label, address, city, state, latitude, longitude, is_default, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(id(address_id))
    .bind(id(user_id))
    .bind(req.label.as_str())
    .bind(req.address.as_str())
    .bind(req.city.as_str())
    .bind(req.state.as_str())
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(flag(is_default))
    .bind(now())
    .fetch_one(db)
    .await
}

pub async fn list_for_user(pool: &AnyPool, user_id: Uuid) -> Result<Vec<UserAddress>, sqlx::Error> {
    sqlx::query_as::<_, UserAddress>(
        "SELECT * FROM user_addresses WHERE user_id = $1 ORDER BY is_default DESC, id ASC",
    )
    .bind(id(user_id))
    .fetch_all(pool)
    .await
}

pub async fn count_for_user<'e, E>(db: E, user_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_addresses WHERE user_id = $1")
        .bind(id(user_id))
        .fetch_one(db)
        .await?;
    Ok(row.0)
}

pub async fn find_by_id<'e, E>(db: E, address_id: Uuid) -> Result<Option<UserAddress>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, UserAddress>("SELECT * FROM user_addresses WHERE id = $1")
        .bind(id(address_id))
        .fetch_optional(db)
        .await
}

pub async fn update_address(
    pool: &AnyPool,
    address_id: Uuid,
    req: &UpdateAddressRequest,
) -> Result<UserAddress, sqlx::Error> {
    sqlx::query_as::<_, UserAddress>(
        r#"
        UPDATE user_addresses SET
            label = COALESCE($2, label),
            address = COALESCE($3, address),
            city = COALESCE($4, city),
            state = COALESCE($5, state)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id(address_id))
    .bind(req.label.as_deref())
    .bind(req.address.as_deref())
    .bind(req.city.as_deref())
    .bind(req.state.as_deref())
    .fetch_one(pool)
    .await
}

pub async fn delete_address(pool: &AnyPool, address_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM user_addresses WHERE id = $1")
        .bind(id(address_id))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn clear_default<'e, E>(db: E, user_id: Uuid) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query("UPDATE user_addresses SET is_default = 0 WHERE user_id = $1")
        .bind(id(user_id))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn mark_default<'e, E>(db: E, address_id: Uuid) -> Result<UserAddress, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, UserAddress>(
        "UPDATE user_addresses SET is_default = 1 WHERE id = $1 RETURNING *",
    )
    .bind(id(address_id))
    .fetch_one(db)
    .await
}

/// Whether a shopping list or order still points at the address.
pub async fn in_use(pool: &AnyPool, address_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM shopping_lists WHERE delivery_address_id = $1)
             + (SELECT COUNT(*) FROM orders WHERE delivery_address_id = $1)
        "#,
    )
    .bind(id(address_id))
    .fetch_one(pool)
    .await?;
    Ok(row.0 > 0)
}
