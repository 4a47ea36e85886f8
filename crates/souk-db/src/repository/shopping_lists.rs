//! Shopping lists and their items.

use chrono::{DateTime, Utc};
use sqlx::{Any, AnyPool, Executor};
use uuid::Uuid;

use souk_common::models::shopping_list::{
    ShoppingList, ShoppingListItem, ShoppingListStatus, UpdateShoppingListItemRequest,
};

use crate::any_compat::{id, now, opt_id, opt_ts};

pub async fn create_list<'e, E>(
    db: E,
    list_id: Uuid,
    customer_id: Uuid,
    market_id: Uuid,
    title: &str,
    notes: Option<&str>,
    delivery_address_id: Option<Uuid>,
) -> Result<ShoppingList, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let at = now();
    sqlx::query_as::<_, ShoppingList>(
        r#"
        INSERT INTO shopping_lists (id, customer_id, market_id, title, notes, status, delivery_address_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'draft', $6, $7, $7)
        RETURNING *
        "#,
    )
    .bind(id(list_id))
    .bind(id(customer_id))
    .bind(id(market_id))
    .bind(title)
    .bind(notes)
    .bind(opt_id(delivery_address_id))
    .bind(at)
    .fetch_one(db)
    .await
}

pub async fn find_by_id<'e, E>(db: E, list_id: Uuid) -> Result<Option<ShoppingList>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, ShoppingList>("SELECT * FROM shopping_lists WHERE id = $1")
        .bind(id(list_id))
        .fetch_optional(db)
        .await
}

pub async fn update_details(
    pool: &AnyPool,
    list_id: Uuid,
    title: Option<&str>,
    notes: Option<&str>,
    delivery_address_id: Option<Uuid>,
) -> Result<ShoppingList, sqlx::Error> {
    sqlx::query_as::<_, ShoppingList>(
        r#"
        UPDATE shopping_lists SET
            title = COALESCE($2, title),
            notes = COALESCE($3, notes),
            delivery_address_id = COALESCE($4, delivery_address_id),
            updated_at = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id(list_id))
    .bind(title)
    .bind(notes)
    .bind(opt_id(delivery_address_id))
    .bind(now())
    .fetch_one(pool)
    .await
}

/// Remove a list and its items.
pub async fn delete_list<'e, E>(db: E, list_id: Uuid) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query("DELETE FROM shopping_lists WHERE id = $1")
        .bind(id(list_id))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_items<'e, E>(db: E, list_id: Uuid) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query("DELETE FROM shopping_list_items WHERE shopping_list_id = $1")
        .bind(id(list_id))
        .execute(db)
        .await?;
    Ok(())
}

/// Lists a user takes part in: as the customer, or as the assigned agent.
pub async fn list_for_user(
    pool: &AnyPool,
    user_id: Uuid,
    status: Option<ShoppingListStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ShoppingList>, sqlx::Error> {
    sqlx::query_as::<_, ShoppingList>(
        r#"
        SELECT * FROM shopping_lists
        WHERE (customer_id = $1 OR agent_id = $1)
          AND ($2 IS NULL OR status = $2)
        ORDER BY id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(id(user_id))
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_for_user(
    pool: &AnyPool,
    user_id: Uuid,
    status: Option<ShoppingListStatus>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM shopping_lists
        WHERE (customer_id = $1 OR agent_id = $1)
          AND ($2 IS NULL OR status = $2)
        "#,
    )
    .bind(id(user_id))
    .bind(status.map(|s| s.as_str()))
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Move a list from `from` to `status`. `submitted_at` is only written when
/// given. Returns `None` when the list has left `from` in the meantime.
pub async fn set_status<'e, E>(
    db: E,
    list_id: Uuid,
    from: ShoppingListStatus,
    status: ShoppingListStatus,
    submitted_at: Option<DateTime<Utc>>,
) -> Result<Option<ShoppingList>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, ShoppingList>(
        r#"
        UPDATE shopping_lists SET
            status = $3,
            submitted_at = COALESCE($4, submitted_at),
            updated_at = $5
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(id(list_id))
    .bind(from.as_str())
    .bind(status.as_str())
    .bind(opt_ts(submitted_at))
    .bind(now())
    .fetch_optional(db)
    .await
}

/// Set or clear the assigned agent of a list that is still `submitted`.
/// Returns `None` once the list has moved on.
pub async fn set_agent<'e, E>(
    db: E,
    list_id: Uuid,
    agent_id: Option<Uuid>,
) -> Result<Option<ShoppingList>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, ShoppingList>(
        r#"
        UPDATE shopping_lists SET agent_id = $2, updated_at = $3
        WHERE id = $1 AND status = 'submitted'
        RETURNING *
        "#,
    )
    .bind(id(list_id))
    .bind(opt_id(agent_id))
    .bind(now())
    .fetch_optional(db)
    .await
}

pub async fn count_by_status(pool: &AnyPool, status: ShoppingListStatus) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shopping_lists WHERE status = $1")
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

// ── Items ─────────────────────────────────────────────────────────────────────

pub struct NewItem<'a> {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: &'a str,
    pub quantity: i64,
    pub unit: Option<&'a str>,
    pub estimated_price: i64,
    pub notes: Option<&'a str>,
}

pub async fn add_item<'e, E>(db: E, list_id: Uuid, item: &NewItem<'_>) -> Result<ShoppingListItem, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, ShoppingListItem>(
        r#"
        INSERT INTO shopping_list_items (id, shopping_list_id, product_id, name, quantity, unit, estimated_price, notes, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(id(item.id))
    .bind(id(list_id))
    .bind(opt_id(item.product_id))
    .bind(item.name)
    .bind(item.quantity)
    .bind(item.unit)
    .bind(item.estimated_price)
    .bind(item.notes)
    .bind(now())
    .fetch_one(db)
    .await
}

/// Items in the order they were added.
pub async fn list_items<'e, E>(db: E, list_id: Uuid) -> Result<Vec<ShoppingListItem>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, ShoppingListItem>(
        "SELECT * FROM shopping_list_items WHERE shopping_list_id = $1 ORDER BY id ASC",
    )
    .bind(id(list_id))
    .fetch_all(db)
    .await
}

pub async fn count_items<'e, E>(db: E, list_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM shopping_list_items WHERE shopping_list_id = $1")
            .bind(id(list_id))
            .fetch_one(db)
            .await?;
    Ok(row.0)
}

/// Find an item, scoped to its list.
pub async fn find_item(
    pool: &AnyPool,
    list_id: Uuid,
    item_id: Uuid,
) -> Result<Option<ShoppingListItem>, sqlx::Error> {
    sqlx::query_as::<_, ShoppingListItem>(
        "SELECT * FROM shopping_list_items WHERE id = $1 AND shopping_list_id = $2",
    )
    .bind(id(item_id))
    .bind(id(list_id))
    .fetch_optional(pool)
    .await
}

pub async fn update_item(
    pool: &AnyPool,
    item_id: Uuid,
    req: &UpdateShoppingListItemRequest,
) -> Result<ShoppingListItem, sqlx::Error> {
    sqlx::query_as::<_, ShoppingListItem>(
        r#"
        UPDATE shopping_list_items SET
            name = COALESCE($2, name),
            quantity = COALESCE($3, quantity),
            unit = COALESCE($4, unit),
            estimated_price = COALESCE($5, estimated_price),
            notes = COALESCE($6, notes)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id(item_id))
    .bind(req.name.as_deref())
    .bind(req.quantity)
    .bind(req.unit.as_deref())
    .bind(req.estimated_price)
    .bind(req.notes.as_deref())
    .fetch_one(pool)
    .await
}

pub async fn set_actual_price(
    pool: &AnyPool,
    item_id: Uuid,
    actual_price: i64,
) -> Result<ShoppingListItem, sqlx::Error> {
    sqlx::query_as::<_, ShoppingListItem>(
        "UPDATE shopping_list_items SET actual_price = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id(item_id))
    .bind(actual_price)
    .fetch_one(pool)
    .await
}

pub async fn delete_item(pool: &AnyPool, item_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM shopping_list_items WHERE id = $1")
        .bind(id(item_id))
        .execute(pool)
        .await?;
    Ok(())
}
