//! Order repository.

use chrono::{DateTime, Utc};
use sqlx::{Any, AnyPool, Executor};
use uuid::Uuid;

use souk_common::models::order::{Order, OrderStatus, PaymentStatus};

use crate::any_compat::{id, now, opt_id, opt_ts, ts};

pub async fn create_order<'e, E>(db: E, order: &Order) -> Result<Order, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (id, order_number, customer_id, agent_id, shopping_list_id, status, payment_status,
                            subtotal, service_fee, delivery_fee, total_amount, delivery_address_id,
                            created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(id(order.id))
    .bind(order.order_number.as_str())
    .bind(id(order.customer_id))
    .bind(id(order.agent_id))
    .bind(id(order.shopping_list_id))
    .bind(order.status.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.subtotal)
    .bind(order.service_fee)
    .bind(order.delivery_fee)
    .bind(order.total_amount)
    .bind(opt_id(order.delivery_address_id))
    .bind(ts(order.created_at))
    .bind(ts(order.updated_at))
    .fetch_one(db)
    .await
}

pub async fn find_by_id<'e, E>(db: E, order_id: Uuid) -> Result<Option<Order>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id(order_id))
        .fetch_optional(db)
        .await
}

pub async fn order_number_taken<'e, E>(db: E, order_number: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE order_number = $1")
        .bind(order_number)
        .fetch_one(db)
        .await?;
    Ok(row.0 > 0)
}

/// True if `err` is the one-open-order-per-list index refusing a second order.
pub fn is_open_order_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            db.constraint() == Some("idx_orders_open_list")
                || db.message().contains("orders.shopping_list_id")
        }
        _ => false,
    }
}

/// The list's order that is not yet completed, rejected or cancelled.
pub async fn find_open_for_list<'e, E>(db: E, list_id: Uuid) -> Result<Option<Order>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE shopping_list_id = $1 AND status NOT IN ('completed', 'rejected', 'cancelled')
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(id(list_id))
    .fetch_optional(db)
    .await
}

/// Whose orders to list.
#[derive(Debug, Clone, Copy)]
pub enum OrderScope {
    /// Orders where the user is the customer or the agent
    Participant(Uuid),
    /// Every order (admin)
    All,
}

impl OrderScope {
    fn bind_value(self) -> Option<String> {
        match self {
            OrderScope::Participant(user_id) => Some(id(user_id)),
            OrderScope::All => None,
        }
    }
}

const LIST_FILTER: &str = r#"
    ($1 IS NULL OR customer_id = $1 OR agent_id = $1)
    AND ($2 IS NULL OR status = $2)
"#;

/// Newest first.
pub async fn list_orders(
    pool: &AnyPool,
    scope: OrderScope,
    status: Option<OrderStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Order>, sqlx::Error> {
    let sql = format!("SELECT * FROM orders WHERE {LIST_FILTER} ORDER BY id DESC LIMIT $3 OFFSET $4");
    sqlx::query_as::<_, Order>(&sql)
        .bind(scope.bind_value())
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count_orders(
    pool: &AnyPool,
    scope: OrderScope,
    status: Option<OrderStatus>,
) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM orders WHERE {LIST_FILTER}");
    let row: (i64,) = sqlx::query_as(&sql)
        .bind(scope.bind_value())
        .bind(status.map(|s| s.as_str()))
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Orders assigned to an agent that are not finished yet.
pub async fn count_active_for_agent(pool: &AnyPool, agent_id: Uuid) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE agent_id = $1 AND status IN ('pending', 'accepted', 'in_progress', 'shopping')",
    )
    .bind(id(agent_id))
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Move an order from `from` to `status`. Timestamps and the cancel reason
/// are only overwritten when given.
///
/// Returns `None` when the order is no longer in `from`, i.e. a concurrent
/// transition got there first.
pub async fn update_status<'e, E>(
    db: E,
    order_id: Uuid,
    from: OrderStatus,
    status: OrderStatus,
    accepted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancel_reason: Option<&str>,
) -> Result<Option<Order>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders SET
            status = $3,
            accepted_at = COALESCE($4, accepted_at),
            completed_at = COALESCE($5, completed_at),
            cancel_reason = COALESCE($6, cancel_reason),
            updated_at = $7
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(id(order_id))
    .bind(from.as_str())
    .bind(status.as_str())
    .bind(opt_ts(accepted_at))
    .bind(opt_ts(completed_at))
    .bind(cancel_reason)
    .bind(now())
    .fetch_optional(db)
    .await
}

pub async fn set_payment_status<'e, E>(
    db: E,
    order_id: Uuid,
    payment_status: PaymentStatus,
) -> Result<Order, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Order>(
        "UPDATE orders SET payment_status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id(order_id))
    .bind(payment_status.as_str())
    .bind(now())
    .fetch_one(db)
    .await
}

pub async fn count_by_status(pool: &AnyPool, status: OrderStatus) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = $1")
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Gross value of paid orders.
pub async fn paid_volume(pool: &AnyPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT CAST(COALESCE(SUM(total_amount), 0) AS BIGINT) FROM orders WHERE payment_status = 'paid'",
    )
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}
