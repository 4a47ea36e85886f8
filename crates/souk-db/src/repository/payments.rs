//! Payment records.

use chrono::{DateTime, Utc};
use sqlx::{Any, AnyPool, Executor};
use uuid::Uuid;

use souk_common::models::payment::{Payment, PaymentRecordStatus};

use crate::any_compat::{id, now, opt_ts};

pub async fn create_payment(
    pool: &AnyPool,
    payment_id: Uuid,
    order_id: Uuid,
    reference: &str,
    amount: i64,
    provider: &str,
) -> Result<Payment, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (id, order_id, reference, amount, provider, status, created_at)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6)
        RETURNING *
        "#,
    )
    .bind(id(payment_id))
    .bind(id(order_id))
    .bind(reference)
    .bind(amount)
    .bind(provider)
    .bind(now())
    .fetch_one(pool)
    .await
}

pub async fn find_by_reference<'e, E>(db: E, reference: &str) -> Result<Option<Payment>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reference = $1")
        .bind(reference)
        .fetch_optional(db)
        .await
}

pub async fn list_for_order(pool: &AnyPool, order_id: Uuid) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE order_id = $1 ORDER BY id ASC")
        .bind(id(order_id))
        .fetch_all(pool)
        .await
}

/// Settle a pending payment. Returns `None` if it was no longer pending.
pub async fn settle<'e, E>(
    db: E,
    payment_id: Uuid,
    status: PaymentRecordStatus,
    paid_at: Option<DateTime<Utc>>,
) -> Result<Option<Payment>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Payment>(
        "UPDATE payments SET status = $2, paid_at = $3 WHERE id = $1 AND status = 'pending' RETURNING *",
    )
    .bind(id(payment_id))
    .bind(status.as_str())
    .bind(opt_ts(paid_at))
    .fetch_optional(db)
    .await
}
