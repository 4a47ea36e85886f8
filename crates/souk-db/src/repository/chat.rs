//! Order chat messages.

use sqlx::AnyPool;
use uuid::Uuid;

use souk_common::models::chat::ChatMessage;

use crate::any_compat::{id, now, opt_id};

pub async fn create_message(
    pool: &AnyPool,
    message_id: Uuid,
    order_id: Uuid,
    sender_id: Uuid,
    content: &str,
) -> Result<ChatMessage, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>(
        r#"
        INSERT INTO chat_messages (id, order_id, sender_id, content, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(id(message_id))
    .bind(id(order_id))
    .bind(id(sender_id))
    .bind(content)
    .bind(now())
    .fetch_one(pool)
    .await
}

/// Newest first, optionally only messages older than `before`.
/// Message IDs are time-ordered so they double as the cursor.
pub async fn list_for_order(
    pool: &AnyPool,
    order_id: Uuid,
    before: Option<Uuid>,
    limit: i64,
) -> Result<Vec<ChatMessage>, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>(
        r#"
        SELECT * FROM chat_messages
        WHERE order_id = $1 AND ($2 IS NULL OR id < $2)
        ORDER BY id DESC
        LIMIT $3
        "#,
    )
    .bind(id(order_id))
    .bind(opt_id(before))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Mark everything the other participant sent as read by `reader_id`.
pub async fn mark_read(pool: &AnyPool, order_id: Uuid, reader_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE chat_messages SET read_at = $3
        WHERE order_id = $1 AND sender_id <> $2 AND read_at IS NULL
        "#,
    )
    .bind(id(order_id))
    .bind(id(reader_id))
    .bind(now())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
