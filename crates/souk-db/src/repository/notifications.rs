//! Notification rows and their delivery stamps.

use chrono::{DateTime, Utc};
use sqlx::AnyPool;
use uuid::Uuid;

use souk_common::models::notification::Notification;

use crate::any_compat::{id, now, opt_ts, ts};

pub async fn create(pool: &AnyPool, n: &Notification) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (id, user_id, kind, priority, title, body, data,
                                   email_scheduled_for, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(id(n.id))
    .bind(id(n.user_id))
    .bind(n.kind.as_str())
    .bind(n.priority.as_str())
    .bind(n.title.as_str())
    .bind(n.body.as_str())
    .bind(n.data.to_string())
    .bind(opt_ts(n.email_scheduled_for))
    .bind(ts(n.created_at))
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &AnyPool, notification_id: Uuid) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
        .bind(id(notification_id))
        .fetch_optional(pool)
        .await
}

/// Newest first.
pub async fn list_for_user(
    pool: &AnyPool,
    user_id: Uuid,
    unread_only: bool,
    limit: i64,
    offset: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1 AND ($2 = 0 OR read_at IS NULL)
        ORDER BY id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(id(user_id))
    .bind(i64::from(unread_only))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_for_user(pool: &AnyPool, user_id: Uuid, unread_only: bool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND ($2 = 0 OR read_at IS NULL)",
    )
    .bind(id(user_id))
    .bind(i64::from(unread_only))
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn unread_count(pool: &AnyPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    count_for_user(pool, user_id, true).await
}

/// Mark one of the user's notifications read. False if it isn't theirs.
pub async fn mark_read(pool: &AnyPool, notification_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET read_at = COALESCE(read_at, $3) WHERE id = $1 AND user_id = $2",
    )
    .bind(id(notification_id))
    .bind(id(user_id))
    .bind(now())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_all_read(pool: &AnyPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE notifications SET read_at = $2 WHERE user_id = $1 AND read_at IS NULL")
            .bind(id(user_id))
            .bind(now())
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &AnyPool, notification_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(id(notification_id))
        .bind(id(user_id))
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_push_sent(pool: &AnyPool, notification_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE notifications SET push_sent_at = $2 WHERE id = $1")
        .bind(id(notification_id))
        .bind(now())
        .execute(pool)
        .await?;
    Ok(())
}

/// Move a scheduled email (used when a retry is rescheduled).
pub async fn reschedule_email(
    pool: &AnyPool,
    notification_id: Uuid,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE notifications SET email_scheduled_for = $2 WHERE id = $1")
        .bind(id(notification_id))
        .bind(ts(at))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_email_sent(pool: &AnyPool, notification_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE notifications SET email_sent_at = $2 WHERE id = $1")
        .bind(id(notification_id))
        .bind(now())
        .execute(pool)
        .await?;
    Ok(())
}

/// Give up on an email: clear the schedule so it is not recovered again.
pub async fn cancel_email(pool: &AnyPool, notification_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE notifications SET email_scheduled_for = NULL WHERE id = $1")
        .bind(id(notification_id))
        .execute(pool)
        .await?;
    Ok(())
}

/// Scheduled, unsent, unread emails, for re-queueing after a restart.
pub async fn pending_emails(pool: &AnyPool) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE email_scheduled_for IS NOT NULL
          AND email_sent_at IS NULL
          AND read_at IS NULL
        ORDER BY email_scheduled_for ASC
        "#,
    )
    .fetch_all(pool)
    .await
}
