//! Per-user notification switches. Users without a row get the defaults.

use sqlx::{Any, Executor};
use uuid::Uuid;

use souk_common::models::user::NotificationPreferences;

use crate::any_compat::{flag, id, now};

pub async fn get<'e, E>(db: E, user_id: Uuid) -> Result<NotificationPreferences, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let prefs = sqlx::query_as::<_, NotificationPreferences>(
        "SELECT push_enabled, email_enabled FROM notification_preferences WHERE user_id = $1",
    )
    .bind(id(user_id))
    .fetch_optional(db)
    .await?;
    Ok(prefs.unwrap_or_default())
}

pub async fn upsert<'e, E>(
    db: E,
    user_id: Uuid,
    prefs: NotificationPreferences,
) -> Result<NotificationPreferences, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, NotificationPreferences>(
        r#"
        INSERT INTO notification_preferences (user_id, push_enabled, email_enabled, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO UPDATE SET
            push_enabled = excluded.push_enabled,
            email_enabled = excluded.email_enabled,
            updated_at = excluded.updated_at
        RETURNING push_enabled, email_enabled
        "#,
    )
    .bind(id(user_id))
    .bind(flag(prefs.push_enabled))
    .bind(flag(prefs.email_enabled))
    .bind(now())
    .fetch_one(db)
    .await
}
