//! Append-only status history for orders and shopping lists.

use sqlx::{Any, AnyPool, Executor};
use uuid::Uuid;

use souk_common::ids::generate_id;
use souk_common::models::order::{StatusChange, StatusEntity};

use crate::any_compat::{id, now, opt_id};

pub async fn record<'e, E>(
    db: E,
    entity: StatusEntity,
    entity_id: Uuid,
    from_status: Option<&str>,
    to_status: &str,
    actor_id: Option<Uuid>,
    note: Option<&str>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query(
        r#"
        INSERT INTO status_changes (id, entity, entity_id, from_status, to_status, actor_id, note, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id(generate_id()))
    .bind(entity.as_str())
    .bind(id(entity_id))
    .bind(from_status)
    .bind(to_status)
    .bind(opt_id(actor_id))
    .bind(note)
    .bind(now())
    .execute(db)
    .await?;
    Ok(())
}

/// Oldest first.
pub async fn history(
    pool: &AnyPool,
    entity: StatusEntity,
    entity_id: Uuid,
) -> Result<Vec<StatusChange>, sqlx::Error> {
    sqlx::query_as::<_, StatusChange>(
        "SELECT * FROM status_changes WHERE entity = $1 AND entity_id = $2 ORDER BY id ASC",
    )
    .bind(entity.as_str())
    .bind(id(entity_id))
    .fetch_all(pool)
    .await
}
