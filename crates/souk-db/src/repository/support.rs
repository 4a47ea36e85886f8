//! Support tickets.

use sqlx::AnyPool;
use uuid::Uuid;

use souk_common::models::support::{SupportTicket, TicketCategory, TicketPriority, TicketStatus};

use crate::any_compat::{id, now, opt_id};

pub async fn create_ticket(
    pool: &AnyPool,
    ticket_id: Uuid,
    user_id: Uuid,
    subject: &str,
    description: &str,
    category: TicketCategory,
    priority: TicketPriority,
) -> Result<SupportTicket, sqlx::Error> {
    let at = now();
    sqlx::query_as::<_, SupportTicket>(
        r#"
        INSERT INTO support_tickets (id, user_id, subject, description, category, priority, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'open', $7, $7)
        RETURNING *
        "#,
    )
    .bind(id(ticket_id))
    .bind(id(user_id))
    .bind(subject)
    .bind(description)
    .bind(category.as_str())
    .bind(priority.as_str())
    .bind(at)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &AnyPool, ticket_id: Uuid) -> Result<Option<SupportTicket>, sqlx::Error> {
    sqlx::query_as::<_, SupportTicket>("SELECT * FROM support_tickets WHERE id = $1")
        .bind(id(ticket_id))
        .fetch_optional(pool)
        .await
}

/// A user's own tickets, or every ticket when `user_id` is `None`.
pub async fn list(
    pool: &AnyPool,
    user_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<SupportTicket>, sqlx::Error> {
    sqlx::query_as::<_, SupportTicket>(
        "SELECT * FROM support_tickets WHERE ($1 IS NULL OR user_id = $1) ORDER BY id DESC LIMIT $2 OFFSET $3",
    )
    .bind(opt_id(user_id))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &AnyPool, user_id: Option<Uuid>) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM support_tickets WHERE ($1 IS NULL OR user_id = $1)")
            .bind(opt_id(user_id))
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

pub async fn update_ticket(
    pool: &AnyPool,
    ticket_id: Uuid,
    status: Option<TicketStatus>,
    assigned_to: Option<Uuid>,
) -> Result<Option<SupportTicket>, sqlx::Error> {
    sqlx::query_as::<_, SupportTicket>(
        r#"
        UPDATE support_tickets SET
            status = COALESCE($2, status),
            assigned_to = COALESCE($3, assigned_to),
            updated_at = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id(ticket_id))
    .bind(status.map(|s| s.as_str()))
    .bind(opt_id(assigned_to))
    .bind(now())
    .fetch_optional(pool)
    .await
}

pub async fn count_open(pool: &AnyPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM support_tickets WHERE status IN ('open', 'in_progress')")
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}
