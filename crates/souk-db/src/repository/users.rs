//! User repository: accounts for customers, agents and admins.

use sqlx::{Any, AnyPool, Executor};
use uuid::Uuid;

use souk_common::models::user::{User, UserRole, UserStatus};

use crate::any_compat::{id, now};

/// Fields needed to create an account.
pub struct NewUser<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
    pub role: UserRole,
}

pub async fn create_user<'e, E>(db: E, user: &NewUser<'_>) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let at = now();
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, phone, first_name, last_name, password_hash, role, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'active', $8, $8)
        RETURNING *
        "#,
    )
    .bind(id(user.id))
    .bind(user.email.to_lowercase())
    .bind(user.phone)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.password_hash)
    .bind(user.role.as_str())
    .bind(at)
    .fetch_one(db)
    .await
}

/// Find a live (not deleted) user by ID.
pub async fn find_by_id<'e, E>(db: E, user_id: Uuid) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
        .bind(id(user_id))
        .fetch_optional(db)
        .await
}

/// Emails are stored lowercased.
pub async fn find_by_email(pool: &AnyPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL")
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await
}

pub async fn update_profile(
    pool: &AnyPool,
    user_id: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    phone: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            phone = COALESCE($4, phone),
            updated_at = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id(user_id))
    .bind(first_name)
    .bind(last_name)
    .bind(phone)
    .bind(now())
    .fetch_one(pool)
    .await
}

/// Suspend or re-activate an account.
pub async fn set_status(
    pool: &AnyPool,
    user_id: Uuid,
    status: UserStatus,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET status = $2, updated_at = $3 WHERE id = $1 AND deleted_at IS NULL RETURNING *",
    )
    .bind(id(user_id))
    .bind(status.as_str())
    .bind(now())
    .fetch_optional(pool)
    .await
}

/// Admin listing, newest first.
pub async fn list_users(
    pool: &AnyPool,
    role: Option<UserRole>,
    limit: i64,
    offset: i64,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE deleted_at IS NULL AND ($1 IS NULL OR role = $1)
        ORDER BY id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(role.map(|r| r.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_users(pool: &AnyPool, role: Option<UserRole>) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL AND ($1 IS NULL OR role = $1)",
    )
    .bind(role.map(|r| r.as_str()))
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}
