//! Manual `sqlx::FromRow<'_, AnyRow>` implementations for the domain models.
//!
//! `AnyPool` only decodes primitives, so UUIDs and timestamps come back as
//! text, booleans as 0/1 integers and JSON as text. Enum columns hold the
//! snake_case names produced by `as_str`.

use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, FromRow, Row};
use uuid::Uuid;

use crate::models::*;

// ── Column helpers ────────────────────────────────────────────────────────────

fn decode_err<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}

pub fn uuid(row: &AnyRow, col: &str) -> Result<Uuid, sqlx::Error> {
    let s: String = row.try_get(col)?;
    Uuid::parse_str(&s).map_err(decode_err)
}

pub fn opt_uuid(row: &AnyRow, col: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let s: Option<String> = row.try_get(col)?;
    s.map(|v| Uuid::parse_str(&v).map_err(decode_err)).transpose()
}

pub fn dt(row: &AnyRow, col: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let s: String = row.try_get(col)?;
    parse_dt(&s).map_err(sqlx::Error::Decode)
}

pub fn opt_dt(row: &AnyRow, col: &str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let s: Option<String> = row.try_get(col)?;
    s.map(|v| parse_dt(&v).map_err(sqlx::Error::Decode))
        .transpose()
}

fn parse_dt(s: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error + Send + Sync + 'static>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Ok(d.with_timezone(&Utc));
    }
    // SQLite CURRENT_TIMESTAMP, with or without fractional seconds
    if let Ok(d) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(d.and_utc());
    }
    Err(format!("cannot parse timestamp '{s}'").into())
}

pub fn flag(row: &AnyRow, col: &str) -> Result<bool, sqlx::Error> {
    let v: i64 = row.try_get(col)?;
    Ok(v != 0)
}

fn json(row: &AnyRow, col: &str) -> Result<serde_json::Value, sqlx::Error> {
    let s: Option<String> = row.try_get(col)?;
    match s {
        Some(s) if !s.is_empty() => serde_json::from_str(&s).map_err(decode_err),
        _ => Ok(serde_json::Value::Null),
    }
}

fn text_enum<T>(row: &AnyRow, col: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T, sqlx::Error> {
    let s: String = row.try_get(col)?;
    parse(&s).ok_or_else(|| sqlx::Error::Decode(format!("unknown value '{s}' in {col}").into()))
}

// ── Accounts ──────────────────────────────────────────────────────────────────

impl<'r> FromRow<'r, AnyRow> for User {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            password_hash: row.try_get("password_hash")?,
            role: text_enum(row, "role", UserRole::parse)?,
            status: text_enum(row, "status", UserStatus::parse)?,
            created_at: dt(row, "created_at")?,
            updated_at: dt(row, "updated_at")?,
            deleted_at: opt_dt(row, "deleted_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for NotificationPreferences {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            push_enabled: flag(row, "push_enabled")?,
            email_enabled: flag(row, "email_enabled")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for AgentProfile {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: uuid(row, "user_id")?,
            kyc_status: text_enum(row, "kyc_status", KycStatus::parse)?,
            is_available: flag(row, "is_available")?,
            market_id: opt_uuid(row, "market_id")?,
            completed_orders: row.try_get("completed_orders")?,
            created_at: dt(row, "created_at")?,
            updated_at: dt(row, "updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for KycSubmission {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            agent_id: uuid(row, "agent_id")?,
            id_type: text_enum(row, "id_type", IdType::parse)?,
            id_number: row.try_get("id_number")?,
            document_url: row.try_get("document_url")?,
            selfie_url: row.try_get("selfie_url")?,
            status: text_enum(row, "status", KycReviewStatus::parse)?,
            rejection_reason: row.try_get("rejection_reason")?,
            reviewed_by: opt_uuid(row, "reviewed_by")?,
            reviewed_at: opt_dt(row, "reviewed_at")?,
            created_at: dt(row, "created_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for UserAddress {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            user_id: uuid(row, "user_id")?,
            label: row.try_get("label")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            is_default: flag(row, "is_default")?,
            created_at: dt(row, "created_at")?,
        })
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

impl<'r> FromRow<'r, AnyRow> for Market {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            market_type: text_enum(row, "market_type", MarketType::parse)?,
            operating_hours: row.try_get("operating_hours")?,
            owner_id: uuid(row, "owner_id")?,
            is_active: flag(row, "is_active")?,
            created_at: dt(row, "created_at")?,
            updated_at: dt(row, "updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for Category {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            is_active: flag(row, "is_active")?,
            created_at: dt(row, "created_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for Product {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            market_id: uuid(row, "market_id")?,
            vendor_id: uuid(row, "vendor_id")?,
            category_id: opt_uuid(row, "category_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            unit: row.try_get("unit")?,
            is_available: flag(row, "is_available")?,
            image_url: row.try_get("image_url")?,
            created_at: dt(row, "created_at")?,
            updated_at: dt(row, "updated_at")?,
        })
    }
}

// ── Workflow ──────────────────────────────────────────────────────────────────

impl<'r> FromRow<'r, AnyRow> for ShoppingList {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            customer_id: uuid(row, "customer_id")?,
            market_id: uuid(row, "market_id")?,
            agent_id: opt_uuid(row, "agent_id")?,
            title: row.try_get("title")?,
            notes: row.try_get("notes")?,
            status: text_enum(row, "status", ShoppingListStatus::parse)?,
            delivery_address_id: opt_uuid(row, "delivery_address_id")?,
            submitted_at: opt_dt(row, "submitted_at")?,
            created_at: dt(row, "created_at")?,
            updated_at: dt(row, "updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for ShoppingListItem {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            shopping_list_id: uuid(row, "shopping_list_id")?,
            product_id: opt_uuid(row, "product_id")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            unit: row.try_get("unit")?,
            estimated_price: row.try_get("estimated_price")?,
            actual_price: row.try_get("actual_price")?,
            notes: row.try_get("notes")?,
            created_at: dt(row, "created_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for Order {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            order_number: row.try_get("order_number")?,
            customer_id: uuid(row, "customer_id")?,
            agent_id: uuid(row, "agent_id")?,
            shopping_list_id: uuid(row, "shopping_list_id")?,
            status: text_enum(row, "status", OrderStatus::parse)?,
            payment_status: text_enum(row, "payment_status", PaymentStatus::parse)?,
            subtotal: row.try_get("subtotal")?,
            service_fee: row.try_get("service_fee")?,
            delivery_fee: row.try_get("delivery_fee")?,
            total_amount: row.try_get("total_amount")?,
            delivery_address_id: opt_uuid(row, "delivery_address_id")?,
            cancel_reason: row.try_get("cancel_reason")?,
            accepted_at: opt_dt(row, "accepted_at")?,
            completed_at: opt_dt(row, "completed_at")?,
            created_at: dt(row, "created_at")?,
            updated_at: dt(row, "updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for StatusChange {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            entity: text_enum(row, "entity", StatusEntity::parse)?,
            entity_id: uuid(row, "entity_id")?,
            from_status: row.try_get("from_status")?,
            to_status: row.try_get("to_status")?,
            actor_id: opt_uuid(row, "actor_id")?,
            note: row.try_get("note")?,
            created_at: dt(row, "created_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for Payment {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            order_id: uuid(row, "order_id")?,
            reference: row.try_get("reference")?,
            amount: row.try_get("amount")?,
            provider: row.try_get("provider")?,
            status: text_enum(row, "status", PaymentRecordStatus::parse)?,
            paid_at: opt_dt(row, "paid_at")?,
            created_at: dt(row, "created_at")?,
        })
    }
}

// ── Messaging ─────────────────────────────────────────────────────────────────

impl<'r> FromRow<'r, AnyRow> for Notification {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            user_id: uuid(row, "user_id")?,
            kind: text_enum(row, "kind", NotificationKind::parse)?,
            priority: text_enum(row, "priority", NotificationPriority::parse)?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            data: json(row, "data")?,
            read_at: opt_dt(row, "read_at")?,
            push_sent_at: opt_dt(row, "push_sent_at")?,
            email_scheduled_for: opt_dt(row, "email_scheduled_for")?,
            email_sent_at: opt_dt(row, "email_sent_at")?,
            created_at: dt(row, "created_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for ChatMessage {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            order_id: uuid(row, "order_id")?,
            sender_id: uuid(row, "sender_id")?,
            content: row.try_get("content")?,
            read_at: opt_dt(row, "read_at")?,
            created_at: dt(row, "created_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for Review {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            order_id: uuid(row, "order_id")?,
            reviewer_id: uuid(row, "reviewer_id")?,
            agent_id: uuid(row, "agent_id")?,
            rating: row.try_get("rating")?,
            comment: row.try_get("comment")?,
            created_at: dt(row, "created_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for SupportTicket {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid(row, "id")?,
            user_id: uuid(row, "user_id")?,
            subject: row.try_get("subject")?,
            description: row.try_get("description")?,
            category: text_enum(row, "category", TicketCategory::parse)?,
            priority: text_enum(row, "priority", TicketPriority::parse)?,
            status: text_enum(row, "status", TicketStatus::parse)?,
            assigned_to: opt_uuid(row, "assigned_to")?,
            created_at: dt(row, "created_at")?,
            updated_at: dt(row, "updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_shapes() {
        let a = parse_dt("2025-03-01T10:30:00.123456Z").unwrap();
        let b = parse_dt("2025-03-01 10:30:00.123456").unwrap();
        assert_eq!(a, b);
        assert!(parse_dt("2025-03-01 10:30:00").is_ok());
        assert!(parse_dt("yesterday").is_err());
    }
}
