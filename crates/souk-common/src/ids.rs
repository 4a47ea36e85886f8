//! Identifier generation.
//!
//! Every row uses a UUID v7: time-sortable, generated without coordination.
//! Orders and payments additionally carry short human-readable references.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new time-sortable row ID.
pub fn generate_id() -> Uuid {
    Uuid::now_v7()
}

/// Human-readable order number, e.g. `SK-20260118-4F9A2C`.
///
/// The suffix is six hex digits from the random tail of the row ID, so
/// numbers can collide; checkout draws again when one is taken.
pub fn order_number(id: Uuid, created_at: DateTime<Utc>) -> String {
    let simple = id.simple().to_string();
    let suffix = &simple[simple.len() - 6..];
    format!(
        "SK-{}-{}",
        created_at.format("%Y%m%d"),
        suffix.to_ascii_uppercase()
    )
}

/// Payment reference handed to the customer, e.g. `PAY-0192A5E66E1B7000…`.
pub fn payment_reference(id: Uuid) -> String {
    format!("PAY-{}", id.simple().to_string().to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_id();
        let id2 = generate_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_ids_are_time_sortable() {
        let id1 = generate_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = generate_id();
        assert!(id1 < id2);
    }

    #[test]
    fn order_numbers_carry_the_date() {
        let at = DateTime::parse_from_rfc3339("2026-01-18T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let number = order_number(generate_id(), at);
        assert!(number.starts_with("SK-20260118-"));
        assert_eq!(number.len(), "SK-20260118-".len() + 6);
    }
}
