//! In-app notifications and their delivery bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    /// How urgently a notification should reach the user.
    ///
    /// Declared low to high so the derived ordering ranks urgency.
    pub enum NotificationPriority {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}

impl NotificationPriority {
    /// Higher is more urgent.
    pub fn rank(self) -> u8 {
        match self {
            NotificationPriority::Low => 0,
            NotificationPriority::Normal => 1,
            NotificationPriority::High => 2,
            NotificationPriority::Urgent => 3,
        }
    }
}

text_enum! {
    pub enum NotificationKind {
        /// A new order or shopping list was assigned to an agent
        NewAssignment => "new_assignment",
        OrderUpdate => "order_update",
        ShoppingListUpdate => "shopping_list_update",
        PaymentUpdate => "payment_update",
        ChatMessage => "chat_message",
        KycUpdate => "kyc_update",
        SupportUpdate => "support_update",
        System => "system",
    }
}

impl NotificationKind {
    pub fn default_priority(self) -> NotificationPriority {
        use NotificationKind::*;
        match self {
            NewAssignment => NotificationPriority::Urgent,
            OrderUpdate | ShoppingListUpdate | PaymentUpdate => NotificationPriority::High,
            ChatMessage | KycUpdate | System => NotificationPriority::Normal,
            SupportUpdate => NotificationPriority::Low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub title: String,
    pub body: String,
    /// Deep-link payload, e.g. `{"order_id": "…"}`
    pub data: serde_json::Value,
    pub read_at: Option<DateTime<Utc>>,
    pub push_sent_at: Option<DateTime<Utc>>,
    pub email_scheduled_for: Option<DateTime<Utc>>,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_priorities() {
        assert_eq!(
            NotificationKind::NewAssignment.default_priority(),
            NotificationPriority::Urgent
        );
        assert_eq!(
            NotificationKind::OrderUpdate.default_priority(),
            NotificationPriority::High
        );
        assert_eq!(
            NotificationKind::PaymentUpdate.default_priority(),
            NotificationPriority::High
        );
        assert_eq!(
            NotificationKind::ChatMessage.default_priority(),
            NotificationPriority::Normal
        );
        assert_eq!(
            NotificationKind::KycUpdate.default_priority(),
            NotificationPriority::Normal
        );
        assert_eq!(
            NotificationKind::SupportUpdate.default_priority(),
            NotificationPriority::Low
        );
    }

    #[test]
    fn rank_follows_urgency() {
        let ranks: Vec<u8> = NotificationPriority::ALL.iter().map(|p| p.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }
}
