use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    pub enum PaymentRecordStatus {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
    }
}

/// A payment attempt against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    /// `PAY-…`, unique; what the provider echoes back in webhooks
    pub reference: String,
    pub amount: i64,
    pub provider: String,
    pub status: PaymentRecordStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CreatePaymentRequest {
    /// Defaults to "manual"
    pub provider: Option<String>,
}

/// Body of `POST /payments/webhook`.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub reference: String,
    /// `paid` or `failed`
    pub status: PaymentRecordStatus,
    pub amount: Option<i64>,
}
