//! Shopping agent profile and the KYC verification workflow.
//!
//! An agent can only be assigned work once an admin has approved their KYC
//! submission and they have marked themselves available.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

text_enum! {
    pub enum KycStatus {
        NotSubmitted => "not_submitted",
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

text_enum! {
    /// Government ID accepted for verification.
    pub enum IdType {
        Nin => "nin",
        DriversLicense => "drivers_license",
        Passport => "passport",
        VotersCard => "voters_card",
    }
}

text_enum! {
    /// Review state of a single KYC submission.
    pub enum KycReviewStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub user_id: Uuid,
    pub kyc_status: KycStatus,
    pub is_available: bool,
    /// Home market, used first when auto-assigning shopping lists
    pub market_id: Option<Uuid>,
    pub completed_orders: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentProfile {
    /// Whether this agent may currently be handed new shopping lists.
    pub fn can_take_work(&self) -> bool {
        self.is_available && self.kyc_status == KycStatus::Approved
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycSubmission {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub id_type: IdType,
    pub id_number: String,
    pub document_url: String,
    pub selfie_url: Option<String>,
    pub status: KycReviewStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitKycRequest {
    pub id_type: IdType,

    #[validate(length(min = 5, max = 32, message = "ID number must be 5-32 characters"))]
    pub id_number: String,

    #[validate(url(message = "Document must be a URL"))]
    pub document_url: String,

    #[validate(url(message = "Selfie must be a URL"))]
    pub selfie_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectKycRequest {
    #[validate(length(min = 3, max = 500, message = "Reason must be 3-500 characters"))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: bool,
    pub market_id: Option<Uuid>,
}

/// Aggregates shown on the agent's dashboard.
#[derive(Debug, Serialize)]
pub struct AgentStats {
    pub active_orders: i64,
    pub completed_orders: i64,
    pub total_earnings: i64,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// What customers see about an agent.
#[derive(Debug, Serialize)]
pub struct AgentPublicProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub kyc_status: KycStatus,
    pub is_available: bool,
    pub market_id: Option<Uuid>,
    pub completed_orders: i64,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}
