//! Payments for orders, plus the signed provider webhook.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    middleware,
    routing::post,
    Extension, Router,
};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use uuid::Uuid;

use souk_common::config;
use souk_common::error::{SoukError, SoukResult};
use souk_common::models::payment::{CreatePaymentRequest, Payment, PaymentRecordStatus, PaymentWebhook};
use souk_db::repository::payments;

use super::{created, ok, optional_body, ApiResult, Created};
use crate::workflow::{orders::load_visible, payments as workflow, payments::Settlement};
use crate::{middleware::AuthContext, AppState};

/// Hex-encoded HMAC-SHA256 of the raw webhook body.
pub const SIGNATURE_HEADER: &str = "x-souk-signature";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/orders/{order_id}/payments",
            post(initiate_payment).get(order_payments),
        )
        .route("/payments/{reference}/confirm", post(confirm_payment))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// Provider callbacks carry no bearer token; the body signature stands in for it.
pub fn webhook_router() -> Router<Arc<AppState>> {
    Router::new().route("/payments/webhook", post(webhook))
}

#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    pub payment: Payment,
    /// False when the payment had already been settled before this call
    pub changed: bool,
}

impl From<Settlement> for SettlementResponse {
    fn from(s: Settlement) -> Self {
        match s {
            Settlement::Settled { payment, .. } => Self { payment, changed: true },
            Settlement::AlreadySettled(payment) => Self { payment, changed: false },
        }
    }
}

/// POST /api/v0/orders/{order_id}/payments
async fn initiate_payment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
    body: Bytes,
) -> Created<Payment> {
    let body: CreatePaymentRequest = optional_body(&body)?;
    let payment = workflow::initiate(&state, &auth, order_id, body.provider.as_deref()).await?;
    created("Payment initiated", payment)
}

/// GET /api/v0/orders/{order_id}/payments
async fn order_payments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Vec<Payment>> {
    let (order, _) = load_visible(&state, &auth, order_id).await?;
    ok("Payments", payments::list_for_order(&state.db.pool, order.id).await?)
}

/// POST /api/v0/payments/{reference}/confirm
///
/// Manual confirmation by an admin, e.g. for cash or bank transfer.
async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(reference): Path<String>,
) -> ApiResult<SettlementResponse> {
    auth.require_admin()?;
    let settlement = workflow::settle(&state, &reference, PaymentRecordStatus::Paid, None).await?;
    tracing::info!(reference = %reference, by = %auth.user_id, "Payment confirmed manually");
    ok("Payment confirmed", settlement.into())
}

/// POST /api/v0/payments/webhook
///
/// Settles a payment from the provider's signed callback. A repeated delivery
/// is acknowledged with `changed: false`.
async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<SettlementResponse> {
    let secret = &config::get().payments.webhook_secret;
    if secret.is_empty() {
        tracing::warn!("Payment webhook called but no webhook secret is configured");
        return Err(SoukError::Forbidden);
    }
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(SoukError::Unauthorized)?;
    if !verify_signature(secret.as_bytes(), &body, signature) {
        tracing::warn!("Payment webhook signature mismatch");
        return Err(SoukError::Unauthorized);
    }

    let event: PaymentWebhook = serde_json::from_slice(&body).map_err(|e| SoukError::Validation {
        message: format!("Invalid webhook payload: {e}"),
    })?;
    let settlement = workflow::settle(&state, &event.reference, event.status, event.amount).await?;
    ok("Webhook processed", settlement.into())
}

pub fn sign(secret: &[u8], body: &[u8]) -> SoukResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|e| SoukError::Internal(anyhow::anyhow!("bad webhook key: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_against_the_exact_body() {
        let body = br#"{"reference":"PAY-1","status":"paid"}"#;
        let sig = sign(b"whsec", body).unwrap();

        assert!(verify_signature(b"whsec", body, &sig));
        assert!(verify_signature(b"whsec", body, &sig.to_uppercase()));
        assert!(!verify_signature(b"other", body, &sig));
        assert!(!verify_signature(b"whsec", b"{}", &sig));
        assert!(!verify_signature(b"whsec", body, "not-hex"));
    }
}
