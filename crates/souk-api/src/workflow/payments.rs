//! Payment initiation and settlement.
//!
//! A payment is created pending with a reference the customer quotes to the
//! provider. Settlement arrives either as a signed webhook or as an admin
//! confirmation; both end here.

use chrono::Utc;
use uuid::Uuid;

use souk_common::error::{SoukError, SoukResult};
use souk_common::gateway_event::events;
use souk_common::ids::{generate_id, payment_reference};
use souk_common::models::notification::NotificationKind;
use souk_common::models::order::{Order, OrderStatus, PaymentStatus};
use souk_common::models::payment::{Payment, PaymentRecordStatus};
use souk_common::models::workflow::Party;
use souk_db::repository::{orders, payments};
use souk_notify::NewNotification;

use super::{link, order_not_found};
use crate::{middleware::AuthContext, AppState};

pub const DEFAULT_PROVIDER: &str = "manual";

/// Customer starts paying for their order.
pub async fn initiate(
    state: &AppState,
    auth: &AuthContext,
    order_id: Uuid,
    provider: Option<&str>,
) -> SoukResult<Payment> {
    let (order, party) = super::orders::load_visible(state, auth, order_id).await?;
    if party != Party::Customer {
        return Err(SoukError::Forbidden);
    }
    if matches!(order.status, OrderStatus::Cancelled | OrderStatus::Rejected) {
        return Err(SoukError::Conflict {
            message: format!("Order is {}", order.status),
        });
    }
    if order.payment_status == PaymentStatus::Paid {
        return Err(SoukError::Conflict {
            message: "Order is already paid".into(),
        });
    }

    let id = generate_id();
    let payment = payments::create_payment(
        &state.db.pool,
        id,
        order.id,
        &payment_reference(id),
        order.total_amount,
        provider.unwrap_or(DEFAULT_PROVIDER),
    )
    .await?;

    tracing::info!(
        order_id = %order.id,
        reference = %payment.reference,
        amount = payment.amount,
        "Payment initiated"
    );
    Ok(payment)
}

/// What settling a payment did.
#[derive(Debug)]
pub enum Settlement {
    Settled { payment: Payment, order: Order },
    /// The payment had already been settled; nothing changed
    AlreadySettled(Payment),
}

/// Settle a pending payment by reference and mirror the result onto its order.
pub async fn settle(
    state: &AppState,
    reference: &str,
    status: PaymentRecordStatus,
    reported_amount: Option<i64>,
) -> SoukResult<Settlement> {
    if status == PaymentRecordStatus::Pending {
        return Err(SoukError::bad_request("Settlement status must be paid or failed"));
    }

    let mut tx = state.db.pool.begin().await?;
    let payment = payments::find_by_reference(&mut *tx, reference)
        .await?
        .ok_or_else(|| SoukError::not_found("Payment"))?;
    if payment.status != PaymentRecordStatus::Pending {
        return Ok(Settlement::AlreadySettled(payment));
    }
    if let Some(amount) = reported_amount {
        if amount != payment.amount {
            tracing::warn!(
                reference,
                expected = payment.amount,
                reported = amount,
                "Payment amount mismatch"
            );
            return Err(SoukError::bad_request("Amount does not match the payment"));
        }
    }

    let paid_at = (status == PaymentRecordStatus::Paid).then(Utc::now);
    let Some(payment) = payments::settle(&mut *tx, payment.id, status, paid_at).await? else {
        // Lost a race with a concurrent settlement
        let current = payments::find_by_reference(&mut *tx, reference)
            .await?
            .ok_or_else(|| SoukError::not_found("Payment"))?;
        return Ok(Settlement::AlreadySettled(current));
    };

    let order = orders::find_by_id(&mut *tx, payment.order_id)
        .await?
        .ok_or_else(order_not_found)?;
    let order = match (status, order.payment_status) {
        (_, PaymentStatus::Paid) => order,
        (PaymentRecordStatus::Paid, _) => {
            orders::set_payment_status(&mut *tx, order.id, PaymentStatus::Paid).await?
        }
        _ => orders::set_payment_status(&mut *tx, order.id, PaymentStatus::Failed).await?,
    };
    tx.commit().await?;

    tracing::info!(
        reference,
        order_id = %order.id,
        status = %payment.status,
        "Payment settled"
    );

    let (title, body) = if payment.status == PaymentRecordStatus::Paid {
        (
            "Payment received",
            format!("Payment for order {} was confirmed.", order.order_number),
        )
    } else {
        (
            "Payment failed",
            format!("Payment for order {} did not go through.", order.order_number),
        )
    };
    let mut recipients = vec![order.customer_id];
    if payment.status == PaymentRecordStatus::Paid {
        recipients.push(order.agent_id);
    }
    for recipient in recipients {
        state.publish(recipient, events::ORDER_UPDATE, &order);
        state
            .notifier
            .notify_quietly(
                NewNotification::new(recipient, NotificationKind::PaymentUpdate, title, body.clone())
                    .with_data(link("order_id", order.id)),
            )
            .await;
    }

    Ok(Settlement::Settled { payment, order })
}
