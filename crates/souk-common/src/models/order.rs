//! Orders: the commercial side of an accepted shopping list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::shopping_list::ShoppingListItem;
use super::workflow::{Party, StatusMachine};
use crate::error::SoukError;

text_enum! {
    pub enum OrderStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
        InProgress => "in_progress",
        /// Agent is physically buying the items
        Shopping => "shopping",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl StatusMachine for OrderStatus {
    const ENTITY: &'static str = "order";

    fn allowed_next(self) -> &'static [Self] {
        use OrderStatus::*;
        match self {
            Pending => &[Accepted, Rejected, Cancelled],
            Accepted => &[InProgress, Shopping, Cancelled],
            InProgress => &[Shopping, Completed],
            Shopping => &[Completed],
            Completed | Rejected | Cancelled => &[],
        }
    }

    fn permitted(target: Self, party: Party) -> bool {
        use OrderStatus::*;
        match target {
            Pending => false,
            Accepted | Rejected | InProgress | Shopping | Completed => party == Party::Agent,
            Cancelled => matches!(party, Party::Customer | Party::Admin),
        }
    }
}

impl OrderStatus {
    /// Non-terminal; an order in one of these blocks a second checkout.
    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }
}

text_enum! {
    pub enum PaymentStatus {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
        Refunded => "refunded",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Human-facing number, `SK-YYYYMMDD-XXXXXX`
    pub order_number: String,
    pub customer_id: Uuid,
    pub agent_id: Uuid,
    pub shopping_list_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: i64,
    pub service_fee: i64,
    pub delivery_fee: i64,
    pub total_amount: i64,
    pub delivery_address_id: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn party(&self, user_id: Uuid, role: super::user::UserRole) -> Party {
        Party::resolve(user_id, role, self.customer_id, Some(self.agent_id))
    }
}

/// Money breakdown computed at checkout. All amounts in kobo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub service_fee: i64,
    pub delivery_fee: i64,
    pub total_amount: i64,
}

impl OrderTotals {
    /// `service_fee_bps` is in basis points (500 = 5%). Fees round down.
    /// Fails with `Validation` if any amount overflows an `i64` of kobo.
    pub fn compute(
        items: &[ShoppingListItem],
        service_fee_bps: i64,
        delivery_fee: i64,
    ) -> Result<Self, SoukError> {
        let too_large = || SoukError::Validation {
            message: "Order total is too large".into(),
        };
        let subtotal = items
            .iter()
            .try_fold(0i64, |acc, item| acc.checked_add(item.line_total()?))
            .ok_or_else(too_large)?;
        let service_fee = subtotal
            .checked_mul(service_fee_bps)
            .ok_or_else(too_large)?
            / 10_000;
        let total_amount = subtotal
            .checked_add(service_fee)
            .and_then(|t| t.checked_add(delivery_fee))
            .ok_or_else(too_large)?;
        Ok(Self {
            subtotal,
            service_fee,
            delivery_fee,
            total_amount,
        })
    }
}

text_enum! {
    /// Which kind of entity a history row belongs to.
    pub enum StatusEntity {
        Order => "order",
        ShoppingList => "shopping_list",
    }
}

/// One row of an order's or shopping list's status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: Uuid,
    pub entity: StatusEntity,
    pub entity_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    /// None for system-driven changes
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub shopping_list_id: Uuid,
    /// Overrides the list's delivery address
    pub delivery_address_id: Option<Uuid>,
}

/// Body for reject/cancel. The reason is optional but recorded when present.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReasonRequest {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SoukError;
    use crate::models::workflow::check_transition;
    use OrderStatus::*;

    #[test]
    fn transition_table() {
        let legal = [
            (Pending, Accepted),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Accepted, InProgress),
            (Accepted, Shopping),
            (Accepted, Cancelled),
            (InProgress, Shopping),
            (InProgress, Completed),
            (Shopping, Completed),
        ];
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(*to),
                    legal.contains(&(*from, *to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn agent_drives_fulfilment() {
        assert!(check_transition(Pending, Accepted, Party::Agent).is_ok());
        assert!(check_transition(Accepted, Shopping, Party::Agent).is_ok());
        assert!(check_transition(Shopping, Completed, Party::Agent).is_ok());
        assert!(matches!(
            check_transition(Pending, Accepted, Party::Customer),
            Err(SoukError::Forbidden)
        ));
        assert!(matches!(
            check_transition(Pending, Accepted, Party::Admin),
            Err(SoukError::Forbidden)
        ));
    }

    #[test]
    fn cancel_only_before_work_starts() {
        assert!(check_transition(Pending, Cancelled, Party::Customer).is_ok());
        assert!(check_transition(Accepted, Cancelled, Party::Admin).is_ok());
        assert!(matches!(
            check_transition(InProgress, Cancelled, Party::Customer),
            Err(SoukError::InvalidTransition { entity: "order", .. })
        ));
        assert!(matches!(
            check_transition(Pending, Cancelled, Party::Agent),
            Err(SoukError::Forbidden)
        ));
    }

    #[test]
    fn terminal_orders_are_closed() {
        for s in [Completed, Rejected, Cancelled] {
            assert!(s.is_terminal());
            assert!(!s.is_open());
        }
        assert!(Pending.is_open());
    }

    fn item(estimated: i64, actual: Option<i64>, quantity: i64) -> ShoppingListItem {
        ShoppingListItem {
            id: Uuid::now_v7(),
            shopping_list_id: Uuid::nil(),
            product_id: None,
            name: "rice".into(),
            quantity,
            unit: None,
            estimated_price: estimated,
            actual_price: actual,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn totals_use_actual_prices_and_bps_fee() {
        let items = vec![item(100_000, None, 2), item(50_000, Some(45_000), 1)];
        let totals = OrderTotals::compute(&items, 500, 150_000).unwrap();
        assert_eq!(totals.subtotal, 245_000);
        assert_eq!(totals.service_fee, 12_250);
        assert_eq!(totals.delivery_fee, 150_000);
        assert_eq!(totals.total_amount, 407_250);
    }

    #[test]
    fn empty_list_costs_only_delivery() {
        let totals = OrderTotals::compute(&[], 500, 150_000).unwrap();
        assert_eq!(totals.subtotal, 0);
        assert_eq!(totals.total_amount, 150_000);
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let huge = vec![item(i64::MAX / 2, None, 1), item(i64::MAX / 2, None, 1)];
        assert!(OrderTotals::compute(&huge, 0, 0).is_ok());
        assert!(matches!(
            OrderTotals::compute(&huge, 0, 10),
            Err(SoukError::Validation { .. })
        ));
        assert!(matches!(
            OrderTotals::compute(&huge, 500, 0),
            Err(SoukError::Validation { .. })
        ));
        assert!(OrderTotals::compute(&[item(2, None, i64::MAX)], 0, 0).is_err());
    }
}
