//! Shopping lists: what a customer wants bought from a market.
//!
//! Lifecycle: `draft → submitted → accepted → in_progress → completed`,
//! with `cancelled` as the only other terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::workflow::{Party, StatusMachine};

text_enum! {
    pub enum ShoppingListStatus {
        /// Being written; items may still change
        Draft => "draft",
        /// Waiting for an agent to accept
        Submitted => "submitted",
        Accepted => "accepted",
        /// The agent is in the market
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl StatusMachine for ShoppingListStatus {
    const ENTITY: &'static str = "shopping list";

    fn allowed_next(self) -> &'static [Self] {
        use ShoppingListStatus::*;
        match self {
            Draft => &[Submitted, Cancelled],
            Submitted => &[Accepted, Cancelled],
            Accepted => &[InProgress, Cancelled],
            InProgress => &[Completed],
            Completed | Cancelled => &[],
        }
    }

    fn permitted(target: Self, party: Party) -> bool {
        use ShoppingListStatus::*;
        match target {
            Draft => false,
            Submitted => party == Party::Customer,
            Accepted | InProgress | Completed => party == Party::Agent,
            Cancelled => matches!(party, Party::Customer | Party::Admin),
        }
    }
}

impl ShoppingListStatus {
    /// Items can only be edited while the list is a draft.
    pub fn is_editable(self) -> bool {
        self == ShoppingListStatus::Draft
    }

    /// Statuses in which the assigned agent is still working on the list.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ShoppingListStatus::Submitted
                | ShoppingListStatus::Accepted
                | ShoppingListStatus::InProgress
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub market_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub title: String,
    pub notes: Option<String>,
    pub status: ShoppingListStatus,
    pub delivery_address_id: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub shopping_list_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub quantity: i64,
    pub unit: Option<String>,
    /// Customer's (or catalog) price per unit, kobo
    pub estimated_price: i64,
    /// What the agent actually paid per unit, kobo
    pub actual_price: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ShoppingListItem {
    /// Price per unit used for billing: actual if recorded, else estimate.
    pub fn unit_price(&self) -> i64 {
        self.actual_price.unwrap_or(self.estimated_price)
    }

    /// `None` if the line does not fit in an `i64` of kobo.
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price().checked_mul(self.quantity)
    }
}

/// A list together with its items, as returned by the API.
#[derive(Debug, Serialize)]
pub struct ShoppingListDetail {
    #[serde(flatten)]
    pub list: ShoppingList,
    pub items: Vec<ShoppingListItem>,
    pub estimated_total: i64,
}

impl ShoppingListDetail {
    pub fn new(list: ShoppingList, items: Vec<ShoppingListItem>) -> Self {
        let estimated_total = items
            .iter()
            .try_fold(0i64, |acc, item| acc.checked_add(item.line_total()?))
            .unwrap_or(i64::MAX);
        Self {
            list,
            items,
            estimated_total,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateShoppingListRequest {
    pub market_id: Uuid,

    #[validate(length(min = 2, max = 120, message = "Title must be 2-120 characters"))]
    pub title: String,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    pub delivery_address_id: Option<Uuid>,

    #[validate(nested)]
    #[serde(default)]
    pub items: Vec<ShoppingListItemRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateShoppingListRequest {
    #[validate(length(min = 2, max = 120))]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    pub delivery_address_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShoppingListItemRequest {
    /// Catalog product; its price becomes the estimate when none is given
    pub product_id: Option<Uuid>,

    #[validate(length(min = 1, max = 120, message = "Item name must be 1-120 characters"))]
    pub name: String,

    #[validate(range(min = 1, max = 10000, message = "Quantity must be 1-10000"))]
    pub quantity: i64,

    #[validate(length(max = 32))]
    pub unit: Option<String>,

    #[validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Price must be 0 to 10 billion naira"))]
    pub estimated_price: Option<i64>,

    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateShoppingListItemRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,

    #[validate(range(min = 1, max = 10000))]
    pub quantity: Option<i64>,

    #[validate(length(max = 32))]
    pub unit: Option<String>,

    #[validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Price must be 0 to 10 billion naira"))]
    pub estimated_price: Option<i64>,

    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetActualPriceRequest {
    #[validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Price must be 0 to 10 billion naira"))]
    pub actual_price: i64,
}

#[derive(Debug, Deserialize)]
pub struct ShoppingListQuery {
    pub status: Option<ShoppingListStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workflow::check_transition;
    use ShoppingListStatus::*;

    #[test]
    fn happy_path_is_allowed() {
        assert!(check_transition(Draft, Submitted, Party::Customer).is_ok());
        assert!(check_transition(Submitted, Accepted, Party::Agent).is_ok());
        assert!(check_transition(Accepted, InProgress, Party::Agent).is_ok());
        assert!(check_transition(InProgress, Completed, Party::Agent).is_ok());
    }

    #[test]
    fn only_tabled_transitions_exist() {
        let legal = [
            (Draft, Submitted),
            (Draft, Cancelled),
            (Submitted, Accepted),
            (Submitted, Cancelled),
            (Accepted, InProgress),
            (Accepted, Cancelled),
            (InProgress, Completed),
        ];
        for from in ShoppingListStatus::ALL {
            for to in ShoppingListStatus::ALL {
                assert_eq!(
                    from.can_transition_to(*to),
                    legal.contains(&(*from, *to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn wrong_party_is_forbidden() {
        assert!(matches!(
            check_transition(Submitted, Accepted, Party::Customer),
            Err(crate::error::SoukError::Forbidden)
        ));
        assert!(matches!(
            check_transition(Draft, Submitted, Party::Agent),
            Err(crate::error::SoukError::Forbidden)
        ));
        assert!(check_transition(Submitted, Cancelled, Party::Admin).is_ok());
    }

    #[test]
    fn terminal_states() {
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!InProgress.is_terminal());
        assert!(matches!(
            check_transition(InProgress, Cancelled, Party::Customer),
            Err(crate::error::SoukError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn system_bypasses_party_rules() {
        assert!(check_transition(Accepted, InProgress, Party::System).is_ok());
    }

    #[test]
    fn line_totals_prefer_actual_price() {
        let mut item = ShoppingListItem {
            id: Uuid::nil(),
            shopping_list_id: Uuid::nil(),
            product_id: None,
            name: "Tomatoes".into(),
            quantity: 3,
            unit: Some("basket".into()),
            estimated_price: 1_000,
            actual_price: None,
            notes: None,
            created_at: Utc::now(),
        };
        assert_eq!(item.line_total(), Some(3_000));
        item.actual_price = Some(1_200);
        assert_eq!(item.line_total(), Some(3_600));

        item.actual_price = Some(i64::MAX / 2 + 1);
        assert_eq!(item.line_total(), None);
    }

    #[test]
    fn prices_above_the_ceiling_fail_validation() {
        let req = SetActualPriceRequest {
            actual_price: 1_000_000_000_001,
        };
        assert!(req.validate().is_err());
        let req = SetActualPriceRequest {
            actual_price: 1_000_000_000_000,
        };
        assert!(req.validate().is_ok());
    }
}
