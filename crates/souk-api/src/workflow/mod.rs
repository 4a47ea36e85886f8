//! Status workflow services.
//!
//! Every status change runs in one transaction: check the transition, write
//! the new status, append history, move dependent entities along. The other
//! party is notified only after the commit.

pub mod lists;
pub mod orders;
pub mod payments;

use uuid::Uuid;

use souk_common::error::{SoukError, SoukResult};
use souk_common::models::order::Order;
use souk_common::models::shopping_list::ShoppingList;
use souk_common::models::workflow::Party;

use crate::middleware::AuthContext;

pub fn list_party(list: &ShoppingList, auth: &AuthContext) -> Party {
    Party::resolve(auth.user_id, auth.role, list.customer_id, list.agent_id)
}

pub fn order_party(order: &Order, auth: &AuthContext) -> Party {
    order.party(auth.user_id, auth.role)
}

/// Strangers may not even see the entity.
pub(crate) fn ensure_visible(party: Party) -> SoukResult<Party> {
    if party.can_view() {
        Ok(party)
    } else {
        Err(SoukError::Forbidden)
    }
}

pub(crate) fn list_not_found() -> SoukError {
    SoukError::not_found("Shopping list")
}

pub(crate) fn order_not_found() -> SoukError {
    SoukError::not_found("Order")
}

/// The row left the status we read it in before our update landed.
pub(crate) fn order_changed() -> SoukError {
    SoukError::Conflict {
        message: "Order was changed by someone else; reload and try again".into(),
    }
}

pub(crate) fn list_changed() -> SoukError {
    SoukError::Conflict {
        message: "Shopping list was changed by someone else; reload and try again".into(),
    }
}

/// `{ "<key>": id }`, attached to notifications so clients can deep-link.
pub(crate) fn link(key: &str, id: Uuid) -> serde_json::Value {
    serde_json::json!({ key: id })
}
