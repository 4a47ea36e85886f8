//! Shared machinery for the order and shopping-list status machines.
//!
//! Each status enum lists its legal successors and which party may move an
//! entity into a given status. [`check_transition`] is the single gate every
//! status change goes through.

use uuid::Uuid;

use crate::error::SoukError;
use crate::models::user::UserRole;

/// How the acting user relates to the entity being moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// The customer who owns the list or order.
    Customer,
    /// The agent currently assigned to it.
    Agent,
    Admin,
    /// Internal propagation (an order moving its shopping list along).
    System,
    /// Anyone else.
    Stranger,
}

impl Party {
    /// Work out the acting party from the caller and the entity's participants.
    pub fn resolve(
        user_id: Uuid,
        role: UserRole,
        customer_id: Uuid,
        agent_id: Option<Uuid>,
    ) -> Self {
        if user_id == customer_id {
            Party::Customer
        } else if agent_id == Some(user_id) {
            Party::Agent
        } else if role == UserRole::Admin {
            Party::Admin
        } else {
            Party::Stranger
        }
    }

    /// Whether this party may read the entity at all.
    pub fn can_view(&self) -> bool {
        !matches!(self, Party::Stranger)
    }
}

/// A status enum with an enforced transition table.
pub trait StatusMachine: Copy + Eq + std::fmt::Display + 'static {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Statuses reachable from `self` in one step.
    fn allowed_next(self) -> &'static [Self];

    /// Whether `party` may move an entity into `target`.
    fn permitted(target: Self, party: Party) -> bool;

    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

/// Check actor permission first, then the transition table.
pub fn check_transition<S: StatusMachine>(from: S, to: S, party: Party) -> Result<(), SoukError> {
    if party != Party::System && !S::permitted(to, party) {
        return Err(SoukError::Forbidden);
    }
    if !from.can_transition_to(to) {
        return Err(SoukError::InvalidTransition {
            entity: S::ENTITY,
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_resolution() {
        let customer = Uuid::now_v7();
        let agent = Uuid::now_v7();
        let other = Uuid::now_v7();

        assert_eq!(
            Party::resolve(customer, UserRole::Customer, customer, Some(agent)),
            Party::Customer
        );
        assert_eq!(
            Party::resolve(agent, UserRole::Agent, customer, Some(agent)),
            Party::Agent
        );
        assert_eq!(
            Party::resolve(other, UserRole::Admin, customer, Some(agent)),
            Party::Admin
        );
        assert_eq!(
            Party::resolve(other, UserRole::Agent, customer, Some(agent)),
            Party::Stranger
        );
        assert_eq!(
            Party::resolve(other, UserRole::Agent, customer, None),
            Party::Stranger
        );
    }
}
