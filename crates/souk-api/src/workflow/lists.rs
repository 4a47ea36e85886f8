//! Shopping list transitions and agent assignment.

use chrono::Utc;
use uuid::Uuid;

use souk_common::error::{SoukError, SoukResult};
use souk_common::gateway_event::events;
use souk_common::models::notification::NotificationKind;
use souk_common::models::order::{OrderStatus, PaymentStatus, StatusEntity};
use souk_common::models::shopping_list::{ShoppingList, ShoppingListStatus};
use souk_common::models::user::UserRole;
use souk_common::models::workflow::{check_transition, Party};
use souk_db::repository::{agents, orders, shopping_lists, status_changes};
use souk_notify::NewNotification;

use super::{ensure_visible, link, list_changed, list_not_found, list_party, order_changed};
use crate::{middleware::AuthContext, AppState};

/// Load a list the caller takes part in.
pub async fn load_visible(
    state: &AppState,
    auth: &AuthContext,
    list_id: Uuid,
) -> SoukResult<(ShoppingList, Party)> {
    let list = shopping_lists::find_by_id(&state.db.pool, list_id)
        .await?
        .ok_or_else(list_not_found)?;
    let party = ensure_visible(list_party(&list, auth))?;
    Ok((list, party))
}

/// Customer submits a draft. The list is auto-assigned in the same transaction.
pub async fn submit(state: &AppState, auth: &AuthContext, list_id: Uuid) -> SoukResult<ShoppingList> {
    let mut tx = state.db.pool.begin().await?;
    let list = shopping_lists::find_by_id(&mut *tx, list_id)
        .await?
        .ok_or_else(list_not_found)?;
    let party = ensure_visible(list_party(&list, auth))?;
    check_transition(list.status, ShoppingListStatus::Submitted, party)?;

    if shopping_lists::count_items(&mut *tx, list.id).await? == 0 {
        return Err(SoukError::bad_request(
            "Add at least one item before submitting",
        ));
    }

    let mut submitted = shopping_lists::set_status(
        &mut *tx,
        list.id,
        list.status,
        ShoppingListStatus::Submitted,
        Some(Utc::now()),
    )
    .await?
    .ok_or_else(list_changed)?;
    status_changes::record(
        &mut *tx,
        StatusEntity::ShoppingList,
        list.id,
        Some(list.status.as_str()),
        ShoppingListStatus::Submitted.as_str(),
        Some(auth.user_id),
        None,
    )
    .await?;

    let candidates = agents::assignment_candidates(&mut *tx).await?;
    if let Some(agent_id) = agents::choose_agent(&candidates, submitted.market_id, &[]) {
        submitted = shopping_lists::set_agent(&mut *tx, list.id, Some(agent_id))
            .await?
            .ok_or_else(list_changed)?;
    }
    tx.commit().await?;

    tracing::info!(
        list_id = %submitted.id,
        agent_id = ?submitted.agent_id,
        "Shopping list submitted"
    );
    announce_assignment(state, &submitted).await;
    Ok(submitted)
}

/// Assigned agent accepts, starts or completes a list.
///
/// Starting and completing by hand need an open, paid order behind the list;
/// without one the list could leave `accepted` before checkout and strand the
/// customer.
pub async fn advance(
    state: &AppState,
    auth: &AuthContext,
    list_id: Uuid,
    target: ShoppingListStatus,
) -> SoukResult<ShoppingList> {
    let mut tx = state.db.pool.begin().await?;
    let list = shopping_lists::find_by_id(&mut *tx, list_id)
        .await?
        .ok_or_else(list_not_found)?;
    let party = ensure_visible(list_party(&list, auth))?;
    check_transition(list.status, target, party)?;

    if matches!(target, ShoppingListStatus::InProgress | ShoppingListStatus::Completed) {
        let paid = orders::find_open_for_list(&mut *tx, list.id)
            .await?
            .is_some_and(|o| o.payment_status == PaymentStatus::Paid && o.status != OrderStatus::Pending);
        if !paid {
            return Err(SoukError::Conflict {
                message: "Shopping list needs a paid, accepted order before shopping starts".into(),
            });
        }
    }

    let updated = shopping_lists::set_status(&mut *tx, list.id, list.status, target, None)
        .await?
        .ok_or_else(list_changed)?;
    status_changes::record(
        &mut *tx,
        StatusEntity::ShoppingList,
        list.id,
        Some(list.status.as_str()),
        target.as_str(),
        Some(auth.user_id),
        None,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(list_id = %updated.id, from = %list.status, to = %target, "Shopping list moved");

    let (title, body) = match target {
        ShoppingListStatus::Accepted => (
            "Shopping list accepted",
            format!("An agent accepted \"{}\". You can check out now.", updated.title),
        ),
        ShoppingListStatus::InProgress => (
            "Shopping started",
            format!("Your agent is shopping for \"{}\".", updated.title),
        ),
        _ => (
            "Shopping list completed",
            format!("\"{}\" has been completed.", updated.title),
        ),
    };
    notify_list_change(state, &updated, updated.customer_id, title, body).await;
    Ok(updated)
}

/// The assigned agent hands a submitted list back. It goes to the next
/// candidate, never back to the same agent.
pub async fn decline(state: &AppState, auth: &AuthContext, list_id: Uuid) -> SoukResult<ShoppingList> {
    let mut tx = state.db.pool.begin().await?;
    let list = shopping_lists::find_by_id(&mut *tx, list_id)
        .await?
        .ok_or_else(list_not_found)?;
    if ensure_visible(list_party(&list, auth))? != Party::Agent {
        return Err(SoukError::Forbidden);
    }
    if list.status != ShoppingListStatus::Submitted {
        return Err(SoukError::Conflict {
            message: "Only submitted shopping lists can be declined".into(),
        });
    }

    let candidates = agents::assignment_candidates(&mut *tx).await?;
    let next = agents::choose_agent(&candidates, list.market_id, &[auth.user_id]);
    let reassigned = shopping_lists::set_agent(&mut *tx, list.id, next)
        .await?
        .ok_or_else(list_changed)?;
    status_changes::record(
        &mut *tx,
        StatusEntity::ShoppingList,
        list.id,
        Some(list.status.as_str()),
        list.status.as_str(),
        Some(auth.user_id),
        Some("declined by agent"),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        list_id = %list.id,
        declined_by = %auth.user_id,
        next_agent = ?next,
        "Shopping list declined"
    );
    announce_assignment(state, &reassigned).await;
    Ok(reassigned)
}

/// Customer or admin cancels. An unpaid open order goes with it; a paid one
/// blocks the cancellation.
pub async fn cancel(
    state: &AppState,
    auth: &AuthContext,
    list_id: Uuid,
    reason: Option<&str>,
) -> SoukResult<ShoppingList> {
    let mut tx = state.db.pool.begin().await?;
    let list = shopping_lists::find_by_id(&mut *tx, list_id)
        .await?
        .ok_or_else(list_not_found)?;
    let party = ensure_visible(list_party(&list, auth))?;
    check_transition(list.status, ShoppingListStatus::Cancelled, party)?;

    if let Some(order) = orders::find_open_for_list(&mut *tx, list.id).await? {
        if order.payment_status == PaymentStatus::Paid {
            return Err(SoukError::Conflict {
                message: "This shopping list has a paid order; cancel the order instead".into(),
            });
        }
        check_transition(order.status, OrderStatus::Cancelled, Party::System)?;
        orders::update_status(
            &mut *tx,
            order.id,
            order.status,
            OrderStatus::Cancelled,
            None,
            None,
            reason,
        )
        .await?
        .ok_or_else(order_changed)?;
        status_changes::record(
            &mut *tx,
            StatusEntity::Order,
            order.id,
            Some(order.status.as_str()),
            OrderStatus::Cancelled.as_str(),
            Some(auth.user_id),
            Some("shopping list cancelled"),
        )
        .await?;
    }

    let cancelled = shopping_lists::set_status(
        &mut *tx,
        list.id,
        list.status,
        ShoppingListStatus::Cancelled,
        None,
    )
    .await?
    .ok_or_else(list_changed)?;
    status_changes::record(
        &mut *tx,
        StatusEntity::ShoppingList,
        list.id,
        Some(list.status.as_str()),
        ShoppingListStatus::Cancelled.as_str(),
        Some(auth.user_id),
        reason,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(list_id = %list.id, by = %auth.user_id, "Shopping list cancelled");

    if let Some(agent_id) = cancelled.agent_id {
        let body = format!("\"{}\" was cancelled.", cancelled.title);
        notify_list_change(state, &cancelled, agent_id, "Shopping list cancelled", body).await;
    }
    if party == Party::Admin {
        let body = format!("\"{}\" was cancelled by support.", cancelled.title);
        notify_list_change(state, &cancelled, cancelled.customer_id, "Shopping list cancelled", body)
            .await;
    }
    Ok(cancelled)
}

/// Admin hands a submitted list to a specific agent.
pub async fn assign(
    state: &AppState,
    auth: &AuthContext,
    list_id: Uuid,
    agent_id: Uuid,
) -> SoukResult<ShoppingList> {
    auth.require_admin()?;

    let mut tx = state.db.pool.begin().await?;
    let list = shopping_lists::find_by_id(&mut *tx, list_id)
        .await?
        .ok_or_else(list_not_found)?;
    if list.status != ShoppingListStatus::Submitted {
        return Err(SoukError::Conflict {
            message: "Only submitted shopping lists can be assigned".into(),
        });
    }

    let profile = agents::find_profile(&mut *tx, agent_id)
        .await?
        .ok_or_else(|| SoukError::not_found("Agent"))?;
    if !profile.can_take_work() {
        return Err(SoukError::bad_request(
            "Agent must be KYC-approved and available",
        ));
    }

    let assigned = shopping_lists::set_agent(&mut *tx, list.id, Some(agent_id))
        .await?
        .ok_or_else(list_changed)?;
    status_changes::record(
        &mut *tx,
        StatusEntity::ShoppingList,
        list.id,
        Some(list.status.as_str()),
        list.status.as_str(),
        Some(auth.user_id),
        Some("assigned by admin"),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(list_id = %list.id, agent_id = %agent_id, "Shopping list assigned by admin");
    announce_assignment(state, &assigned).await;
    Ok(assigned)
}

/// Tell the newly assigned agent, or log that nobody could take the list.
async fn announce_assignment(state: &AppState, list: &ShoppingList) {
    state.publish(list.customer_id, events::SHOPPING_LIST_UPDATE, list);
    match list.agent_id {
        Some(agent_id) => {
            state.publish(agent_id, events::SHOPPING_LIST_UPDATE, list);
            state
                .notifier
                .notify_quietly(
                    NewNotification::new(
                        agent_id,
                        NotificationKind::NewAssignment,
                        "New shopping list",
                        format!("You have been assigned \"{}\".", list.title),
                    )
                    .with_data(link("shopping_list_id", list.id)),
                )
                .await;
        }
        None => {
            tracing::warn!(list_id = %list.id, market_id = %list.market_id, "No agent available for shopping list");
        }
    }
}

async fn notify_list_change(
    state: &AppState,
    list: &ShoppingList,
    recipient: Uuid,
    title: &str,
    body: String,
) {
    state.publish(recipient, events::SHOPPING_LIST_UPDATE, list);
    state
        .notifier
        .notify_quietly(
            NewNotification::new(recipient, NotificationKind::ShoppingListUpdate, title, body)
                .with_data(link("shopping_list_id", list.id)),
        )
        .await;
}

/// Roles allowed to author shopping lists.
pub const AUTHORS: &[UserRole] = &[UserRole::Customer];
