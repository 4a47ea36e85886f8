//! Checkout and order transitions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use souk_common::config;
use souk_common::error::{SoukError, SoukResult};
use souk_common::gateway_event::events;
use souk_common::ids::{generate_id, order_number};
use souk_common::models::notification::NotificationKind;
use souk_common::models::order::{
    CreateOrderRequest, Order, OrderStatus, OrderTotals, PaymentStatus, StatusEntity,
};
use souk_common::models::shopping_list::ShoppingListStatus;
use souk_common::models::workflow::{check_transition, Party, StatusMachine};
use souk_db::repository::{addresses, agents, orders, shopping_lists, status_changes};
use souk_notify::NewNotification;

use super::{
    ensure_visible, link, list_changed, list_not_found, list_party, order_changed, order_not_found,
    order_party,
};
use crate::{middleware::AuthContext, AppState};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Load an order the caller takes part in.
pub async fn load_visible(state: &AppState, auth: &AuthContext, order_id: Uuid) -> SoukResult<(Order, Party)> {
    let order = orders::find_by_id(&state.db.pool, order_id)
        .await?
        .ok_or_else(order_not_found)?;
    let party = ensure_visible(order_party(&order, auth))?;
    Ok((order, party))
}

/// Turn an accepted shopping list into a pending, unpaid order.
pub async fn checkout(state: &AppState, auth: &AuthContext, req: &CreateOrderRequest) -> SoukResult<Order> {
    let pricing = &config::get().pricing;

    let mut tx = state.db.pool.begin().await?;
    let list = shopping_lists::find_by_id(&mut *tx, req.shopping_list_id)
        .await?
        .ok_or_else(list_not_found)?;
    if list_party(&list, auth) != Party::Customer {
        return Err(SoukError::Forbidden);
    }
    if list.status != ShoppingListStatus::Accepted {
        return Err(SoukError::Conflict {
            message: "Shopping list must be accepted by an agent before checkout".into(),
        });
    }
    let agent_id = list.agent_id.ok_or_else(|| SoukError::Conflict {
        message: "Shopping list has no agent".into(),
    })?;
    if orders::find_open_for_list(&mut *tx, list.id).await?.is_some() {
        return Err(open_order_exists());
    }

    let delivery_address_id = req.delivery_address_id.or(list.delivery_address_id);
    if let Some(address_id) = delivery_address_id {
        let owned = addresses::find_by_id(&mut *tx, address_id)
            .await?
            .is_some_and(|a| a.user_id == auth.user_id);
        if !owned {
            return Err(SoukError::not_found("Address"));
        }
    }

    let items = shopping_lists::list_items(&mut *tx, list.id).await?;
    let totals = OrderTotals::compute(&items, pricing.service_fee_bps, pricing.delivery_fee)?;

    let id = generate_id();
    let now = Utc::now();
    let number = fresh_order_number(&mut tx, id, now).await?;
    let order = orders::create_order(
        &mut *tx,
        &Order {
            id,
            order_number: number,
            customer_id: list.customer_id,
            agent_id,
            shopping_list_id: list.id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            subtotal: totals.subtotal,
            service_fee: totals.service_fee,
            delivery_fee: totals.delivery_fee,
            total_amount: totals.total_amount,
            delivery_address_id,
            cancel_reason: None,
            accepted_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| {
        if orders::is_open_order_conflict(&e) {
            open_order_exists()
        } else {
            e.into()
        }
    })?;
    status_changes::record(
        &mut *tx,
        StatusEntity::Order,
        order.id,
        None,
        OrderStatus::Pending.as_str(),
        Some(auth.user_id),
        None,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = order.total_amount,
        "Order created"
    );

    state.publish(order.agent_id, events::ORDER_UPDATE, &order);
    state
        .notifier
        .notify_quietly(
            NewNotification::new(
                order.agent_id,
                NotificationKind::NewAssignment,
                "New order",
                format!(
                    "Order {} for \"{}\" is waiting for payment.",
                    order.order_number, list.title
                ),
            )
            .with_data(link("order_id", order.id)),
        )
        .await;
    Ok(order)
}

fn open_order_exists() -> SoukError {
    SoukError::AlreadyExists {
        resource: "An active order for this shopping list".into(),
    }
}

/// Order numbers only carry 24 random bits per day; draw again on a clash.
async fn fresh_order_number(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    id: Uuid,
    now: DateTime<Utc>,
) -> SoukResult<String> {
    let mut number = order_number(id, now);
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        if !orders::order_number_taken(&mut **tx, &number).await? {
            return Ok(number);
        }
        tracing::debug!(order_number = %number, "Order number taken, drawing another");
        number = order_number(generate_id(), now);
    }
    Err(SoukError::Conflict {
        message: "Could not allocate an order number, please retry".into(),
    })
}

/// Move an order to `target` on behalf of the caller.
pub async fn transition(
    state: &AppState,
    auth: &AuthContext,
    order_id: Uuid,
    target: OrderStatus,
    reason: Option<&str>,
) -> SoukResult<Order> {
    let mut tx = state.db.pool.begin().await?;
    let order = orders::find_by_id(&mut *tx, order_id)
        .await?
        .ok_or_else(order_not_found)?;
    let party = ensure_visible(order_party(&order, auth))?;
    check_transition(order.status, target, party)?;

    if target == OrderStatus::Accepted && order.payment_status != PaymentStatus::Paid {
        return Err(SoukError::Conflict {
            message: "Order must be paid before it can be accepted".into(),
        });
    }

    let now = Utc::now();
    let updated = orders::update_status(
        &mut *tx,
        order.id,
        order.status,
        target,
        (target == OrderStatus::Accepted).then_some(now),
        (target == OrderStatus::Completed).then_some(now),
        reason.filter(|_| matches!(target, OrderStatus::Cancelled | OrderStatus::Rejected)),
    )
    .await?
    .ok_or_else(order_changed)?;
    status_changes::record(
        &mut *tx,
        StatusEntity::Order,
        order.id,
        Some(order.status.as_str()),
        target.as_str(),
        Some(auth.user_id),
        reason,
    )
    .await?;

    let list_target = match target {
        OrderStatus::InProgress | OrderStatus::Shopping => Some(ShoppingListStatus::InProgress),
        OrderStatus::Completed => Some(ShoppingListStatus::Completed),
        _ => None,
    };
    if let Some(list_target) = list_target {
        let list = shopping_lists::find_by_id(&mut *tx, order.shopping_list_id)
            .await?
            .ok_or_else(list_not_found)?;
        // The agent may already have moved the list by hand
        if list.status != list_target && list.status.can_transition_to(list_target) {
            let note = format!("order {target}");
            shopping_lists::set_status(&mut *tx, list.id, list.status, list_target, None)
                .await?
                .ok_or_else(list_changed)?;
            status_changes::record(
                &mut *tx,
                StatusEntity::ShoppingList,
                list.id,
                Some(list.status.as_str()),
                list_target.as_str(),
                None,
                Some(note.as_str()),
            )
            .await?;
        }
    }
    if target == OrderStatus::Completed {
        agents::increment_completed(&mut *tx, order.agent_id).await?;
    }
    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        from = %order.status,
        to = %target,
        by = %auth.user_id,
        "Order status changed"
    );

    let recipients: Vec<Uuid> = match party {
        Party::Agent => vec![updated.customer_id],
        Party::Customer => vec![updated.agent_id],
        _ => vec![updated.customer_id, updated.agent_id],
    };
    for recipient in recipients {
        state.publish(recipient, events::ORDER_UPDATE, &updated);
        state
            .notifier
            .notify_quietly(
                NewNotification::new(
                    recipient,
                    NotificationKind::OrderUpdate,
                    format!("Order {}", humanize(target)),
                    format!("Order {} is now {}.", updated.order_number, humanize(target)),
                )
                .with_data(link("order_id", updated.id)),
            )
            .await;
    }
    Ok(updated)
}

fn humanize(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::Accepted => "accepted",
        OrderStatus::Rejected => "rejected",
        OrderStatus::InProgress => "in progress",
        OrderStatus::Shopping => "being shopped",
        OrderStatus::Completed => "completed",
        OrderStatus::Cancelled => "cancelled",
    }
}
