//! Support tickets raised by any user and worked by admins.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use souk_common::error::{SoukError, SoukResult};
use souk_common::ids::generate_id;
use souk_common::models::notification::NotificationKind;
use souk_common::models::support::{
    CreateTicketRequest, SupportTicket, TicketCategory, TicketPriority, UpdateTicketRequest,
};
use souk_common::response::{PageParams, Paginated};
use souk_common::validation::validate_request;
use souk_db::repository::support;
use souk_notify::NewNotification;

use super::{created, max_page, ok, ApiResult, Created};
use crate::workflow::link;
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/support/tickets", get(list_tickets).post(create_ticket))
        .route(
            "/support/tickets/{ticket_id}",
            get(get_ticket).patch(update_ticket),
        )
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

async fn find_ticket(state: &AppState, auth: &AuthContext, ticket_id: Uuid) -> SoukResult<SupportTicket> {
    support::find_by_id(&state.db.pool, ticket_id)
        .await?
        .filter(|t| t.user_id == auth.user_id || auth.is_admin())
        .ok_or_else(|| SoukError::not_found("Ticket"))
}

/// POST /api/v0/support/tickets
async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateTicketRequest>,
) -> Created<SupportTicket> {
    validate_request(&body)?;
    let ticket = support::create_ticket(
        &state.db.pool,
        generate_id(),
        auth.user_id,
        body.subject.trim(),
        body.description.trim(),
        body.category.unwrap_or(TicketCategory::Other),
        body.priority.unwrap_or(TicketPriority::Medium),
    )
    .await?;
    tracing::info!(ticket_id = %ticket.id, user_id = %auth.user_id, "Support ticket opened");
    created("Ticket created", ticket)
}

/// GET /api/v0/support/tickets
///
/// Admins see every ticket.
async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<SupportTicket>> {
    let owner = (!auth.is_admin()).then_some(auth.user_id);
    let max = max_page();
    let (limit, offset) = page.limit_offset(max);
    let items = support::list(&state.db.pool, owner, limit, offset).await?;
    let total = support::count(&state.db.pool, owner).await?;
    ok("Tickets", Paginated::new(items, total, page, max))
}

/// GET /api/v0/support/tickets/{ticket_id}
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(ticket_id): Path<Uuid>,
) -> ApiResult<SupportTicket> {
    ok("Ticket", find_ticket(&state, &auth, ticket_id).await?)
}

/// PATCH /api/v0/support/tickets/{ticket_id}
async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<UpdateTicketRequest>,
) -> ApiResult<SupportTicket> {
    auth.require_admin()?;
    let ticket = support::update_ticket(&state.db.pool, ticket_id, body.status, body.assigned_to)
        .await?
        .ok_or_else(|| SoukError::not_found("Ticket"))?;

    if ticket.user_id != auth.user_id {
        state
            .notifier
            .notify_quietly(
                NewNotification::new(
                    ticket.user_id,
                    NotificationKind::SupportUpdate,
                    "Support ticket updated",
                    format!("\"{}\" is now {}.", ticket.subject, ticket.status),
                )
                .with_data(link("ticket_id", ticket.id)),
            )
            .await;
    }
    ok("Ticket updated", ticket)
}
