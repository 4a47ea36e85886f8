//! Workflow edges: who may move an order, what a cancellation drags along,
//! and the limits that keep lists and totals sane.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{id_of, spawn, TestApp};
use souk_common::models::order::{Order, OrderStatus};
use souk_db::repository::orders;

/// Everyone involved in one accepted list.
struct Parties {
    customer: String,
    agent: String,
    admin: String,
    list_id: Uuid,
}

async fn accepted_list(app: &TestApp) -> Parties {
    let (_, customer) = app.register("ada@souk.test", "customer").await;
    let (_, agent) = app.register("tunde@souk.test", "agent").await;
    let (_, admin) = app.admin().await;
    let market_id = app.market(&agent).await;
    app.verify_agent(&agent, &admin, market_id).await;

    let list_id = app.draft_list(&customer, market_id).await;
    let (status, body) = app.post_empty(&format!("/shopping-lists/{list_id}/submit"), &customer).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, body) = app.post_empty(&format!("/shopping-lists/{list_id}/accept"), &agent).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    Parties {
        customer,
        agent,
        admin,
        list_id,
    }
}

async fn checkout(app: &TestApp, p: &Parties) -> Uuid {
    let (status, body) = app
        .post("/orders", &p.customer, json!({ "shopping_list_id": p.list_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body["data"])
}

async fn pay(app: &TestApp, p: &Parties, order_id: Uuid) {
    let (status, body) = app.post_empty(&format!("/orders/{order_id}/payments"), &p.customer).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let reference = body["data"]["reference"].as_str().unwrap().to_string();
    let (status, body) = app.post_empty(&format!("/payments/{reference}/confirm"), &p.admin).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

async fn list_status(app: &TestApp, p: &Parties) -> Value {
    let (status, body) = app.get(&format!("/shopping-lists/{}", p.list_id), &p.customer).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["status"].clone()
}

#[tokio::test]
async fn cancelling_a_list_takes_its_unpaid_order_along() {
    let app = spawn().await;
    let p = accepted_list(&app).await;
    let order_id = checkout(&app, &p).await;

    let (status, body) = app
        .post(&format!("/shopping-lists/{}/cancel", p.list_id), &p.customer, json!({ "reason": "changed my mind" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");

    let (_, body) = app.get(&format!("/orders/{order_id}"), &p.customer).await;
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["cancel_reason"], "changed my mind");

    let (_, body) = app.get(&format!("/orders/{order_id}/history"), &p.customer).await;
    let last = body["data"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["to_status"], "cancelled");
    assert_eq!(last["note"], "shopping list cancelled");
}

#[tokio::test]
async fn a_paid_order_blocks_list_cancellation() {
    let app = spawn().await;
    let p = accepted_list(&app).await;
    let order_id = checkout(&app, &p).await;
    pay(&app, &p, order_id).await;

    let (status, body) = app.post_empty(&format!("/shopping-lists/{}/cancel", p.list_id), &p.customer).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(list_status(&app, &p).await, "accepted");

    let (_, body) = app.get(&format!("/orders/{order_id}"), &p.customer).await;
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["payment_status"], "paid");

    let (status, body) = app.get("/admin/stats", &p.admin).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["paid_volume"], 696_000);
    assert_eq!(body["data"]["orders"]["pending"], 1);
}

#[tokio::test]
async fn customer_cancels_a_pending_order_and_can_check_out_again() {
    let app = spawn().await;
    let p = accepted_list(&app).await;
    let order_id = checkout(&app, &p).await;

    let (status, body) = app
        .post(&format!("/orders/{order_id}/cancel"), &p.customer, json!({ "reason": "wrong address" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["cancel_reason"], "wrong address");

    // Terminal: a second cancel is an invalid transition
    let (status, _) = app.post_empty(&format!("/orders/{order_id}/cancel"), &p.customer).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The list stays accepted, so a fresh order can be placed
    assert_eq!(list_status(&app, &p).await, "accepted");
    let second = checkout(&app, &p).await;
    assert_ne!(second, order_id);
}

#[tokio::test]
async fn admin_cancels_an_accepted_order() {
    let app = spawn().await;
    let p = accepted_list(&app).await;
    let order_id = checkout(&app, &p).await;
    pay(&app, &p, order_id).await;
    let (status, body) = app.post_empty(&format!("/orders/{order_id}/accept"), &p.agent).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // The agent can't cancel; they reject before accepting or finish the job
    let (status, _) = app.post_empty(&format!("/orders/{order_id}/cancel"), &p.agent).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(&format!("/orders/{order_id}/cancel"), &p.admin, json!({ "reason": "market closed" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");

    let (_, body) = app.get("/notifications", &p.agent).await;
    let titles: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["title"].as_str())
        .collect();
    assert!(titles.contains(&"Order cancelled"), "{titles:?}");
}

#[tokio::test]
async fn agent_rejects_a_pending_order_with_a_reason() {
    let app = spawn().await;
    let p = accepted_list(&app).await;
    let order_id = checkout(&app, &p).await;

    let (status, body) = app
        .post(&format!("/orders/{order_id}/reject"), &p.agent, json!({ "reason": "rice is out of stock" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["cancel_reason"], "rice is out of stock");

    let (status, _) = app.post_empty(&format!("/orders/{order_id}/accept"), &p.agent).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn only_the_agent_moves_an_order_forward() {
    let app = spawn().await;
    let p = accepted_list(&app).await;
    let order_id = checkout(&app, &p).await;
    pay(&app, &p, order_id).await;

    for action in ["accept", "reject", "complete"] {
        let (status, body) = app.post_empty(&format!("/orders/{order_id}/{action}"), &p.customer).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{action}: {body}");
    }
    let (status, _) = app.post_empty(&format!("/orders/{order_id}/accept"), &p.admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, outsider) = app.register("bisi@souk.test", "customer").await;
    let (status, _) = app.post_empty(&format!("/orders/{order_id}/cancel"), &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get(&format!("/orders/{order_id}"), &p.customer).await;
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn list_cannot_start_without_a_paid_accepted_order() {
    let app = spawn().await;
    let p = accepted_list(&app).await;

    for action in ["start", "complete"] {
        let (status, body) = app
            .post_empty(&format!("/shopping-lists/{}/{action}", p.list_id), &p.agent)
            .await;
        assert_eq!(status, StatusCode::CONFLICT, "{action}: {body}");
    }
    assert_eq!(list_status(&app, &p).await, "accepted");

    // Unpaid order: still refused
    let order_id = checkout(&app, &p).await;
    let (status, _) = app
        .post_empty(&format!("/shopping-lists/{}/start", p.list_id), &p.agent)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    pay(&app, &p, order_id).await;
    let (status, body) = app.post_empty(&format!("/orders/{order_id}/accept"), &p.agent).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app
        .post_empty(&format!("/shopping-lists/{}/start", p.list_id), &p.agent)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "in_progress");

    // The order catches up without touching the list again
    for action in ["shopping", "complete"] {
        let (status, body) = app.post_empty(&format!("/orders/{order_id}/{action}"), &p.agent).await;
        assert_eq!(status, StatusCode::OK, "{action}: {body}");
    }
    assert_eq!(list_status(&app, &p).await, "completed");
}

#[tokio::test]
async fn stale_status_updates_match_nothing() {
    let app = spawn().await;
    let p = accepted_list(&app).await;
    let order_id = checkout(&app, &p).await;
    let pool = &app.state.db.pool;

    let moved = orders::update_status(
        pool,
        order_id,
        OrderStatus::Accepted,
        OrderStatus::Shopping,
        None,
        None,
        None,
    )
    .await
    .unwrap();
    assert!(moved.is_none());

    let cancelled = orders::update_status(
        pool,
        order_id,
        OrderStatus::Pending,
        OrderStatus::Cancelled,
        None,
        None,
        Some("first"),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    // A second writer that read `pending` before the cancel lands loses
    let late = orders::update_status(
        pool,
        order_id,
        OrderStatus::Pending,
        OrderStatus::Rejected,
        None,
        None,
        Some("second"),
    )
    .await
    .unwrap();
    assert!(late.is_none());
    let stored = orders::find_by_id(pool, order_id).await.unwrap().unwrap();
    assert_eq!(stored.cancel_reason.as_deref(), Some("first"));
}

#[tokio::test]
async fn a_list_holds_one_open_order_at_a_time() {
    let app = spawn().await;
    let p = accepted_list(&app).await;
    let order_id = checkout(&app, &p).await;
    let pool = &app.state.db.pool;

    let existing = orders::find_by_id(pool, order_id).await.unwrap().unwrap();
    assert!(orders::order_number_taken(pool, &existing.order_number).await.unwrap());
    assert!(!orders::order_number_taken(pool, "SK-20260101-000000").await.unwrap());

    // Bypass the checkout pre-check and go straight at the table
    let duplicate = Order {
        id: Uuid::now_v7(),
        order_number: "SK-20260101-000000".into(),
        ..existing
    };
    let err = orders::create_order(pool, &duplicate).await.unwrap_err();
    assert!(orders::is_open_order_conflict(&err), "{err}");

    // Once the first order is closed the list may be ordered again
    orders::update_status(
        pool,
        order_id,
        OrderStatus::Pending,
        OrderStatus::Cancelled,
        None,
        None,
        None,
    )
    .await
    .unwrap()
    .unwrap();
    orders::create_order(pool, &duplicate).await.unwrap();
}

#[tokio::test]
async fn oversized_prices_are_rejected() {
    let app = spawn().await;
    let (_, customer) = app.register("ada@souk.test", "customer").await;
    let (_, agent) = app.register("tunde@souk.test", "agent").await;
    let market_id = app.market(&agent).await;

    // Two of these would wrap an i64 when totalled
    let (status, body) = app
        .post(
            "/shopping-lists",
            &customer,
            json!({
                "market_id": market_id,
                "title": "Gold",
                "items": [{ "name": "Bar", "quantity": 2, "estimated_price": 4_611_686_018_427_387_904_i64 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let list_id = app.draft_list(&customer, market_id).await;
    let (status, _) = app
        .post(
            &format!("/shopping-lists/{list_id}/items"),
            &customer,
            json!({ "name": "Bar", "quantity": 1, "estimated_price": 1_000_000_000_001_i64 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            &format!("/shopping-lists/{list_id}/items"),
            &customer,
            json!({ "name": "Bar", "quantity": 10_000, "estimated_price": 1_000_000_000_000_i64 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app.get(&format!("/shopping-lists/{list_id}"), &customer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["estimated_total"], 10_000_000_000_400_000_i64);
}

#[tokio::test]
async fn lists_stop_growing_at_the_item_limit() {
    let app = spawn().await;
    let (_, customer) = app.register("ada@souk.test", "customer").await;
    let (_, agent) = app.register("tunde@souk.test", "agent").await;
    let market_id = app.market(&agent).await;
    let limit = souk_common::config::get().limits.max_list_items as usize;

    let items = |n: usize| -> Vec<Value> {
        (0..n)
            .map(|i| json!({ "name": format!("Item {i}"), "quantity": 1, "estimated_price": 100 }))
            .collect()
    };

    let (status, body) = app
        .post(
            "/shopping-lists",
            &customer,
            json!({ "market_id": market_id, "title": "Too long", "items": items(limit + 1) }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = app
        .post(
            "/shopping-lists",
            &customer,
            json!({ "market_id": market_id, "title": "Full", "items": items(limit) }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let list_id = id_of(&body["data"]);

    let (status, body) = app
        .post(
            &format!("/shopping-lists/{list_id}/items"),
            &customer,
            json!({ "name": "One more", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
}
