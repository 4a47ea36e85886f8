//! Authentication, authorization and input errors across the API surface.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;

use common::{spawn, PASSWORD, WEBHOOK_SECRET};
use souk_api::routes::payments::{sign, SIGNATURE_HEADER};

#[tokio::test]
async fn health_is_public() {
    let app = spawn().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn protected_routes_need_a_bearer_token() {
    let app = spawn().await;
    for uri in ["/orders", "/shopping-lists", "/notifications", "/users/me"] {
        let (status, _) = app.request(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
    let (status, _) = app.request(Method::GET, "/orders", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_tokens_are_not_access_tokens() {
    let app = spawn().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "email": "ada@souk.test",
                "password": PASSWORD,
                "first_name": "Ada",
                "last_name": "Obi",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "customer");
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = app.get("/users/me", &refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(Method::POST, "/auth/refresh", None, Some(json!({ "refresh_token": refresh })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["access_token"].is_string());
}

#[tokio::test]
async fn registration_rules() {
    let app = spawn().await;
    app.register("ada@souk.test", "customer").await;

    let register = |email: &'static str, role: &'static str| {
        json!({
            "email": email,
            "password": PASSWORD,
            "first_name": "Ada",
            "last_name": "Obi",
            "role": role,
        })
    };
    let (status, _) = app
        .request(Method::POST, "/auth/register", None, Some(register("ada@souk.test", "customer")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(Method::POST, "/auth/register", None, Some(register("root@souk.test", "admin")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@souk.test", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn suspended_users_cannot_log_in() {
    let app = spawn().await;
    let (customer_id, _) = app.register("ada@souk.test", "customer").await;
    let (admin_id, admin) = app.admin().await;

    let (status, _) = app.post_empty(&format!("/admin/users/{admin_id}/suspend"), &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post_empty(&format!("/admin/users/{customer_id}/suspend"), &admin).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "suspended");

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@souk.test", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_reject_other_roles() {
    let app = spawn().await;
    let (_, customer) = app.register("ada@souk.test", "customer").await;
    let (_, agent) = app.register("tunde@souk.test", "agent").await;

    for token in [&customer, &agent] {
        for uri in ["/admin/stats", "/admin/users", "/admin/orders", "/admin/kyc"] {
            let (status, _) = app.get(uri, token).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        }
    }

    let (_, admin) = app.admin().await;
    let (status, body) = app.get("/admin/stats", &admin).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["users"]["customer"], 1);
    assert_eq!(body["data"]["users"]["agent"], 1);
}

#[tokio::test]
async fn only_participants_see_a_list() {
    let app = spawn().await;
    let (_, owner) = app.register("ada@souk.test", "customer").await;
    let (_, other) = app.register("chidi@souk.test", "customer").await;
    let (_, agent) = app.register("tunde@souk.test", "agent").await;
    let market_id = app.market(&agent).await;
    let list_id = app.draft_list(&owner, market_id).await;

    let (status, _) = app.get(&format!("/shopping-lists/{list_id}"), &other).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Agents can't author lists
    let (status, _) = app
        .post(
            "/shopping-lists",
            &agent,
            json!({ "market_id": market_id, "title": "Mine", "items": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn customers_cannot_accept_their_own_list() {
    let app = spawn().await;
    let (_, customer) = app.register("ada@souk.test", "customer").await;
    let (_, agent) = app.register("tunde@souk.test", "agent").await;
    let market_id = app.market(&agent).await;
    let list_id = app.draft_list(&customer, market_id).await;

    // No verified agent is available, so the list stays unassigned
    let (status, body) = app.post_empty(&format!("/shopping-lists/{list_id}/submit"), &customer).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["agent_id"].is_null());

    let (status, _) = app.post_empty(&format!("/shopping-lists/{list_id}/accept"), &customer).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Submitted lists are frozen
    let (status, _) = app
        .patch(&format!("/shopping-lists/{list_id}"), &customer, json!({ "title": "Renamed" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn empty_lists_cannot_be_submitted() {
    let app = spawn().await;
    let (_, customer) = app.register("ada@souk.test", "customer").await;
    let (_, agent) = app.register("tunde@souk.test", "agent").await;
    let market_id = app.market(&agent).await;

    let (status, body) = app
        .post(
            "/shopping-lists",
            &customer,
            json!({ "market_id": market_id, "title": "Nothing yet", "items": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let list_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.post_empty(&format!("/shopping-lists/{list_id}/submit"), &customer).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unverified_agents_cannot_go_available() {
    let app = spawn().await;
    let (_, agent) = app.register("tunde@souk.test", "agent").await;
    let (status, _) = app
        .patch("/agents/me/availability", &agent, json!({ "is_available": true }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_requires_a_valid_signature() {
    let app = spawn().await;
    let payload = json!({ "reference": "PAY-UNKNOWN", "status": "paid" }).to_string();

    let unsigned = Request::builder()
        .method(Method::POST)
        .uri("/api/v0/payments/webhook")
        .header("content-type", "application/json")
        .body(Body::from(payload.clone()))
        .unwrap();
    let (status, _) = app.send(unsigned).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = Request::builder()
        .method(Method::POST)
        .uri("/api/v0/payments/webhook")
        .header(SIGNATURE_HEADER, sign(b"wrong-secret", payload.as_bytes()).unwrap())
        .body(Body::from(payload.clone()))
        .unwrap();
    let (status, _) = app.send(forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correctly signed, but no such payment
    let signed = Request::builder()
        .method(Method::POST)
        .uri("/api/v0/payments/webhook")
        .header(SIGNATURE_HEADER, sign(WEBHOOK_SECRET.as_bytes(), payload.as_bytes()).unwrap())
        .body(Body::from(payload))
        .unwrap();
    let (status, _) = app.send(signed).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
