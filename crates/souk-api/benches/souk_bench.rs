//! Criterion microbenchmarks for souk-api hot paths.
//!
//! Run with:
//!   cargo bench -p souk-api
//!
//! HTML reports are written to `target/criterion/`.

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

use souk_common::models::notification::NotificationPriority;
use souk_common::models::order::{OrderStatus, OrderTotals};
use souk_common::models::shopping_list::ShoppingListItem;
use souk_common::models::user::NotificationPreferences;
use souk_common::models::workflow::{check_transition, Party};
use souk_db::presence::Presence;
use souk_notify::routing::{plan, RoutingConfig};

// ── Checkout pricing ──────────────────────────────────────────────────────────

fn items(n: usize) -> Vec<ShoppingListItem> {
    let list = Uuid::now_v7();
    (0..n)
        .map(|i| ShoppingListItem {
            id: Uuid::now_v7(),
            shopping_list_id: list,
            product_id: None,
            name: format!("item {i}"),
            quantity: (i % 5 + 1) as i64,
            unit: Some("piece".into()),
            estimated_price: 25_000 + i as i64 * 100,
            actual_price: (i % 3 == 0).then_some(24_000),
            notes: None,
            created_at: Utc::now(),
        })
        .collect()
}

fn bench_order_totals(c: &mut Criterion) {
    let mut group = c.benchmark_group("checkout/totals");
    for n in [5usize, 50, 100] {
        let items = items(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &items, |b, items| {
            b.iter(|| OrderTotals::compute(black_box(items), 500, 150_000))
        });
    }
    group.finish();
}

// ── Status machine ────────────────────────────────────────────────────────────

fn bench_transition_check(c: &mut Criterion) {
    c.bench_function("workflow/order_transition", |b| {
        b.iter(|| {
            check_transition(
                black_box(OrderStatus::Accepted),
                black_box(OrderStatus::Shopping),
                black_box(Party::Agent),
            )
        })
    });
}

// ── Notification routing ──────────────────────────────────────────────────────

fn bench_delivery_plan(c: &mut Criterion) {
    let cfg = RoutingConfig::default();
    let now = Utc::now();
    let away = Presence {
        online: false,
        last_seen: Some(now - Duration::minutes(45)),
    };
    c.bench_function("notify/plan", |b| {
        b.iter(|| {
            plan(
                &cfg,
                black_box(NotificationPriority::High),
                black_box(away),
                NotificationPreferences::default(),
                true,
                now,
            )
        })
    });
}

// ── JSON ──────────────────────────────────────────────────────────────────────

fn bench_list_serialise(c: &mut Criterion) {
    let items = items(20);
    c.bench_function("json/list_items_serialise", |b| {
        b.iter(|| serde_json::to_string(black_box(&items)).unwrap())
    });
}

// ── Webhook signatures ────────────────────────────────────────────────────────

fn bench_webhook_sign(c: &mut Criterion) {
    let body = br#"{"reference":"PAY-0192A5E6E1B7","status":"paid","amount":570000}"#;
    c.bench_function("payments/webhook_sign", |b| {
        b.iter(|| souk_api::routes::payments::sign(b"whsec_bench", black_box(body)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_order_totals,
    bench_transition_check,
    bench_delivery_plan,
    bench_list_serialise,
    bench_webhook_sign,
);
criterion_main!(benches);
