//! Dispatcher and email worker against an in-memory SQLite database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use souk_common::gateway_event::events;
use souk_common::models::notification::{NotificationKind, NotificationPriority};
use souk_common::models::user::{NotificationPreferences, UserRole};
use souk_db::presence::PresenceStore;
use souk_db::repository::{notifications, preferences, users};
use souk_db::Database;
use souk_notify::{
    Email, EmailQueue, EmailWorker, JobOutcome, MailError, Mailer, NewNotification, Notifier,
    RoutingConfig,
};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

#[derive(Default)]
struct FailingMailer {
    calls: AtomicUsize,
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &Email) -> Result<(), MailError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MailError::Rejected { status: 503 })
    }
}

struct Harness {
    db: Database,
    presence: PresenceStore,
    queue: Arc<EmailQueue>,
    notifier: Notifier,
    events: broadcast::Receiver<souk_common::gateway_event::GatewayEvent>,
    user_id: Uuid,
}

async fn harness() -> Harness {
    let db = Database::connect_url("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();

    let user_id = Uuid::now_v7();
    users::create_user(
        &db.pool,
        &users::NewUser {
            id: user_id,
            email: "ada@example.com",
            phone: None,
            first_name: "Ada",
            last_name: "Obi",
            password_hash: "x",
            role: UserRole::Customer,
        },
    )
    .await
    .unwrap();

    let presence = PresenceStore::in_memory(120);
    let queue = Arc::new(EmailQueue::new());
    let (tx, events) = broadcast::channel(16);
    let notifier = Notifier::new(
        db.pool.clone(),
        presence.clone(),
        tx,
        queue.clone(),
        RoutingConfig::default(),
    );
    Harness {
        db,
        presence,
        queue,
        notifier,
        events,
        user_id,
    }
}

#[tokio::test]
async fn urgent_for_absent_user_pushes_and_emails_now() {
    let mut h = harness().await;
    let before = Utc::now();

    let n = h
        .notifier
        .notify(NewNotification::new(
            h.user_id,
            NotificationKind::NewAssignment,
            "New order",
            "You have a new order",
        ))
        .await
        .unwrap();

    assert_eq!(n.priority, NotificationPriority::Urgent);
    let scheduled = n.email_scheduled_for.unwrap();
    assert!(scheduled >= before - Duration::milliseconds(1) && scheduled <= Utc::now());

    let event = h.events.try_recv().unwrap();
    assert_eq!(event.event_type, events::NOTIFICATION_CREATE);
    assert_eq!(event.user_id, h.user_id);

    let stored = notifications::find_by_id(&h.db.pool, n.id).await.unwrap().unwrap();
    assert!(stored.push_sent_at.is_some());
    assert_eq!(h.queue.len().await, 1);

    let mailer = Arc::new(RecordingMailer::default());
    let worker = EmailWorker::new(h.db.pool.clone(), h.queue.clone(), mailer.clone(), "souk@test", 3, 1);
    assert_eq!(worker.drain_due().await, 1);

    let sent = mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");
    assert_eq!(sent[0].subject, "New order");
    let stored = notifications::find_by_id(&h.db.pool, n.id).await.unwrap().unwrap();
    assert!(stored.email_sent_at.is_some());
}

#[tokio::test]
async fn normal_for_online_user_is_push_only() {
    let mut h = harness().await;
    h.presence.touch(h.user_id).await.unwrap();

    let n = h
        .notifier
        .notify(NewNotification::new(
            h.user_id,
            NotificationKind::ChatMessage,
            "New message",
            "Hello",
        ))
        .await
        .unwrap();

    assert!(n.email_scheduled_for.is_none());
    assert!(h.events.try_recv().is_ok());
    assert!(h.queue.is_empty().await);
}

#[tokio::test]
async fn disabled_email_is_respected() {
    let h = harness().await;
    preferences::upsert(
        &h.db.pool,
        h.user_id,
        NotificationPreferences {
            push_enabled: true,
            email_enabled: false,
        },
    )
    .await
    .unwrap();

    let n = h
        .notifier
        .notify(NewNotification::new(
            h.user_id,
            NotificationKind::OrderUpdate,
            "Order accepted",
            "Your order was accepted",
        ))
        .await
        .unwrap();
    assert!(n.email_scheduled_for.is_none());
    assert!(h.queue.is_empty().await);
}

#[tokio::test]
async fn read_notifications_are_not_emailed() {
    let h = harness().await;
    let n = h
        .notifier
        .notify(NewNotification::new(
            h.user_id,
            NotificationKind::PaymentUpdate,
            "Payment received",
            "Thanks",
        ))
        .await
        .unwrap();
    assert!(notifications::mark_read(&h.db.pool, n.id, h.user_id).await.unwrap());

    let mailer = Arc::new(RecordingMailer::default());
    let worker = EmailWorker::new(h.db.pool.clone(), h.queue.clone(), mailer.clone(), "souk@test", 3, 1);
    let job = h.queue.pop_due(Utc::now() + Duration::hours(1)).await.unwrap();
    assert_eq!(worker.process(job).await.unwrap(), JobOutcome::Skipped);
    assert!(mailer.sent.lock().await.is_empty());
}

#[tokio::test]
async fn failures_back_off_then_give_up() {
    let h = harness().await;
    let n = h
        .notifier
        .notify(NewNotification::new(
            h.user_id,
            NotificationKind::NewAssignment,
            "New order",
            "Go",
        ))
        .await
        .unwrap();

    let mailer = Arc::new(FailingMailer::default());
    let worker = EmailWorker::new(h.db.pool.clone(), h.queue.clone(), mailer.clone(), "souk@test", 2, 30);
    assert_eq!(worker.backoff(1), Duration::seconds(30));
    assert_eq!(worker.backoff(3), Duration::seconds(120));

    let job = h.queue.pop_due(Utc::now()).await.unwrap();
    assert_eq!(worker.process(job).await.unwrap(), JobOutcome::Retried);
    assert!(h.queue.pop_due(Utc::now()).await.is_none(), "retry is delayed");

    let retry = h.queue.pop_due(Utc::now() + Duration::minutes(5)).await.unwrap();
    assert_eq!(retry.attempts, 1);
    assert_eq!(worker.process(retry).await.unwrap(), JobOutcome::GaveUp);
    assert_eq!(mailer.calls.load(Ordering::SeqCst), 2);

    let stored = notifications::find_by_id(&h.db.pool, n.id).await.unwrap().unwrap();
    assert!(stored.email_scheduled_for.is_none());
    assert!(stored.email_sent_at.is_none());
}

#[tokio::test]
async fn unsent_emails_are_recovered() {
    let h = harness().await;
    h.notifier
        .notify(NewNotification::new(
            h.user_id,
            NotificationKind::SupportUpdate,
            "Ticket updated",
            "We replied",
        ))
        .await
        .unwrap();
    // Never seen: low priority is emailed after the long-offline delay.
    assert_eq!(h.queue.len().await, 1);

    let fresh_queue = Arc::new(EmailQueue::new());
    let (tx, _rx) = broadcast::channel(4);
    let restarted = Notifier::new(
        h.db.pool.clone(),
        h.presence.clone(),
        tx,
        fresh_queue.clone(),
        RoutingConfig::default(),
    );
    assert_eq!(restarted.recover_pending().await.unwrap(), 1);
    assert_eq!(fresh_queue.len().await, 1);
}
