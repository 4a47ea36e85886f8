//! In-process queue of scheduled notification emails.
//!
//! Jobs come out earliest `run_at` first; among jobs due at the same instant
//! the more urgent one goes first. Nothing is handed out before its `run_at`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use souk_common::models::notification::NotificationPriority;

/// One email to send for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailJob {
    pub notification_id: Uuid,
    pub user_id: Uuid,
    pub priority: NotificationPriority,
    pub run_at: DateTime<Utc>,
    /// Failed sends so far
    pub attempts: u32,
}

impl EmailJob {
    pub fn new(
        notification_id: Uuid,
        user_id: Uuid,
        priority: NotificationPriority,
        run_at: DateTime<Utc>,
    ) -> Self {
        Self {
            notification_id,
            user_id,
            priority,
            run_at,
            attempts: 0,
        }
    }
}

/// Heap entry. `BinaryHeap` is a max-heap, so "greater" means "runs sooner".
#[derive(Debug, PartialEq, Eq)]
struct Scheduled(EmailJob);

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .run_at
            .cmp(&self.0.run_at)
            .then_with(|| self.0.priority.rank().cmp(&other.0.priority.rank()))
            .then_with(|| other.0.notification_id.cmp(&self.0.notification_id))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
pub struct EmailQueue {
    heap: Mutex<BinaryHeap<Scheduled>>,
    wake: Notify,
}

impl EmailQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, job: EmailJob) {
        self.heap.lock().await.push(Scheduled(job));
        self.wake.notify_one();
    }

    /// Take the next job if it is due at `now`.
    pub async fn pop_due(&self, now: DateTime<Utc>) -> Option<EmailJob> {
        let mut heap = self.heap.lock().await;
        if heap.peek().is_some_and(|s| s.0.run_at <= now) {
            heap.pop().map(|s| s.0)
        } else {
            None
        }
    }

    /// When the earliest job becomes due.
    pub async fn next_run_at(&self) -> Option<DateTime<Utc>> {
        self.heap.lock().await.peek().map(|s| s.0.run_at)
    }

    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }

    /// Resolves after the next `push`, or immediately if one happened since
    /// the last wait.
    pub async fn pushed(&self) {
        self.wake.notified().await
    }
}
