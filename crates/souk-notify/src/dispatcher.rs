//! Notification dispatch: persist, push over the gateway, schedule email.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::AnyPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use souk_common::error::{SoukError, SoukResult};
use souk_common::gateway_event::{events, GatewayEvent};
use souk_common::ids::generate_id;
use souk_common::models::notification::{Notification, NotificationKind, NotificationPriority};
use souk_db::presence::{Presence, PresenceStore};
use souk_db::repository::{notifications, preferences, users};

use crate::mailer::{Email, Mailer};
use crate::queue::{EmailJob, EmailQueue};
use crate::routing::{self, RoutingConfig};

/// Something a user should hear about.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    /// Defaults to the kind's priority
    pub priority: Option<NotificationPriority>,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl NewNotification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            priority: None,
            title: title.into(),
            body: body.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Cheap to clone; shared by every route handler.
#[derive(Clone)]
pub struct Notifier {
    pool: AnyPool,
    presence: PresenceStore,
    gateway_tx: broadcast::Sender<GatewayEvent>,
    queue: Arc<EmailQueue>,
    routing: RoutingConfig,
}

impl Notifier {
    pub fn new(
        pool: AnyPool,
        presence: PresenceStore,
        gateway_tx: broadcast::Sender<GatewayEvent>,
        queue: Arc<EmailQueue>,
        routing: RoutingConfig,
    ) -> Self {
        Self {
            pool,
            presence,
            gateway_tx,
            queue,
            routing,
        }
    }

    pub fn queue(&self) -> &Arc<EmailQueue> {
        &self.queue
    }

    /// Store the notification, push it if the plan says so and schedule its email.
    pub async fn notify(&self, new: NewNotification) -> SoukResult<Notification> {
        let user = users::find_by_id(&self.pool, new.user_id)
            .await?
            .ok_or_else(|| SoukError::not_found("User"))?;
        let prefs = preferences::get(&self.pool, new.user_id).await?;
        let presence = match self.presence.get(new.user_id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(user_id = %new.user_id, "Presence lookup failed, assuming offline: {e}");
                Presence::default()
            }
        };

        let now = Utc::now();
        let priority = new.priority.unwrap_or_else(|| new.kind.default_priority());
        let plan = routing::plan(
            &self.routing,
            priority,
            presence,
            prefs,
            !user.email.is_empty(),
            now,
        );

        let notification = notifications::create(
            &self.pool,
            &Notification {
                id: generate_id(),
                user_id: new.user_id,
                kind: new.kind,
                priority,
                title: new.title,
                body: new.body,
                data: new.data,
                read_at: None,
                push_sent_at: None,
                email_scheduled_for: plan.email_at,
                email_sent_at: None,
                created_at: now,
            },
        )
        .await?;

        if plan.push {
            let payload = serde_json::to_value(&notification).map_err(anyhow::Error::from)?;
            let event = GatewayEvent::to_user(notification.user_id, events::NOTIFICATION_CREATE, payload);
            // A send error only means no gateway session is listening.
            if self.gateway_tx.send(event).is_ok() {
                notifications::mark_push_sent(&self.pool, notification.id).await?;
            }
        }

        if let Some(run_at) = plan.email_at {
            self.queue
                .push(EmailJob::new(notification.id, notification.user_id, priority, run_at))
                .await;
        }

        tracing::debug!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            kind = %notification.kind,
            priority = %priority,
            online = presence.online,
            push = plan.push,
            email_at = ?plan.email_at,
            "Notification dispatched"
        );
        Ok(notification)
    }

    /// Fire-and-forget variant for use after a workflow commit: the change
    /// already happened, so a failed notification is logged, not returned.
    pub async fn notify_quietly(&self, new: NewNotification) {
        let user_id = new.user_id;
        let kind = new.kind;
        if let Err(e) = self.notify(new).await {
            tracing::error!(user_id = %user_id, kind = %kind, "Failed to dispatch notification: {e}");
        }
    }

    /// Re-queue emails that were scheduled but never sent (e.g. before a restart).
    pub async fn recover_pending(&self) -> SoukResult<usize> {
        let pending = notifications::pending_emails(&self.pool).await?;
        let count = pending.len();
        for n in pending {
            if let Some(run_at) = n.email_scheduled_for {
                self.queue
                    .push(EmailJob::new(n.id, n.user_id, n.priority, run_at))
                    .await;
            }
        }
        if count > 0 {
            tracing::info!(count, "Re-queued scheduled notification emails");
        }
        Ok(count)
    }
}

/// What happened to one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Sent,
    /// Read, deleted, already sent, or the user is gone
    Skipped,
    Retried,
    GaveUp,
}

/// Sends due emails.
pub struct EmailWorker {
    pool: AnyPool,
    queue: Arc<EmailQueue>,
    mailer: Arc<dyn Mailer>,
    from_address: String,
    max_attempts: u32,
    retry_base: Duration,
}

impl EmailWorker {
    pub fn new(
        pool: AnyPool,
        queue: Arc<EmailQueue>,
        mailer: Arc<dyn Mailer>,
        from_address: impl Into<String>,
        max_attempts: u32,
        retry_base_secs: u64,
    ) -> Self {
        Self {
            pool,
            queue,
            mailer,
            from_address: from_address.into(),
            max_attempts: max_attempts.max(1),
            retry_base: Duration::seconds(retry_base_secs as i64),
        }
    }

    /// Spawn the worker loop. Do not await the handle; it runs until the
    /// runtime shuts down.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Email worker started");
            loop {
                self.drain_due().await;
                let idle = match self.queue.next_run_at().await {
                    Some(at) => (at - Utc::now())
                        .to_std()
                        .unwrap_or_default()
                        .min(std::time::Duration::from_secs(60)),
                    None => std::time::Duration::from_secs(60),
                };
                tokio::select! {
                    _ = self.queue.pushed() => {}
                    _ = tokio::time::sleep(idle) => {}
                }
            }
        })
    }

    /// Process every job that is due now. Returns how many were handled.
    pub async fn drain_due(&self) -> usize {
        let mut handled = 0;
        while let Some(job) = self.queue.pop_due(Utc::now()).await {
            handled += 1;
            let notification_id = job.notification_id;
            match self.process(job).await {
                Ok(outcome) => {
                    tracing::debug!(notification_id = %notification_id, ?outcome, "Email job processed")
                }
                Err(e) => {
                    tracing::error!(notification_id = %notification_id, "Email job failed: {e}")
                }
            }
        }
        handled
    }

    pub async fn process(&self, mut job: EmailJob) -> SoukResult<JobOutcome> {
        let Some(notification) = notifications::find_by_id(&self.pool, job.notification_id).await? else {
            return Ok(JobOutcome::Skipped);
        };
        if notification.is_read() || notification.email_sent_at.is_some() {
            return Ok(JobOutcome::Skipped);
        }
        let Some(user) = users::find_by_id(&self.pool, job.user_id).await? else {
            notifications::cancel_email(&self.pool, notification.id).await?;
            return Ok(JobOutcome::Skipped);
        };

        let email = Email {
            from: self.from_address.clone(),
            to: user.email.clone(),
            subject: notification.title.clone(),
            text: format!("Hi {},\n\n{}\n\nThe Souk team", user.first_name, notification.body),
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                notifications::mark_email_sent(&self.pool, notification.id).await?;
                tracing::info!(notification_id = %notification.id, to = %email.to, "Notification email sent");
                Ok(JobOutcome::Sent)
            }
            Err(e) => {
                job.attempts += 1;
                if job.attempts >= self.max_attempts {
                    tracing::warn!(
                        notification_id = %notification.id,
                        attempts = job.attempts,
                        "Giving up on notification email: {e}"
                    );
                    notifications::cancel_email(&self.pool, notification.id).await?;
                    return Ok(JobOutcome::GaveUp);
                }
                let delay = self.backoff(job.attempts);
                job.run_at = Utc::now() + delay;
                tracing::warn!(
                    notification_id = %notification.id,
                    attempts = job.attempts,
                    retry_in_secs = delay.num_seconds(),
                    "Notification email failed, retrying: {e}"
                );
                notifications::reschedule_email(&self.pool, notification.id, job.run_at).await?;
                self.queue.push(job).await;
                Ok(JobOutcome::Retried)
            }
        }
    }

    /// `retry_base * 2^(attempts - 1)`, capped at 2^10 times the base.
    pub fn backoff(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(10);
        self.retry_base * (1_i32 << exponent)
    }
}
