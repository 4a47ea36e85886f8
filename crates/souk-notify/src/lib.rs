//! # souk-notify
//!
//! Presence-aware notification delivery. Every notification is stored and,
//! depending on its priority and whether the user is connected, pushed over
//! the gateway immediately and/or emailed after a delay.

pub mod dispatcher;
pub mod mailer;
pub mod queue;
pub mod routing;

pub use dispatcher::{EmailWorker, JobOutcome, NewNotification, Notifier};
pub use mailer::{Email, HttpMailer, LogMailer, MailError, Mailer};
pub use queue::{EmailJob, EmailQueue};
pub use routing::{DeliveryPlan, PresenceBucket, RoutingConfig};
