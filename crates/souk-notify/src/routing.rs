//! The delivery decision: given a notification's priority and where the user
//! is, should it be pushed, and when (if ever) should it also be emailed.
//!
//! | priority | online  | offline < recent | offline ≥ recent | offline ≥ long |
//! |----------|---------|------------------|------------------|----------------|
//! | urgent   | +5 min  | now              | now              | now            |
//! | high     | +15 min | +5 min           | now              | now            |
//! | normal   | —       | +30 min          | +10 min          | +10 min        |
//! | low      | —       | —                | —                | +60 min        |
//!
//! Delays and window sizes come from [`NotificationConfig`].

use chrono::{DateTime, Duration, Utc};

use souk_common::config::NotificationConfig;
use souk_common::models::notification::NotificationPriority;
use souk_common::models::user::NotificationPreferences;
use souk_db::presence::Presence;

/// Which column of the table a user falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceBucket {
    Online,
    RecentlyOffline,
    Away,
    LongGone,
}

/// Thresholds and delays, copied out of the config.
#[derive(Debug, Clone, Copy)]
pub struct RoutingConfig {
    pub recent_window: Duration,
    pub long_window: Duration,
    pub urgent_online: Duration,
    pub high_online: Duration,
    pub high_recent: Duration,
    pub normal_recent: Duration,
    pub normal_away: Duration,
    pub low_long: Duration,
}

impl From<&NotificationConfig> for RoutingConfig {
    fn from(c: &NotificationConfig) -> Self {
        Self {
            recent_window: Duration::minutes(c.recent_offline_mins),
            long_window: Duration::hours(c.long_offline_hours),
            urgent_online: Duration::minutes(c.urgent_online_delay_mins),
            high_online: Duration::minutes(c.high_online_delay_mins),
            high_recent: Duration::minutes(c.high_recent_delay_mins),
            normal_recent: Duration::minutes(c.normal_recent_delay_mins),
            normal_away: Duration::minutes(c.normal_away_delay_mins),
            low_long: Duration::minutes(c.low_long_delay_mins),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            recent_window: Duration::minutes(30),
            long_window: Duration::hours(24),
            urgent_online: Duration::minutes(5),
            high_online: Duration::minutes(15),
            high_recent: Duration::minutes(5),
            normal_recent: Duration::minutes(30),
            normal_away: Duration::minutes(10),
            low_long: Duration::minutes(60),
        }
    }
}

impl RoutingConfig {
    pub fn bucket(&self, presence: Presence, now: DateTime<Utc>) -> PresenceBucket {
        if presence.online {
            return PresenceBucket::Online;
        }
        match presence.last_seen {
            None => PresenceBucket::LongGone,
            Some(seen) => {
                let away = now - seen;
                if away >= self.long_window {
                    PresenceBucket::LongGone
                } else if away >= self.recent_window {
                    PresenceBucket::Away
                } else {
                    PresenceBucket::RecentlyOffline
                }
            }
        }
    }

    /// Email delay for a priority and bucket; `None` means no email.
    pub fn email_delay(&self, priority: NotificationPriority, bucket: PresenceBucket) -> Option<Duration> {
        use NotificationPriority::*;
        use PresenceBucket::*;
        match (priority, bucket) {
            (Urgent, Online) => Some(self.urgent_online),
            (Urgent, _) => Some(Duration::zero()),
            (High, Online) => Some(self.high_online),
            (High, RecentlyOffline) => Some(self.high_recent),
            (High, Away | LongGone) => Some(Duration::zero()),
            (Normal, Online) => None,
            (Normal, RecentlyOffline) => Some(self.normal_recent),
            (Normal, Away | LongGone) => Some(self.normal_away),
            (Low, LongGone) => Some(self.low_long),
            (Low, _) => None,
        }
    }
}

/// What to do with one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub push: bool,
    /// When to send the email, if at all
    pub email_at: Option<DateTime<Utc>>,
}

/// Decide push and email delivery.
///
/// Urgent notifications are pushed even if the user turned push off.
/// No email is planned when email is disabled or the user has no address.
pub fn plan(
    cfg: &RoutingConfig,
    priority: NotificationPriority,
    presence: Presence,
    prefs: NotificationPreferences,
    has_email: bool,
    now: DateTime<Utc>,
) -> DeliveryPlan {
    let push = prefs.push_enabled || priority == NotificationPriority::Urgent;
    let email_at = if prefs.email_enabled && has_email {
        cfg.email_delay(priority, cfg.bucket(presence, now))
            .map(|delay| now + delay)
    } else {
        None
    };
    DeliveryPlan { push, email_at }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NotificationPriority::*;

    fn at(now: DateTime<Utc>, mins_ago: i64) -> Presence {
        Presence {
            online: false,
            last_seen: Some(now - Duration::minutes(mins_ago)),
        }
    }

    fn delay(priority: NotificationPriority, presence: Presence, now: DateTime<Utc>) -> Option<i64> {
        let p = plan(
            &RoutingConfig::default(),
            priority,
            presence,
            NotificationPreferences::default(),
            true,
            now,
        );
        p.email_at.map(|t| (t - now).num_minutes())
    }

    #[test]
    fn buckets_follow_windows() {
        let cfg = RoutingConfig::default();
        let now = Utc::now();
        let online = Presence {
            online: true,
            last_seen: Some(now),
        };
        assert_eq!(cfg.bucket(online, now), PresenceBucket::Online);
        assert_eq!(cfg.bucket(at(now, 29), now), PresenceBucket::RecentlyOffline);
        assert_eq!(cfg.bucket(at(now, 30), now), PresenceBucket::Away);
        assert_eq!(cfg.bucket(at(now, 24 * 60), now), PresenceBucket::LongGone);
        assert_eq!(cfg.bucket(Presence::default(), now), PresenceBucket::LongGone);
    }

    #[test]
    fn email_table() {
        let now = Utc::now();
        let online = Presence {
            online: true,
            last_seen: Some(now),
        };
        let recent = at(now, 5);
        let away = at(now, 120);
        let gone = at(now, 3 * 24 * 60);

        let expected = [
            (Urgent, [Some(5), Some(0), Some(0), Some(0)]),
            (High, [Some(15), Some(5), Some(0), Some(0)]),
            (Normal, [None, Some(30), Some(10), Some(10)]),
            (Low, [None, None, None, Some(60)]),
        ];
        for (priority, row) in expected {
            let got = [
                delay(priority, online, now),
                delay(priority, recent, now),
                delay(priority, away, now),
                delay(priority, gone, now),
            ];
            assert_eq!(got, row, "{priority}");
        }
    }

    #[test]
    fn never_seen_users_are_long_gone() {
        let now = Utc::now();
        assert_eq!(delay(Low, Presence::default(), now), Some(60));
    }

    #[test]
    fn preferences_gate_delivery() {
        let cfg = RoutingConfig::default();
        let now = Utc::now();
        let off = NotificationPreferences {
            push_enabled: false,
            email_enabled: false,
        };

        let normal = plan(&cfg, Normal, at(now, 120), off, true, now);
        assert!(!normal.push);
        assert!(normal.email_at.is_none());

        let urgent = plan(&cfg, Urgent, at(now, 120), off, true, now);
        assert!(urgent.push, "urgent always pushes");
        assert!(urgent.email_at.is_none());
    }

    #[test]
    fn no_address_means_no_email() {
        let cfg = RoutingConfig::default();
        let now = Utc::now();
        let p = plan(
            &cfg,
            Urgent,
            Presence::default(),
            NotificationPreferences::default(),
            false,
            now,
        );
        assert!(p.push);
        assert!(p.email_at.is_none());
    }

    #[test]
    fn delays_come_from_config() {
        let cfg = RoutingConfig {
            urgent_online: Duration::minutes(1),
            ..RoutingConfig::default()
        };
        let now = Utc::now();
        let online = Presence {
            online: true,
            last_seen: Some(now),
        };
        let p = plan(&cfg, Urgent, online, NotificationPreferences::default(), true, now);
        assert_eq!(p.email_at, Some(now + Duration::minutes(1)));
    }
}
