//! User presence: who is connected to the gateway right now, and when
//! everyone else was last seen.
//!
//! With Redis configured, `presence:{user_id}` marks a live session and expires
//! after `presence_ttl_secs` unless refreshed by a heartbeat, while
//! `last_seen:{user_id}` keeps the most recent activity time. Without Redis the
//! same data lives in a process-local map.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Last-seen keys outlive the long-offline window by a wide margin.
const LAST_SEEN_TTL_SECS: u64 = 60 * 60 * 24 * 90;

/// Snapshot of one user's presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Presence {
    pub online: bool,
    /// `None` if the user has never connected.
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    online_until: Option<DateTime<Utc>>,
    last_seen: DateTime<Utc>,
}

#[derive(Clone)]
enum Backend {
    Redis(ConnectionManager),
    Memory(Arc<RwLock<HashMap<Uuid, Entry>>>),
}

#[derive(Clone)]
pub struct PresenceStore {
    backend: Backend,
    ttl_secs: u64,
}

fn online_key(user_id: Uuid) -> String {
    format!("presence:{user_id}")
}

fn last_seen_key(user_id: Uuid) -> String {
    format!("last_seen:{user_id}")
}

impl PresenceStore {
    pub fn redis(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            backend: Backend::Redis(conn),
            ttl_secs,
        }
    }

    pub fn in_memory(ttl_secs: u64) -> Self {
        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(HashMap::new()))),
            ttl_secs,
        }
    }

    /// Redis when the database layer has a connection, otherwise in process.
    pub fn from_database(db: &crate::Database, ttl_secs: u64) -> Self {
        match &db.redis {
            Some(conn) => Self::redis(conn.clone(), ttl_secs),
            None => Self::in_memory(ttl_secs),
        }
    }

    /// Mark the user online. Called on identify and on every heartbeat.
    pub async fn touch(&self, user_id: Uuid) -> Result<(), redis::RedisError> {
        let now = Utc::now();
        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let stamp = now.to_rfc3339();
                let _: () = conn.set_ex(online_key(user_id), &stamp, self.ttl_secs).await?;
                let _: () = conn
                    .set_ex(last_seen_key(user_id), &stamp, LAST_SEEN_TTL_SECS)
                    .await?;
            }
            Backend::Memory(map) => {
                map.write().await.insert(
                    user_id,
                    Entry {
                        online_until: Some(now + Duration::seconds(self.ttl_secs as i64)),
                        last_seen: now,
                    },
                );
            }
        }
        Ok(())
    }

    /// Mark the user offline, recording now as their last-seen time.
    pub async fn mark_offline(&self, user_id: Uuid) -> Result<(), redis::RedisError> {
        self.mark_offline_at(user_id, Utc::now()).await
    }

    pub async fn mark_offline_at(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), redis::RedisError> {
        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let _: () = conn.del(online_key(user_id)).await?;
                let _: () = conn
                    .set_ex(last_seen_key(user_id), at.to_rfc3339(), LAST_SEEN_TTL_SECS)
                    .await?;
            }
            Backend::Memory(map) => {
                map.write().await.insert(
                    user_id,
                    Entry {
                        online_until: None,
                        last_seen: at,
                    },
                );
            }
        }
        Ok(())
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Presence, redis::RedisError> {
        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let online: bool = conn.exists(online_key(user_id)).await?;
                let last_seen: Option<String> = conn.get(last_seen_key(user_id)).await?;
                let last_seen = last_seen
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|d| d.with_timezone(&Utc));
                Ok(Presence { online, last_seen })
            }
            Backend::Memory(map) => {
                let now = Utc::now();
                Ok(map
                    .read()
                    .await
                    .get(&user_id)
                    .map(|e| Presence {
                        online: e.online_until.is_some_and(|until| until > now),
                        last_seen: Some(e.last_seen),
                    })
                    .unwrap_or_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_users_were_never_seen() {
        let store = PresenceStore::in_memory(120);
        let p = store.get(Uuid::now_v7()).await.unwrap();
        assert!(!p.online);
        assert!(p.last_seen.is_none());
    }

    #[tokio::test]
    async fn online_then_offline() {
        let store = PresenceStore::in_memory(120);
        let user = Uuid::now_v7();

        store.touch(user).await.unwrap();
        assert!(store.get(user).await.unwrap().online);

        let at = Utc::now() - Duration::hours(2);
        store.mark_offline_at(user, at).await.unwrap();
        let p = store.get(user).await.unwrap();
        assert!(!p.online);
        assert_eq!(p.last_seen, Some(at));
    }

    #[tokio::test]
    async fn expired_sessions_count_as_offline() {
        let store = PresenceStore::in_memory(0);
        let user = Uuid::now_v7();
        store.touch(user).await.unwrap();
        let p = store.get(user).await.unwrap();
        assert!(!p.online);
        assert!(p.last_seen.is_some());
    }
}
