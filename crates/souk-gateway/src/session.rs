//! Connected gateway sessions, indexed by user.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub user_id: Uuid,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

/// A user may hold several sessions at once (phone and browser, say).
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
    user_sessions: RwLock<HashMap<Uuid, Vec<String>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session_id: &str, user_id: Uuid) {
        let now = Utc::now();
        self.sessions.write().await.insert(
            session_id.to_string(),
            Session {
                session_id: session_id.to_string(),
                user_id,
                connected_at: now,
                last_heartbeat: now,
            },
        );
        self.user_sessions
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(session_id.to_string());
    }

    /// Record a heartbeat. Returns the session's user, if it has identified.
    pub async fn heartbeat(&self, session_id: &str) -> Option<Uuid> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id)?;
        session.last_heartbeat = Utc::now();
        Some(session.user_id)
    }

    /// Drop a session. Returns its user and whether that was their last one.
    pub async fn remove(&self, session_id: &str) -> Option<(Uuid, bool)> {
        let session = self.sessions.write().await.remove(session_id)?;
        let mut by_user = self.user_sessions.write().await;
        let last = match by_user.get_mut(&session.user_id) {
            Some(ids) => {
                ids.retain(|s| s != session_id);
                ids.is_empty()
            }
            None => true,
        };
        if last {
            by_user.remove(&session.user_id);
        }
        Some((session.user_id, last))
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.user_sessions
            .read()
            .await
            .get(&user_id)
            .is_some_and(|ids| !ids.is_empty())
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_session_reports_user_gone() {
        let sessions = SessionManager::new();
        let user = Uuid::new_v4();
        sessions.register("phone", user).await;
        sessions.register("laptop", user).await;
        assert_eq!(sessions.active_count().await, 2);

        assert_eq!(sessions.remove("phone").await, Some((user, false)));
        assert!(sessions.is_online(user).await);

        assert_eq!(sessions.remove("laptop").await, Some((user, true)));
        assert!(!sessions.is_online(user).await);
        assert_eq!(sessions.remove("laptop").await, None);
    }

    #[tokio::test]
    async fn heartbeat_requires_a_known_session() {
        let sessions = SessionManager::new();
        let user = Uuid::new_v4();
        assert_eq!(sessions.heartbeat("nobody").await, None);

        sessions.register("s1", user).await;
        let before = sessions.get("s1").await.unwrap().last_heartbeat;
        assert_eq!(sessions.heartbeat("s1").await, Some(user));
        assert!(sessions.get("s1").await.unwrap().last_heartbeat >= before);
    }
}
