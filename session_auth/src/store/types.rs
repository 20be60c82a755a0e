use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::session::SessionData;

/// Backing storage for server side sessions, keyed by session id
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Fetch the session data for `session_id`, `None` if missing or expired.
    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, StorageError>;

    /// Store session data, expiring after `ttl` seconds.
    async fn set(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl: u64,
    ) -> Result<(), StorageError>;

    /// Remove a session. Removing a missing session is not an error.
    async fn delete(&self, session_id: &str) -> Result<(), StorageError>;

    /// Remove every session held by this store.
    async fn delete_all(&self) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredSession {
    pub(crate) data: SessionData,
    pub(crate) expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub(crate) fn new(data: SessionData, ttl: u64) -> Self {
        let expires_at = i64::try_from(ttl)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { data, expires_at }
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stored_session_expiry() {
        let data = SessionData::try_from(json!({"id": 1})).unwrap();

        let live = StoredSession::new(data.clone(), 60);
        let expired = StoredSession::new(data, 0);

        assert!(!live.is_expired());
        assert!(expired.is_expired());
    }

    #[test]
    fn test_stored_session_huge_ttl_saturates() {
        let stored = StoredSession::new(SessionData::new(), u64::MAX);

        assert!(!stored.is_expired());
    }

    #[test]
    fn test_stored_session_serde() {
        let data = SessionData::try_from(json!({"name": "x"})).unwrap();
        let stored = StoredSession::new(data.clone(), 10);

        let json = serde_json::to_string(&stored).unwrap();
        let back: StoredSession = serde_json::from_str(&json).unwrap();

        assert_eq!(back.data, data);
        assert_eq!(back.expires_at, stored.expires_at);
    }
}
