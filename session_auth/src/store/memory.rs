use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::types::{SessionStore, StoredSession};
use crate::errors::StorageError;
use crate::session::SessionData;

/// In-process session store. Entries vanish when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entry: Mutex<HashMap<String, StoredSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session store");
        Self::default()
    }

    /// Number of sessions currently held, expired ones included
    pub async fn len(&self) -> usize {
        self.entry.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entry.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, StorageError> {
        let mut entry = self.entry.lock().await;
        match entry.get(session_id) {
            Some(stored) if stored.is_expired() => {
                tracing::debug!("Dropping expired session entry");
                entry.remove(session_id);
                Ok(None)
            }
            Some(stored) => Ok(Some(stored.data.clone())),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl: u64,
    ) -> Result<(), StorageError> {
        self.entry
            .lock()
            .await
            .insert(session_id.to_string(), StoredSession::new(data.clone(), ttl));
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StorageError> {
        self.entry.lock().await.remove(session_id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        self.entry.lock().await.clear();
        Ok(())
    }
}
