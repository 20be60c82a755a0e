use async_trait::async_trait;
use redis::{self, AsyncCommands};

use super::types::{SessionStore, StoredSession};
use crate::errors::StorageError;
use crate::session::SessionData;

const KEY_PREFIX: &str = "session";

/// Session store backed by redis. Expiry is delegated to redis `EXPIRE`.
#[derive(Debug, Clone)]
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// Open a client for `url` and verify the server answers
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)?;
        let store = Self { client };
        let _conn = store.client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to redis session store");
        Ok(store)
    }

    fn make_key(session_id: &str) -> String {
        format!("{KEY_PREFIX}:{session_id}")
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let value: Option<String> = conn.get(Self::make_key(session_id)).await?;

        match value {
            Some(v) => {
                let stored: StoredSession = serde_json::from_str(&v)?;
                Ok((!stored.is_expired()).then_some(stored.data))
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl: u64,
    ) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let key = Self::make_key(session_id);
        let value = serde_json::to_string(&StoredSession::new(data.clone(), ttl))?;
        let _: () = conn.set(&key, value).await?;
        let _: () = conn
            .expire(&key, i64::try_from(ttl).unwrap_or(i64::MAX))
            .await?;

        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let _: () = conn.del(Self::make_key(session_id)).await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let keys: Vec<String> = conn.keys(format!("{KEY_PREFIX}:*")).await?;
        if !keys.is_empty() {
            let _: () = conn.del(keys).await?;
        }
        Ok(())
    }
}
