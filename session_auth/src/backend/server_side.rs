use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;

use super::SessionBackend;
use super::cookies::{CLEARED_COOKIE_VALUE, cookie_value, header_clear_cookie, header_set_cookie};
use crate::config::CookieConfig;
use crate::errors::SessionError;
use crate::session::SessionState;
use crate::store::SessionStore;
use crate::utils::gen_random_string;

const SESSION_ID_LENGTH: usize = 32;

/// Server side sessions: the cookie only carries an opaque session id and
/// the data lives in a [`SessionStore`].
#[derive(Clone)]
pub struct ServerSideBackend {
    store: Arc<dyn SessionStore>,
    config: CookieConfig,
}

impl std::fmt::Debug for ServerSideBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSideBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ServerSideBackend {
    pub fn new(store: Arc<dyn SessionStore>, config: CookieConfig) -> Self {
        Self { store, config }
    }

    pub fn store_handle(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        cookie_value(headers, &self.config.key)
            .filter(|id| !id.is_empty() && id != CLEARED_COOKIE_VALUE)
    }
}

#[async_trait]
impl SessionBackend for ServerSideBackend {
    #[tracing::instrument(skip_all, fields(key = %self.config.key))]
    async fn load(&self, request_headers: &HeaderMap) -> Result<SessionState, SessionError> {
        let Some(session_id) = self.session_id(request_headers) else {
            tracing::debug!("No session id cookie found");
            return Ok(SessionState::Absent);
        };

        match self.store.get(&session_id).await? {
            Some(data) => Ok(SessionState::Data(data)),
            None => {
                tracing::debug!("Session id not found in store");
                Ok(SessionState::Absent)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(key = %self.config.key))]
    async fn store(
        &self,
        request_headers: &HeaderMap,
        state: &SessionState,
        response_headers: &mut HeaderMap,
    ) -> Result<(), SessionError> {
        let existing = self.session_id(request_headers);

        match state {
            SessionState::Data(data) if !data.is_empty() => {
                // Only ids the store issued are kept; anything else is replaced
                let session_id = match existing {
                    Some(id) if self.store.get(&id).await?.is_some() => id,
                    _ => gen_random_string(SESSION_ID_LENGTH)?,
                };
                self.store
                    .set(&session_id, data, self.config.max_age)
                    .await?;
                header_set_cookie(response_headers, &self.config, &self.config.key, &session_id)?;
            }
            SessionState::Cleared => {
                if let Some(id) = existing {
                    self.store.delete(&id).await?;
                }
                header_clear_cookie(response_headers, &self.config, &self.config.key)?;
            }
            SessionState::Data(_) | SessionState::Absent => {
                if let Some(id) = existing {
                    self.store.delete(&id).await?;
                    header_clear_cookie(response_headers, &self.config, &self.config.key)?;
                }
            }
        }

        Ok(())
    }

    fn cookie_config(&self) -> &CookieConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionData;
    use crate::store::MemoryStore;
    use http::header::{COOKIE, HeaderValue, SET_COOKIE};
    use serde_json::json;

    fn setup() -> (Arc<MemoryStore>, ServerSideBackend) {
        let store = Arc::new(MemoryStore::new());
        let backend = ServerSideBackend::new(store.clone(), CookieConfig::default().with_key("sid"));
        (store, backend)
    }

    fn sample() -> SessionData {
        SessionData::try_from(json!({"id": "u1"})).unwrap()
    }

    fn request_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn issued_id(response: &HeaderMap) -> String {
        let cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
        let pair = cookie.split(';').next().unwrap();
        pair.strip_prefix("sid=").unwrap().to_string()
    }

    #[tokio::test]
    async fn test_new_session_issues_id_and_persists_data() {
        // Given an empty store
        let (store, backend) = setup();
        let mut response = HeaderMap::new();

        // When storing session data for a request without cookie
        backend
            .store(&HeaderMap::new(), &SessionState::Data(sample()), &mut response)
            .await
            .unwrap();

        // Then a fresh id is issued and the data is in the store
        let id = issued_id(&response);
        assert_eq!(id.len(), 43);
        assert_eq!(store.get(&id).await.unwrap(), Some(sample()));

        let state = backend.load(&request_with(&format!("sid={id}"))).await.unwrap();
        assert_eq!(state, SessionState::Data(sample()));
    }

    #[tokio::test]
    async fn test_existing_id_is_reused() {
        let (store, backend) = setup();
        store.set("known", &sample(), 60).await.unwrap();
        let mut response = HeaderMap::new();

        backend
            .store(&request_with("sid=known"), &SessionState::Data(sample()), &mut response)
            .await
            .unwrap();

        assert_eq!(issued_id(&response), "known");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_client_chosen_id_is_replaced_on_write() {
        // Given a request carrying an id the store never issued
        let (store, backend) = setup();
        let mut response = HeaderMap::new();

        // When a handler writes session data
        backend
            .store(
                &request_with("sid=attacker-chosen"),
                &SessionState::Data(sample()),
                &mut response,
            )
            .await
            .unwrap();

        // Then the data lives under a fresh id and the chosen one stays unused
        let id = issued_id(&response);
        assert_ne!(id, "attacker-chosen");
        assert_eq!(store.get(&id).await.unwrap(), Some(sample()));
        assert_eq!(store.get("attacker-chosen").await.unwrap(), None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_loads_absent() {
        let (_store, backend) = setup();

        let state = backend.load(&request_with("sid=unknown")).await.unwrap();

        assert_eq!(state, SessionState::Absent);
        assert_eq!(
            backend.load(&request_with("sid=null")).await.unwrap(),
            SessionState::Absent
        );
    }

    #[tokio::test]
    async fn test_cleared_deletes_entry_and_clears_cookie() {
        let (store, backend) = setup();
        store.set("known", &sample(), 60).await.unwrap();
        let mut response = HeaderMap::new();

        backend
            .store(&request_with("sid=known"), &SessionState::Cleared, &mut response)
            .await
            .unwrap();

        assert!(store.is_empty().await);
        let cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("sid=null"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_cleared_without_cookie_still_clears() {
        let (_store, backend) = setup();
        let mut response = HeaderMap::new();

        backend
            .store(&HeaderMap::new(), &SessionState::Cleared, &mut response)
            .await
            .unwrap();

        assert!(response.get(SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn test_absent_without_cookie_is_untouched() {
        let (store, backend) = setup();
        let mut response = HeaderMap::new();

        backend
            .store(&HeaderMap::new(), &SessionState::Absent, &mut response)
            .await
            .unwrap();

        assert!(response.get(SET_COOKIE).is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_emptied_session_is_deleted() {
        let (store, backend) = setup();
        store.set("known", &sample(), 60).await.unwrap();
        let mut response = HeaderMap::new();

        backend
            .store(
                &request_with("sid=known"),
                &SessionState::Data(SessionData::new()),
                &mut response,
            )
            .await
            .unwrap();

        assert!(store.is_empty().await);
        assert!(response.get(SET_COOKIE).is_some());
    }
}
