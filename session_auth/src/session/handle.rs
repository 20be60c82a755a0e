use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

use super::types::{SessionData, SessionState};
use crate::errors::SessionError;

/// Shared, request-scoped view of the session.
///
/// The session layer keeps one clone and reads the final state once the inner
/// service has produced a response; handlers and the authentication step
/// mutate it through their own clones.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub fn new(state: SessionState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Current mapping, `None` when absent or cleared
    pub fn data(&self) -> Option<SessionData> {
        self.state.lock().data().cloned()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.state.lock().data() {
            Some(data) => data.get(key),
            None => Ok(None),
        }
    }

    /// Replace the whole session mapping
    pub fn set(&self, data: SessionData) {
        *self.state.lock() = SessionState::Data(data);
    }

    pub fn set_from<T: Serialize>(&self, value: &T) -> Result<(), SessionError> {
        self.set(SessionData::from_serializable(value)?);
        Ok(())
    }

    /// Insert a single key, starting a fresh mapping if there is none
    pub fn insert<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        match &mut *state {
            SessionState::Data(data) => {
                data.insert(key, value)?;
            }
            SessionState::Absent | SessionState::Cleared => {
                let mut data = SessionData::new();
                data.insert(key, value)?;
                *state = SessionState::Data(data);
            }
        }
        Ok(())
    }

    /// Mark the session for clearing
    pub fn clear(&self) {
        *self.state.lock() = SessionState::Cleared;
    }

    pub fn is_cleared(&self) -> bool {
        self.state.lock().is_cleared()
    }

    pub fn replace(&self, state: SessionState) -> SessionState {
        std::mem::replace(&mut *self.state.lock(), state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clones_share_state() {
        // Given a handle and a clone of it
        let handle = SessionHandle::default();
        let clone = handle.clone();

        // When the clone sets data
        clone.insert("id", "abc").unwrap();

        // Then the original observes it
        assert_eq!(handle.get::<String>("id").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_clear_sets_sentinel() {
        let handle = SessionHandle::new(SessionState::Data(
            SessionData::try_from(json!({"id": 1})).unwrap(),
        ));

        handle.clear();

        assert!(handle.is_cleared());
        assert_eq!(handle.state(), SessionState::Cleared);
        assert!(handle.data().is_none());
    }

    #[test]
    fn test_insert_after_clear_starts_fresh_mapping() {
        let handle = SessionHandle::new(SessionState::Cleared);

        handle.insert("k", true).unwrap();

        let data = handle.data().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get::<bool>("k").unwrap(), Some(true));
    }

    #[test]
    fn test_replace_returns_previous_state() {
        let handle = SessionHandle::new(SessionState::Absent);

        let previous = handle.replace(SessionState::Cleared);

        assert_eq!(previous, SessionState::Absent);
        assert!(handle.is_cleared());
    }

    #[test]
    fn test_set_from_struct() {
        #[derive(Serialize)]
        struct Login<'a> {
            id: &'a str,
        }

        let handle = SessionHandle::default();
        handle.set_from(&Login { id: "u1" }).unwrap();

        assert_eq!(handle.get::<String>("id").unwrap().as_deref(), Some("u1"));
    }
}
