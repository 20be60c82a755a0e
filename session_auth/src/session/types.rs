use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::errors::SessionError;

/// Decoded session contents: string keys mapped to arbitrary JSON values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData(Map<String, Value>);

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build session data from any value serializing to a JSON object
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, SessionError> {
        Self::try_from(serde_json::to_value(value)?)
    }

    /// Deserialize the whole mapping into `T`
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        self.0
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(SessionError::from)
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<Option<Value>, SessionError> {
        Ok(self.0.insert(key.into(), serde_json::to_value(value)?))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for SessionData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for SessionData {
    type Error = SessionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SessionError::Serde(format!(
                "session data must be a JSON object, got {other}"
            ))),
        }
    }
}

/// Session attached to a single request.
///
/// `Cleared` is the explicit "please clear" marker: it differs from `Absent`
/// (nothing was ever decoded) and from an empty `Data` mapping, and it makes
/// the backend emit a clearing cookie on the way out.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Absent,
    Cleared,
    Data(SessionData),
}

impl SessionState {
    /// False for `Absent`, `Cleared` and an empty mapping
    pub fn is_truthy(&self) -> bool {
        matches!(self, Self::Data(data) if !data.is_empty())
    }

    pub fn is_cleared(&self) -> bool {
        matches!(self, Self::Cleared)
    }

    pub fn data(&self) -> Option<&SessionData> {
        match self {
            Self::Data(data) => Some(data),
            Self::Absent | Self::Cleared => None,
        }
    }
}

impl From<SessionData> for SessionState {
    fn from(data: SessionData) -> Self {
        Self::Data(data)
    }
}
