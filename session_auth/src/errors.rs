use std::convert::Infallible;

use http::StatusCode;
use thiserror::Error;

/// Failure of a server side session store
#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    /// A stored record that no longer decodes as a session
    #[error("Stored session is corrupt: {0}")]
    Corrupt(String),
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),

    /// Error from the server side session store
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// Outcome of a failed pass through the authentication pipeline.
///
/// `NotAuthorized` is the rejection signal produced by the decision procedure.
/// Every other variant is an unexpected fault.
#[derive(Debug, Error, Clone)]
pub enum AuthError {
    #[error("{0}")]
    NotAuthorized(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn not_authorized(reason: impl Into<String>) -> Self {
        Self::NotAuthorized(reason.into())
    }

    pub fn is_not_authorized(&self) -> bool {
        matches!(self, Self::NotAuthorized(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Infallible> for AuthError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}
