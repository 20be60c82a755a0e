//! session_auth - Session cookie authentication core
//!
//! This crate decodes a session carried by a request, resolves it into an
//! application-defined user and decides whether the request is authenticated.
//! Sessions live either client side in an encrypted cookie or server side in a
//! [`SessionStore`] keyed by an opaque cookie id.
//!
//! The HTTP framework wiring lives in `session-auth-axum`; everything here only
//! depends on the `http` types.

mod auth;
mod authenticate;
mod backend;
mod config;
mod errors;
mod exclude;
mod openapi;
mod resolver;
mod session;
mod store;
mod utils;

pub use auth::{DEFAULT_OPENAPI_SECURITY_SCHEME_NAME, SessionAuth, SessionAuthBuilder};
pub use authenticate::{
    AuthenticationResult, NO_SESSION_DATA_FOUND, NO_USER_FOR_SESSION_FOUND, authenticate,
};
pub use backend::{CookieBackend, ServerSideBackend, SessionBackend};
pub use config::{
    CookieConfig, SESSION_COOKIE_MAX_AGE, SESSION_COOKIE_NAME, SESSION_COOKIE_SECURE, SameSite,
};
pub use errors::{AuthError, SessionError, StorageError};
pub use exclude::ExcludePatterns;
pub use openapi::{SESSION_COOKIE_SCHEME_DESCRIPTION, session_cookie_security_scheme};
pub use resolver::{Identity, RetrieveUserHandler};
pub use session::{SessionData, SessionHandle, SessionState};
pub use store::{MemoryStore, RedisStore, SessionStore};
pub use utils::gen_random_string;
