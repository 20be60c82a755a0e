//! session_auth_axum - Axum integration for session cookie authentication
//!
//! Installs the pipeline as a tower layer. On the first request the layer
//! assembles three stages around the protected routes and reuses them for
//! every later request:
//!
//! 1. [`SessionLayer`] decodes the session and writes it back to the response.
//! 2. [`ExceptionHandlerLayer`] turns rejections and faults into responses.
//! 3. [`AuthLayer`] resolves the session into a user, or rejects the request.
//!
//! Handlers read the result through the [`AuthUser`], [`Auth`] and [`Session`]
//! extractors.

mod app;
mod auth;
mod error;
mod exception;
mod extractor;
mod middleware;
mod session;

pub use app::{AppContext, ExceptionHandler, ExceptionHandlers, RequestHead};
pub use auth::{AuthLayer, AuthService};
pub use error::HttpError;
pub use exception::{ExceptionHandlerLayer, ExceptionHandlerService};
pub use extractor::{Auth, AuthUser};
pub use middleware::{SessionAuthExt, SessionAuthLayer, SessionAuthMiddleware, SessionAuthStack};
pub use session::{Session, SessionLayer, SessionService};

// Re-export the core crate so applications only depend on this one
pub use session_auth::{
    AuthError, AuthenticationResult, CookieBackend, CookieConfig, ExcludePatterns, Identity,
    MemoryStore, NO_SESSION_DATA_FOUND, NO_USER_FOR_SESSION_FOUND, RedisStore,
    RetrieveUserHandler, SameSite, ServerSideBackend, SessionAuth, SessionAuthBuilder,
    SessionBackend, SessionData, SessionError, SessionHandle, SessionState, SessionStore,
    StorageError, gen_random_string,
};
