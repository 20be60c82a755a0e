mod cookie;
mod cookies;
mod server_side;

use async_trait::async_trait;
use http::HeaderMap;

use crate::config::CookieConfig;
use crate::errors::SessionError;
use crate::session::SessionState;

pub use cookie::CookieBackend;
pub use server_side::ServerSideBackend;

/// Decodes the session carried by a request and encodes it back into the
/// response.
#[async_trait]
pub trait SessionBackend: Send + Sync + 'static {
    /// Decode the session from the request headers.
    ///
    /// A missing, tampered or expired token yields `SessionState::Absent`;
    /// errors are reserved for backend failures.
    async fn load(&self, request_headers: &HeaderMap) -> Result<SessionState, SessionError>;

    /// Write `Set-Cookie` headers for the final session state.
    ///
    /// `SessionState::Cleared` always produces a clearing cookie.
    async fn store(
        &self,
        request_headers: &HeaderMap,
        state: &SessionState,
        response_headers: &mut HeaderMap,
    ) -> Result<(), SessionError>;

    fn cookie_config(&self) -> &CookieConfig;
}
