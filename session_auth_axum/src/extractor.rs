use std::convert::Infallible;
use std::ops::Deref;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use http::request::Parts;

use session_auth::{AuthenticationResult, Identity, NO_SESSION_DATA_FOUND, SessionData};

use crate::error::HttpError;

/// The authenticated user, available as an Axum extractor behind
/// [`SessionAuthLayer`](crate::SessionAuthLayer).
///
/// Extraction fails with 401 on routes where no authentication ran, such as
/// excluded paths. Use `Option<AuthUser<U>>` there instead.
///
/// ```no_run
/// use session_auth_axum::{AuthUser, Identity};
///
/// #[derive(Clone)]
/// struct User { name: String }
/// impl Identity for User {}
///
/// async fn profile(AuthUser(user): AuthUser<User>) -> String {
///     format!("Hello, {}!", user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser<U>(pub U);

impl<U> Deref for AuthUser<U> {
    type Target = U;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, U> FromRequestParts<S> for AuthUser<U>
where
    S: Send + Sync,
    U: Identity,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticationResult<U>>()
            .map(|result| AuthUser(result.user.clone()))
            .ok_or_else(|| {
                tracing::debug!("No authenticated user on request");
                HttpError::unauthorized(NO_SESSION_DATA_FOUND)
            })
    }
}

impl<S, U> OptionalFromRequestParts<S> for AuthUser<U>
where
    S: Send + Sync,
    U: Identity,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthenticationResult<U>>()
            .map(|result| AuthUser(result.user.clone())))
    }
}

/// The full authentication result: user plus the session that proved it
#[derive(Debug, Clone)]
pub struct Auth<U>(pub AuthenticationResult<U>);

impl<U> Auth<U> {
    pub fn user(&self) -> &U {
        &self.0.user
    }

    pub fn session(&self) -> &SessionData {
        &self.0.auth
    }
}

impl<S, U> FromRequestParts<S> for Auth<U>
where
    S: Send + Sync,
    U: Identity,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticationResult<U>>()
            .cloned()
            .map(Auth)
            .ok_or_else(|| HttpError::unauthorized(NO_SESSION_DATA_FOUND))
    }
}
