use crate::errors::AuthError;
use crate::resolver::{Identity, RetrieveUserHandler};
use crate::session::{SessionData, SessionHandle};

pub const NO_SESSION_DATA_FOUND: &str = "no session data found";
pub const NO_USER_FOR_SESSION_FOUND: &str = "no user correlating to session found";

/// An authenticated request: the resolved user and the session that proved it
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticationResult<U> {
    pub user: U,
    pub auth: SessionData,
}

/// Decide whether the request carrying `session` is authenticated.
///
/// Rejections clear the session so the response carries a clearing cookie.
/// Errors raised by the resolver itself propagate unchanged and leave the
/// session as it was.
#[tracing::instrument(skip_all)]
pub async fn authenticate<U: Identity>(
    session: &SessionHandle,
    handler: &RetrieveUserHandler<U>,
) -> Result<AuthenticationResult<U>, AuthError> {
    let Some(data) = session.data().filter(|data| !data.is_empty()) else {
        tracing::debug!("Rejecting request: {NO_SESSION_DATA_FOUND}");
        session.clear();
        return Err(AuthError::not_authorized(NO_SESSION_DATA_FOUND));
    };

    match handler.retrieve(data.clone()).await? {
        Some(user) if user.is_truthy() => Ok(AuthenticationResult { user, auth: data }),
        _ => {
            tracing::debug!("Rejecting request: {NO_USER_FOR_SESSION_FOUND}");
            session.clear();
            Err(AuthError::not_authorized(NO_USER_FOR_SESSION_FOUND))
        }
    }
}
