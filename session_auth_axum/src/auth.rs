use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use tower::{Layer, Service};

use session_auth::{AuthError, Identity, SessionAuth, SessionHandle, authenticate};

/// Innermost stage: runs the authentication decision in front of the
/// protected handler, unless the path is excluded.
pub struct AuthLayer<U> {
    config: Arc<SessionAuth<U>>,
}

impl<U> Clone for AuthLayer<U> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl<U> AuthLayer<U> {
    pub fn new(config: Arc<SessionAuth<U>>) -> Self {
        Self { config }
    }
}

impl<S, U> Layer<S> for AuthLayer<U> {
    type Service = AuthService<S, U>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            config: self.config.clone(),
        }
    }
}

pub struct AuthService<S, U> {
    inner: S,
    config: Arc<SessionAuth<U>>,
}

impl<S: Clone, U> Clone for AuthService<S, U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, U> Service<Request> for AuthService<S, U>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Error: Into<AuthError>,
    S::Future: Send,
    U: Identity,
{
    type Response = Response;
    type Error = AuthError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let config = self.config.clone();
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(async move {
            if config.exclude().matches(request.uri().path()) {
                tracing::trace!(path = %request.uri().path(), "Path excluded from authentication");
                return ready_inner.call(request).await.map_err(Into::into);
            }

            let session = request
                .extensions()
                .get::<SessionHandle>()
                .cloned()
                .ok_or_else(|| {
                    AuthError::Internal(
                        "SessionHandle not found - session layer not configured".to_string(),
                    )
                })?;

            let result = authenticate(&session, config.retrieve_user_handler()).await?;
            request.extensions_mut().insert(result);

            ready_inner.call(request).await.map_err(Into::into)
        })
    }
}
