use std::convert::Infallible;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::{FromRequestParts, Request};
use axum::response::Response;
use http::request::Parts;
use tower::{Layer, Service};

use session_auth::{SessionBackend, SessionHandle};

use crate::app::{AppContext, RequestHead};
use crate::error::HttpError;

/// Outermost stage: decodes the session before the request goes in and
/// encodes it back into the response on the way out.
#[derive(Clone)]
pub struct SessionLayer {
    backend: Arc<dyn SessionBackend>,
    app: Arc<AppContext>,
}

impl SessionLayer {
    pub fn new(backend: Arc<dyn SessionBackend>, app: Arc<AppContext>) -> Self {
        Self { backend, app }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            backend: self.backend.clone(),
            app: self.app.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SessionService<S> {
    inner: S,
    backend: Arc<dyn SessionBackend>,
    app: Arc<AppContext>,
}

impl<S> Service<Request> for SessionService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let backend = self.backend.clone();
        let app = self.app.clone();
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(async move {
            let head = RequestHead::from_request(&request);

            let state = match backend.load(request.headers()).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!("Failed to load session: {e}");
                    return Ok(app.respond(&head, HttpError::from_session_error(e, app.debug())));
                }
            };

            let session = SessionHandle::new(state);
            request.extensions_mut().insert(session.clone());

            let mut response = ready_inner.call(request).await?;

            let state = session.state();
            if let Err(e) = backend
                .store(&head.headers, &state, response.headers_mut())
                .await
            {
                tracing::error!("Failed to store session: {e}");
                return Ok(app.respond(&head, HttpError::from_session_error(e, app.debug())));
            }

            Ok(response)
        })
    }
}

/// The request's session, readable and writable by handlers
#[derive(Debug, Clone)]
pub struct Session(pub SessionHandle);

impl Deref for Session {
    type Target = SessionHandle;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .map(Session)
            .ok_or_else(|| {
                tracing::error!("Session handle not found - session layer not configured");
                HttpError::internal("Internal Server Error")
            })
    }
}
