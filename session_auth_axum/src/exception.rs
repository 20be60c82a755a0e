use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use futures_util::FutureExt;
use tower::{Layer, Service};

use session_auth::AuthError;

use crate::app::{AppContext, RequestHead};
use crate::error::HttpError;

/// Middle stage: turns errors and panics from the stages below into
/// responses through the application's handler registry. Nothing below
/// this layer reaches the transport as a raw fault.
#[derive(Clone)]
pub struct ExceptionHandlerLayer {
    app: Arc<AppContext>,
}

impl ExceptionHandlerLayer {
    pub fn new(app: Arc<AppContext>) -> Self {
        Self { app }
    }
}

impl<S> Layer<S> for ExceptionHandlerLayer {
    type Service = ExceptionHandlerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionHandlerService {
            inner,
            app: self.app.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ExceptionHandlerService<S> {
    inner: S,
    app: Arc<AppContext>,
}

impl<S> Service<Request> for ExceptionHandlerService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Error: Into<AuthError>,
    S::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness errors resurface from `call`
        self.inner.poll_ready(cx).map(|_| Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let app = self.app.clone();
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(async move {
            let head = RequestHead::from_request(&request);

            let outcome = AssertUnwindSafe(async move { ready_inner.call(request).await })
                .catch_unwind()
                .await;

            let error = match outcome {
                Ok(Ok(mut response)) => {
                    // Errors rendered by extractors or handlers below
                    match response.extensions_mut().remove::<HttpError>() {
                        Some(error) if app.exception_handlers().get(error.status).is_some() => {
                            error
                        }
                        _ => return Ok(response),
                    }
                }
                Ok(Err(e)) => {
                    let e: AuthError = e.into();
                    if e.is_not_authorized() {
                        tracing::debug!("Request not authorized: {e}");
                    }
                    HttpError::from_auth_error(&e, app.debug())
                }
                Err(payload) => HttpError::from_panic(payload, app.debug()),
            };

            Ok(app.respond(&head, error))
        })
    }
}
