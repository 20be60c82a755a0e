use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use tower::{Layer, Service, ServiceExt};

use session_auth::{Identity, SessionAuth};

use crate::app::AppContext;
use crate::auth::{AuthLayer, AuthService};
use crate::exception::{ExceptionHandlerLayer, ExceptionHandlerService};
use crate::session::{SessionLayer, SessionService};

/// The assembled pipeline: session outermost, translator in the middle,
/// authentication innermost around the protected service.
pub type SessionAuthStack<S, U> = SessionService<ExceptionHandlerService<AuthService<S, U>>>;

/// Layer installing the session authentication pipeline.
///
/// ```no_run
/// use axum::{Router, routing::get};
/// use session_auth_axum::{AppContext, RetrieveUserHandler, SessionAuth, SessionAuthLayer};
///
/// let auth = SessionAuth::cookie([0u8; 32], RetrieveUserHandler::from_fn(|_| Some(true)))
///     .exclude("^/login")
///     .build()
///     .unwrap();
///
/// let app: Router = Router::new()
///     .route("/me", get(|| async { "me" }))
///     .route_layer(SessionAuthLayer::new(auth))
///     .layer(AppContext::new().layer());
/// ```
pub struct SessionAuthLayer<U> {
    config: Arc<SessionAuth<U>>,
}

impl<U> Clone for SessionAuthLayer<U> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl<U: Identity> SessionAuthLayer<U> {
    pub fn new(config: SessionAuth<U>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SessionAuth<U> {
        &self.config
    }
}

impl<U: Identity> From<SessionAuth<U>> for SessionAuthLayer<U> {
    fn from(config: SessionAuth<U>) -> Self {
        Self::new(config)
    }
}

impl<S, U> Layer<S> for SessionAuthLayer<U> {
    type Service = SessionAuthMiddleware<S, U>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionAuthMiddleware {
            inner,
            config: self.config.clone(),
            stack: Arc::new(OnceLock::new()),
        }
    }
}

/// Pipeline assembler.
///
/// The stack is built on the first request, from the [`AppContext`] that
/// request carries, and reused by every later request and every clone of
/// this service. Concurrent first requests wait for the single winner.
pub struct SessionAuthMiddleware<S, U> {
    inner: S,
    config: Arc<SessionAuth<U>>,
    stack: Arc<OnceLock<SessionAuthStack<S, U>>>,
}

impl<S: Clone, U> Clone for SessionAuthMiddleware<S, U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
            stack: self.stack.clone(),
        }
    }
}

impl<S, U> SessionAuthMiddleware<S, U> {
    pub fn is_assembled(&self) -> bool {
        self.stack.get().is_some()
    }
}

impl<S, U> SessionAuthMiddleware<S, U>
where
    S: Clone,
    U: Identity,
{
    fn assemble(&self, app: Arc<AppContext>) -> SessionAuthStack<S, U> {
        tracing::info!(debug = app.debug(), "Assembling session auth pipeline");

        let auth = AuthLayer::new(self.config.clone()).layer(self.inner.clone());
        let exception = ExceptionHandlerLayer::new(app.clone()).layer(auth);
        SessionLayer::new(self.config.backend().clone(), app).layer(exception)
    }
}

impl<S, U> Service<Request> for SessionAuthMiddleware<S, U>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
    U: Identity,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness is driven per request on a clone of the assembled stack
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let stack = self
            .stack
            .get_or_init(|| {
                let app = request
                    .extensions()
                    .get::<Arc<AppContext>>()
                    .cloned()
                    .unwrap_or_default();
                self.assemble(app)
            })
            .clone();

        Box::pin(stack.oneshot(request))
    }
}

/// `.into_layer()` on a built configuration
pub trait SessionAuthExt<U> {
    fn into_layer(self) -> SessionAuthLayer<U>;
}

impl<U: Identity> SessionAuthExt<U> for SessionAuth<U> {
    fn into_layer(self) -> SessionAuthLayer<U> {
        SessionAuthLayer::new(self)
    }
}
