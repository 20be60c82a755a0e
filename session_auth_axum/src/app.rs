use std::collections::HashMap;
use std::sync::Arc;

use axum::Extension;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, Method, Request, StatusCode, Uri};

use crate::error::HttpError;

/// The parts of the request an exception handler may look at
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            headers: req.headers().clone(),
        }
    }
}

pub type ExceptionHandler = Arc<dyn Fn(&RequestHead, &HttpError) -> Response + Send + Sync>;

/// Application error-handler registry, keyed by status code
#[derive(Clone, Default)]
pub struct ExceptionHandlers {
    by_status: HashMap<StatusCode, ExceptionHandler>,
    fallback: Option<ExceptionHandler>,
}

impl std::fmt::Debug for ExceptionHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionHandlers")
            .field("statuses", &self.by_status.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl ExceptionHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_status<F>(mut self, status: StatusCode, handler: F) -> Self
    where
        F: Fn(&RequestHead, &HttpError) -> Response + Send + Sync + 'static,
    {
        self.by_status.insert(status, Arc::new(handler));
        self
    }

    /// Handler for every status without a dedicated one
    pub fn fallback<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RequestHead, &HttpError) -> Response + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(handler));
        self
    }

    pub fn get(&self, status: StatusCode) -> Option<&ExceptionHandler> {
        self.by_status.get(&status).or(self.fallback.as_ref())
    }

    /// Render `error` through the registered handler, or the default JSON body
    pub fn handle(&self, head: &RequestHead, error: HttpError) -> Response {
        match self.get(error.status) {
            Some(handler) => handler(head, &error),
            None => error.into_response(),
        }
    }
}

/// What the pipeline reads from the hosting application when it is
/// assembled: its error-handler registry and debug flag.
#[derive(Debug, Clone, Default)]
pub struct AppContext {
    debug: bool,
    exception_handlers: ExceptionHandlers,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_exception_handlers(mut self, handlers: ExceptionHandlers) -> Self {
        self.exception_handlers = handlers;
        self
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn exception_handlers(&self) -> &ExceptionHandlers {
        &self.exception_handlers
    }

    /// Expose this context to the pipeline. Add it after (outside) the
    /// session auth layer so requests carry it when they reach the pipeline.
    pub fn layer(self) -> Extension<Arc<AppContext>> {
        Extension(Arc::new(self))
    }

    pub(crate) fn respond(&self, head: &RequestHead, error: HttpError) -> Response {
        self.exception_handlers.handle(head, error)
    }
}
