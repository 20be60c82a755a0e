use std::sync::Arc;

use crate::backend::{CookieBackend, ServerSideBackend, SessionBackend};
use crate::config::CookieConfig;
use crate::errors::SessionError;
use crate::exclude::ExcludePatterns;
use crate::resolver::{Identity, RetrieveUserHandler};
use crate::store::SessionStore;

pub const DEFAULT_OPENAPI_SECURITY_SCHEME_NAME: &str = "sessionCookie";

/// Immutable configuration of the session authentication pipeline.
///
/// Built once through [`SessionAuthBuilder`] and shared by every request.
pub struct SessionAuth<U> {
    retrieve_user_handler: RetrieveUserHandler<U>,
    exclude: ExcludePatterns,
    backend: Arc<dyn SessionBackend>,
    openapi_security_scheme_name: String,
}

impl<U> Clone for SessionAuth<U> {
    fn clone(&self) -> Self {
        Self {
            retrieve_user_handler: self.retrieve_user_handler.clone(),
            exclude: self.exclude.clone(),
            backend: Arc::clone(&self.backend),
            openapi_security_scheme_name: self.openapi_security_scheme_name.clone(),
        }
    }
}

impl<U> std::fmt::Debug for SessionAuth<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuth")
            .field("exclude", &self.exclude.patterns())
            .field("cookie", &self.backend.cookie_config().key)
            .field(
                "openapi_security_scheme_name",
                &self.openapi_security_scheme_name,
            )
            .finish_non_exhaustive()
    }
}

impl<U: Identity> SessionAuth<U> {
    /// Sessions kept client side in an AES-GCM encrypted cookie
    pub fn cookie(secret: impl AsRef<[u8]>, handler: RetrieveUserHandler<U>) -> SessionAuthBuilder<U> {
        SessionAuthBuilder::new(BackendKind::Cookie(secret.as_ref().to_vec()), handler)
    }

    /// Sessions kept in `store`, the cookie only carrying the session id
    pub fn server_side(
        store: Arc<dyn SessionStore>,
        handler: RetrieveUserHandler<U>,
    ) -> SessionAuthBuilder<U> {
        SessionAuthBuilder::new(BackendKind::ServerSide(store), handler)
    }

    /// Any other backend. `cookie_config` on the builder is ignored.
    pub fn with_backend(
        backend: Arc<dyn SessionBackend>,
        handler: RetrieveUserHandler<U>,
    ) -> SessionAuthBuilder<U> {
        SessionAuthBuilder::new(BackendKind::Custom(backend), handler)
    }

    pub fn retrieve_user_handler(&self) -> &RetrieveUserHandler<U> {
        &self.retrieve_user_handler
    }

    pub fn exclude(&self) -> &ExcludePatterns {
        &self.exclude
    }

    pub fn backend(&self) -> &Arc<dyn SessionBackend> {
        &self.backend
    }

    pub fn openapi_security_scheme_name(&self) -> &str {
        &self.openapi_security_scheme_name
    }
}

enum BackendKind {
    Cookie(Vec<u8>),
    ServerSide(Arc<dyn SessionStore>),
    Custom(Arc<dyn SessionBackend>),
}

pub struct SessionAuthBuilder<U> {
    backend: BackendKind,
    retrieve_user_handler: RetrieveUserHandler<U>,
    exclude: Vec<String>,
    cookie_config: CookieConfig,
    openapi_security_scheme_name: String,
}

impl<U: Identity> SessionAuthBuilder<U> {
    fn new(backend: BackendKind, retrieve_user_handler: RetrieveUserHandler<U>) -> Self {
        Self {
            backend,
            retrieve_user_handler,
            exclude: Vec::new(),
            cookie_config: CookieConfig::default(),
            openapi_security_scheme_name: DEFAULT_OPENAPI_SECURITY_SCHEME_NAME.to_string(),
        }
    }

    /// Add a path pattern that bypasses authentication
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    pub fn exclude_all<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn cookie_config(mut self, config: CookieConfig) -> Self {
        self.cookie_config = config;
        self
    }

    pub fn openapi_security_scheme_name(mut self, name: impl Into<String>) -> Self {
        self.openapi_security_scheme_name = name.into();
        self
    }

    pub fn build(self) -> Result<SessionAuth<U>, SessionError> {
        let exclude = ExcludePatterns::new(self.exclude)?;

        let backend: Arc<dyn SessionBackend> = match self.backend {
            BackendKind::Cookie(secret) => Arc::new(CookieBackend::new(&secret, self.cookie_config)?),
            BackendKind::ServerSide(store) => {
                Arc::new(ServerSideBackend::new(store, self.cookie_config))
            }
            BackendKind::Custom(backend) => backend,
        };

        tracing::debug!(
            cookie = %backend.cookie_config().key,
            exclude = ?exclude.patterns(),
            "Session authentication configured"
        );

        Ok(SessionAuth {
            retrieve_user_handler: self.retrieve_user_handler,
            exclude,
            backend,
            openapi_security_scheme_name: self.openapi_security_scheme_name,
        })
    }
}
