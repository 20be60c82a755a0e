use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityRequirement, SecurityScheme};
use utoipa::openapi::{Components, ComponentsBuilder};

use crate::auth::SessionAuth;
use crate::resolver::Identity;

pub const SESSION_COOKIE_SCHEME_DESCRIPTION: &str = "Session cookie authentication.";

/// The `apiKey` security scheme describing the session cookie
pub fn session_cookie_security_scheme() -> SecurityScheme {
    SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
        "Set-Cookie",
        SESSION_COOKIE_SCHEME_DESCRIPTION,
    )))
}

impl<U: Identity> SessionAuth<U> {
    /// Components registering the session cookie scheme under the
    /// configured scheme name
    pub fn openapi_components(&self) -> Components {
        ComponentsBuilder::new()
            .security_scheme(
                self.openapi_security_scheme_name(),
                session_cookie_security_scheme(),
            )
            .build()
    }

    pub fn security_requirement(&self) -> SecurityRequirement {
        SecurityRequirement::new(self.openapi_security_scheme_name(), Vec::<String>::new())
    }
}
