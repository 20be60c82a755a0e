use std::fmt;
use std::sync::LazyLock;

/// Fourteen days, in seconds
const DEFAULT_MAX_AGE: u64 = 14 * 24 * 60 * 60;
const DEFAULT_COOKIE_NAME: &str = "session";

pub static SESSION_COOKIE_NAME: LazyLock<String> =
    LazyLock::new(|| parse_cookie_name(std::env::var("SESSION_COOKIE_NAME").ok()));

pub static SESSION_COOKIE_MAX_AGE: LazyLock<u64> =
    LazyLock::new(|| parse_max_age(std::env::var("SESSION_COOKIE_MAX_AGE").ok()));

pub static SESSION_COOKIE_SECURE: LazyLock<bool> =
    LazyLock::new(|| parse_secure(std::env::var("SESSION_COOKIE_SECURE").ok()));

fn parse_cookie_name(value: Option<String>) -> String {
    value
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string())
}

fn parse_max_age(value: Option<String>) -> u64 {
    value
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_AGE)
}

fn parse_secure(value: Option<String>) -> bool {
    value
        .map(|val| val.eq_ignore_ascii_case("true") || val == "1")
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("Strict"),
            Self::Lax => f.write_str("Lax"),
            Self::None => f.write_str("None"),
        }
    }
}

/// Attributes of the cookie(s) carrying the session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    /// Cookie name. The cookie backend appends a chunk index (`session-0`).
    pub key: String,
    pub path: String,
    pub domain: Option<String>,
    /// Lifetime of the cookie and of server side session entries, in seconds
    pub max_age: u64,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            key: SESSION_COOKIE_NAME.clone(),
            path: "/".to_string(),
            domain: None,
            max_age: *SESSION_COOKIE_MAX_AGE,
            secure: *SESSION_COOKIE_SECURE,
            http_only: true,
            same_site: SameSite::default(),
        }
    }
}

impl CookieConfig {
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper function to set an environment variable for the duration of the test
    /// and restore the original value afterward.
    fn with_env_var<F, R>(key: &str, value: Option<&str>, test: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();

        match value {
            Some(val) => unsafe { env::set_var(key, val) },
            None => unsafe { env::remove_var(key) },
        }

        let result = test();

        match original {
            Some(val) => unsafe { env::set_var(key, val) },
            None => unsafe { env::remove_var(key) },
        }

        result
    }

    #[test]
    fn test_parse_cookie_name() {
        assert_eq!(parse_cookie_name(None), "session");
        assert_eq!(parse_cookie_name(Some("  ".to_string())), "session");
        assert_eq!(parse_cookie_name(Some("sid".to_string())), "sid");
    }

    #[test]
    fn test_parse_max_age() {
        assert_eq!(parse_max_age(None), 1_209_600);
        assert_eq!(parse_max_age(Some("1800".to_string())), 1800);
        // Should fall back to default
        assert_eq!(parse_max_age(Some("invalid".to_string())), 1_209_600);
    }

    #[test]
    fn test_parse_secure() {
        assert!(!parse_secure(None));
        assert!(parse_secure(Some("TRUE".to_string())));
        assert!(parse_secure(Some("1".to_string())));
        assert!(!parse_secure(Some("no".to_string())));
    }

    #[test]
    #[serial]
    fn test_env_values_feed_parsers() {
        with_env_var("SESSION_COOKIE_MAX_AGE", Some("60"), || {
            assert_eq!(parse_max_age(env::var("SESSION_COOKIE_MAX_AGE").ok()), 60);
        });

        with_env_var("SESSION_COOKIE_NAME", None, || {
            assert_eq!(parse_cookie_name(env::var("SESSION_COOKIE_NAME").ok()), "session");
        });
    }

    #[test]
    fn test_same_site_display() {
        assert_eq!(SameSite::Strict.to_string(), "Strict");
        assert_eq!(SameSite::default().to_string(), "Lax");
        assert_eq!(SameSite::None.to_string(), "None");
    }

    #[test]
    fn test_cookie_config_builders() {
        let config = CookieConfig::default()
            .with_key("auth")
            .with_path("/api")
            .with_domain("example.com")
            .with_max_age(30)
            .with_secure(true)
            .with_http_only(false)
            .with_same_site(SameSite::Strict);

        assert_eq!(config.key, "auth");
        assert_eq!(config.path, "/api");
        assert_eq!(config.domain.as_deref(), Some("example.com"));
        assert_eq!(config.max_age, 30);
        assert!(config.secure);
        assert!(!config.http_only);
        assert_eq!(config.same_site, SameSite::Strict);
    }
}
