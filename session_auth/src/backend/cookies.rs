use chrono::{DateTime, Duration, Utc};
use headers::{Cookie, HeaderMapExt};
use http::header::{HeaderMap, HeaderValue, SET_COOKIE};

use crate::config::CookieConfig;
use crate::errors::SessionError;

pub(super) const CLEARED_COOKIE_VALUE: &str = "null";

const EXPIRED_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn format_cookie(config: &CookieConfig, name: &str, value: &str, clear: bool) -> String {
    let mut cookie = format!("{name}={value}; Path={}", config.path);
    if let Some(domain) = &config.domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    if clear {
        cookie.push_str(&format!("; Max-Age=0; Expires={EXPIRED_DATE}"));
    } else {
        cookie.push_str(&format!("; Max-Age={}", config.max_age));
        let expires = i64::try_from(config.max_age)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|max_age| Utc::now().checked_add_signed(max_age));
        if let Some(expires) = expires {
            cookie.push_str(&format!("; Expires={}", format_http_date(expires)));
        }
    }
    cookie.push_str(&format!("; SameSite={}", config.same_site));
    if config.secure {
        cookie.push_str("; Secure");
    }
    if config.http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}

fn append_set_cookie(headers: &mut HeaderMap, cookie: String) -> Result<(), SessionError> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|_| SessionError::Cookie("Failed to build Set-Cookie header".to_string()))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

pub(super) fn header_set_cookie(
    headers: &mut HeaderMap,
    config: &CookieConfig,
    name: &str,
    value: &str,
) -> Result<(), SessionError> {
    append_set_cookie(headers, format_cookie(config, name, value, false))
}

pub(super) fn header_clear_cookie(
    headers: &mut HeaderMap,
    config: &CookieConfig,
    name: &str,
) -> Result<(), SessionError> {
    append_set_cookie(
        headers,
        format_cookie(config, name, CLEARED_COOKIE_VALUE, true),
    )
}

/// Value of the request cookie `name`
pub(super) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .typed_get::<Cookie>()
        .and_then(|cookies| cookies.get(name).map(str::to_string))
}

/// Chunked cookies `<key>-<n>` carried by the request, ordered by `n`
pub(super) fn chunk_cookies(headers: &HeaderMap, key: &str) -> Vec<(usize, String, String)> {
    let Some(cookies) = headers.typed_get::<Cookie>() else {
        return Vec::new();
    };

    let prefix = format!("{key}-");
    let mut chunks: Vec<(usize, String, String)> = cookies
        .iter()
        .filter_map(|(name, value)| {
            let index = name.strip_prefix(&prefix)?.parse::<usize>().ok()?;
            Some((index, name.to_string(), value.to_string()))
        })
        .collect();
    chunks.sort_by_key(|(index, _, _)| *index);
    chunks
}
