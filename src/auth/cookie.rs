//! Identity cookie: issuing it on login, expiring it on logout and reading it back.

use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{time::Duration as CookieDuration, time::OffsetDateTime, Cookie, SameSite};

use crate::config::CookieConfig;

fn base<'c>(cfg: &CookieConfig, value: String) -> cookie::CookieBuilder<'c> {
    let mut builder = Cookie::build((cfg.name.clone(), value))
        .path("/")
        .http_only(true)
        .secure(cfg.secure)
        .same_site(SameSite::Lax);
    if let Some(domain) = &cfg.domain {
        builder = builder.domain(domain.clone());
    }
    builder
}

/// `Set-Cookie` value carrying the signed token for `ttl`.
pub fn session_cookie(cfg: &CookieConfig, token: String, ttl: Duration) -> anyhow::Result<HeaderValue> {
    let cookie = base(cfg, token)
        .max_age(CookieDuration::seconds(ttl.as_secs() as i64))
        .build();
    HeaderValue::from_str(&cookie.to_string()).context("encode session cookie")
}

/// `Set-Cookie` value that makes the client drop the identity cookie.
pub fn removal_cookie(cfg: &CookieConfig) -> anyhow::Result<HeaderValue> {
    let cookie = base(cfg, String::new())
        .max_age(CookieDuration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build();
    HeaderValue::from_str(&cookie.to_string()).context("encode removal cookie")
}

/// Value of the first non-empty cookie called `name` across all `Cookie` headers.
pub fn token_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw))
        .filter_map(Result::ok)
        .find(|c| c.name() == name && !c.value().is_empty())
        .map(|c| c.value().to_string())
}
