use std::net::SocketAddr;

use anyhow::{bail, Context};
use serde::Deserialize;

/// Minimum secret length below which a warning is logged at startup.
const RECOMMENDED_SECRET_LEN: usize = 32;

/// Longest accepted session lifetime.
pub const MAX_SESSION_TTL_DAYS: i64 = 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub domain: Option<String>,
    pub secure: bool,
}

/// Whether gated requests re-check that the token subject still exists.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubjectCheck {
    Lookup,
    Stateless,
}

impl std::str::FromStr for SubjectCheck {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lookup" => Ok(SubjectCheck::Lookup),
            "stateless" => Ok(SubjectCheck::Stateless),
            other => bail!("unknown SUBJECT_CHECK value: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub subject_check: SubjectCheck,
    pub cors_allowed_origins: Vec<String>,
    pub listen_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = get("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() {
            bail!("JWT_SECRET must be set to a non-empty value");
        }
        if secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                len = secret.len(),
                "JWT_SECRET is shorter than {} bytes",
                RECOMMENDED_SECRET_LEN
            );
        }

        let ttl_days = match get("SESSION_TTL_DAYS") {
            Some(v) => v.parse::<i64>().context("parse SESSION_TTL_DAYS")?,
            None => 30,
        };
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&ttl_days) {
            bail!("SESSION_TTL_DAYS must be between 1 and {MAX_SESSION_TTL_DAYS}");
        }

        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "revforum".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "revforum-users".into()),
            ttl_days,
        };

        let cookie = CookieConfig {
            name: get("COOKIE_NAME").unwrap_or_else(|| "Authorization".into()),
            domain: get("COOKIE_DOMAIN").filter(|d| !d.is_empty()),
            secure: match get("COOKIE_SECURE") {
                Some(v) => parse_bool(&v).context("parse COOKIE_SECURE")?,
                None => true,
            },
        };

        let subject_check = match get("SUBJECT_CHECK") {
            Some(v) => v.parse()?,
            None => SubjectCheck::Lookup,
        };

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse::<u32>().context("parse DB_MAX_CONNECTIONS")?,
            None => 10,
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let host = get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match get("APP_PORT") {
            Some(v) => v.parse::<u16>().context("parse APP_PORT")?,
            None => 8080,
        };
        let listen_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .with_context(|| format!("parse listen address {host}:{port}"))?;

        Ok(Self {
            database_url: database_url(&get),
            db_max_connections,
            jwt,
            cookie,
            subject_check,
            cors_allowed_origins,
            listen_addr,
        })
    }
}

/// `DATABASE_URL` wins; otherwise the URL is assembled from the `DB_*` parts.
fn database_url<F>(get: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = get("DATABASE_URL").filter(|u| !u.is_empty()) {
        return Some(url);
    }
    let host = get("DB_HOST")?;
    let port = get("DB_PORT").unwrap_or_else(|| "5432".into());
    let user = get("DB_USER").unwrap_or_else(|| "postgres".into());
    let name = get("DB_NAME").unwrap_or_else(|| "postgres".into());
    let sslmode = get("DB_SSLMODE").unwrap_or_else(|| "prefer".into());
    let auth = match get("DB_PASSWORD") {
        Some(password) if !password.is_empty() => format!("{user}:{password}"),
        _ => user,
    };
    Some(format!(
        "postgres://{auth}@{host}:{port}/{name}?sslmode={sslmode}"
    ))
}

fn parse_bool(v: &str) -> anyhow::Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid boolean: {other}"),
    }
}
