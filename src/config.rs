use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

/// Upper bound for token lifetime: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which `UserStore` backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "memory" | "mem" => Ok(StoreKind::Memory),
            other => anyhow::bail!("unknown USER_STORE `{other}`"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("USER_STORE") {
            Ok(v) => v.parse()?,
            Err(_) => StoreKind::Postgres,
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if store == StoreKind::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when USER_STORE=postgres");
        }
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "signup-service".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "signup-service-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60_i64).clamp(1, MAX_TTL_MINUTES),
        };
        Ok(Self {
            store,
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),
            jwt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_accepts_aliases() {
        assert_eq!("Postgres".parse::<StoreKind>().unwrap(), StoreKind::Postgres);
        assert_eq!("mem".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!("mongo".parse::<StoreKind>().is_err());
    }
}
