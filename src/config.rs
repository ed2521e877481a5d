use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Optional namespace tag; selects the `<service>_users` table.
    pub service: Option<String>,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let secret = std::env::var("GRAM_TOKEN_SECRET").context("GRAM_TOKEN_SECRET is not set")?;
        if secret.is_empty() {
            bail!("GRAM_TOKEN_SECRET must not be empty");
        }

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("GRAM_TOKEN_ISSUER").unwrap_or_else(|_| "gram".into()),
            audience: std::env::var("GRAM_TOKEN_AUDIENCE").unwrap_or_else(|_| "gram-users".into()),
            ttl_hours: std::env::var("GRAM_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|h| *h > 0)
                .unwrap_or(24),
        };

        let service = std::env::var("GRAM_SERVICE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            database_url,
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            service,
            host: std::env::var("GRAM_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("GRAM_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            jwt,
        })
    }
}
