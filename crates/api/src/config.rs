use std::time::Duration;

use anyhow::{anyhow, Context};

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    /// Without a key messages are only logged.
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    pub public_base_url: String,
    pub email: EmailConfig,
    pub outbox_poll_interval: Duration,
    pub outbox_max_attempts: i32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{key} must be set"));

        let port = match get("PORT") {
            Some(v) => v.parse().context("PORT must be a port number")?,
            None => 8080,
        };
        let jwt_expiration_hours = match get("JWT_EXPIRATION_HOURS") {
            Some(v) => v.parse().context("JWT_EXPIRATION_HOURS must be a number of hours")?,
            None => 24,
        };
        let poll_seconds: u64 = match get("OUTBOX_POLL_SECONDS") {
            Some(v) => v.parse().context("OUTBOX_POLL_SECONDS must be a number of seconds")?,
            None => 5,
        };
        let outbox_max_attempts = match get("OUTBOX_MAX_ATTEMPTS") {
            Some(v) => v.parse().context("OUTBOX_MAX_ATTEMPTS must be a number")?,
            None => 5,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            port,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_hours,
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            email: EmailConfig {
                api_url: get("EMAIL_API_URL")
                    .unwrap_or_else(|| "https://api.resend.com".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                api_key: get("EMAIL_API_KEY"),
                from: get("EMAIL_FROM").unwrap_or_else(|| "Ligue <no-reply@localhost>".to_string()),
            },
            outbox_poll_interval: Duration::from_secs(poll_seconds.max(1)),
            outbox_max_attempts,
        })
    }

    /// Settings for tests and tools that never reach the network.
    pub fn for_tests(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: 1,
            public_base_url: "http://localhost:8080".to_string(),
            email: EmailConfig {
                api_url: "http://localhost".to_string(),
                api_key: None,
                from: "Ligue <test@localhost>".to_string(),
            },
            outbox_poll_interval: Duration::from_secs(1),
            outbox_max_attempts: 3,
        }
    }
}
