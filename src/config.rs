//! Environment-driven application configuration.

use crate::error::{Error, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    /// Shared secret for verifying payment gateway callbacks.
    pub payment_server_key: String,
    /// Front-end origin used to build notification deep links.
    pub app_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("Missing environment variable '{}'", key)));
        let parsed = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = parsed("PORT", "8083").parse::<u16>()
            .map_err(|e| Error::Config(format!("Invalid PORT: {}", e)))?;
        let database_max_connections = parsed("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()
            .map_err(|e| Error::Config(format!("Invalid DATABASE_MAX_CONNECTIONS: {}", e)))?;
        let jwt_ttl_minutes = parsed("JWT_TTL_MINUTES", "60").parse::<i64>()
            .map_err(|e| Error::Config(format!("Invalid JWT_TTL_MINUTES: {}", e)))?;
        if jwt_ttl_minutes <= 0 { return Err(Error::Config("JWT_TTL_MINUTES must be positive".into())); }

        let config = Self {
            host: parsed("HOST", "0.0.0.0"),
            port,
            database_url: required("DATABASE_URL")?,
            database_max_connections,
            nats_url: lookup("NATS_URL").filter(|v| !v.trim().is_empty()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_minutes,
            payment_server_key: required("PAYMENT_SERVER_KEY")?,
            app_base_url: parsed("APP_BASE_URL", "http://localhost:3000").trim_end_matches('/').to_string(),
        };
        tracing::info!(host = %config.host, port = config.port, nats = config.nats_url.is_some(), "configuration loaded");
        Ok(config)
    }

    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.port) }

    /// Absolute front-end URL for a path such as `/purchases/PB-...`.
    pub fn link(&self, path: &str) -> String { format!("{}{}", self.app_base_url, path) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pasar"), ("JWT_SECRET", "s3cret"), ("PAYMENT_SERVER_KEY", "SB-key"),
            ("APP_BASE_URL", "https://pasar.test/"),
        ])).unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8083");
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.jwt_ttl_minutes, 60);
        assert!(cfg.nats_url.is_none());
        assert_eq!(cfg.link("/notifications"), "https://pasar.test/notifications");
    }

    #[test]
    fn test_missing_required_is_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("JWT_SECRET")));
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "s"), ("PAYMENT_SERVER_KEY", "k"), ("PORT", "eighty"),
        ])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
