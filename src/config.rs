use std::{env, time::Duration};

use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub cache_enabled: bool,
    pub supplier: SupplierConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone)]
pub struct SupplierConfig {
    pub base_url: String,
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
    /// Total attempts, the first call included.
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for SupplierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090/".to_string(),
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        let jwt = JwtConfig {
            secret,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront-api".to_string()),
            audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "storefront-clients".to_string()),
        };

        let cache_enabled = env::var("CACHE_ENABLED")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off"))
            .unwrap_or(true);

        let mut supplier = SupplierConfig::default();
        if let Ok(base_url) = env::var("SUPPLIER_BASE_URL") {
            supplier.base_url = base_url;
        }
        if let Some(secs) = env::var("SUPPLIER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            supplier.timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            port,
            database_url,
            host,
            jwt,
            cache_enabled,
            supplier,
        })
    }
}
