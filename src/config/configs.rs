use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{defaults, envconfig::EnvConfig, validate};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub database: Option<DatabaseConfig>,
    pub auth: Option<AuthConfig>,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        <Self as EnvConfig>::from_env()
    }
}

impl EnvConfig for AppConfig {
    fn validate(&self) -> Result<()> {
        validate::validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT as u16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub rust_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_db_min_idle")]
    pub min_idle: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_email: String,
    pub admin_password: String,
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_api_token_ttl_secs")]
    pub api_token_ttl_secs: u64,
    /// Clock skew tolerated when checking `exp`. Zero means a token is
    /// rejected from the exact second it expires.
    #[serde(default = "default_token_leeway_secs")]
    pub token_leeway_secs: u64,
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: impl Into<String>,
        admin_email: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            admin_email: admin_email.into(),
            admin_password: admin_password.into(),
            admin_name: default_admin_name(),
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            api_token_ttl_secs: default_api_token_ttl_secs(),
            token_leeway_secs: default_token_leeway_secs(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Sliding window: each refresh pushes expiry to `now + ttl_secs`.
    pub ttl_secs: u64,
    /// Minimum age of the last refresh before a read writes a new expiry.
    pub update_age_secs: u64,
    /// Hard cap measured from session creation.
    pub max_lifetime_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: defaults::DEFAULT_SESSION_COOKIE.to_string(),
            ttl_secs: defaults::DEFAULT_SESSION_TTL_SECS as u64,
            update_age_secs: defaults::DEFAULT_SESSION_UPDATE_AGE_SECS as u64,
            max_lifetime_secs: defaults::DEFAULT_SESSION_MAX_LIFETIME_SECS as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_secs: u64,
    /// Key clients on the first `x-forwarded-for` hop instead of the socket
    /// peer. Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::DEFAULT_RATE_LIMIT_ENABLED,
            max_requests: defaults::DEFAULT_RATE_LIMIT_MAX_REQUESTS as u32,
            window_secs: defaults::DEFAULT_RATE_LIMIT_WINDOW_SECS as u64,
            trust_forwarded_for: defaults::DEFAULT_RATE_LIMIT_TRUST_FORWARDED_FOR,
        }
    }
}

fn default_db_max_connections() -> u32 {
    defaults::DEFAULT_DB_MAX_CONNECTIONS as u32
}

fn default_db_min_idle() -> u32 {
    defaults::DEFAULT_DB_MIN_IDLE as u32
}

fn default_admin_name() -> String {
    defaults::DEFAULT_ADMIN_NAME.to_string()
}

fn default_access_ttl_secs() -> u64 {
    defaults::DEFAULT_ACCESS_TTL_SECS as u64
}

fn default_refresh_ttl_secs() -> u64 {
    defaults::DEFAULT_REFRESH_TTL_SECS as u64
}

fn default_api_token_ttl_secs() -> u64 {
    defaults::DEFAULT_API_TOKEN_TTL_SECS as u64
}

fn default_token_leeway_secs() -> u64 {
    defaults::DEFAULT_TOKEN_LEEWAY_SECS as u64
}

fn default_secure_cookies() -> bool {
    defaults::DEFAULT_SECURE_COOKIES
}
