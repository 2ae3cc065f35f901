pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: i64 = 3000;
pub const DEFAULT_RUST_LOG: &str = "info,tower_http=info";
pub const DEFAULT_DB_MAX_CONNECTIONS: i64 = 10;
pub const DEFAULT_DB_MIN_IDLE: i64 = 2;

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_API_TOKEN_TTL_SECS: i64 = 60 * 60;
pub const DEFAULT_TOKEN_LEEWAY_SECS: i64 = 0;
pub const DEFAULT_ADMIN_NAME: &str = "Administrator";
pub const DEFAULT_SECURE_COOKIES: bool = true;

pub const DEFAULT_SESSION_COOKIE: &str = "session_token";
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_SESSION_UPDATE_AGE_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_SESSION_MAX_LIFETIME_SECS: i64 = 30 * 24 * 60 * 60;

pub const DEFAULT_RATE_LIMIT_ENABLED: bool = true;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: i64 = 10;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: i64 = 60;
pub const DEFAULT_RATE_LIMIT_TRUST_FORWARDED_FOR: bool = false;
