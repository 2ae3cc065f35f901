//! Builders for tests: an in-memory SQLite database with the real schema and
//! seeded RBAC tables, a manual clock, and the full HTTP stack.

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;

use crate::{
    auth::{clock::ManualClock, password::hash_password},
    config::{AppConfig, AuthConfig, DatabaseConfig, RateLimitConfig},
    db::{connection, entities::user},
    error::AppError,
    routes::app,
    state::AppState,
};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "password123";
/// 2026-01-01T00:00:00Z
pub const TEST_EPOCH: i64 = 1_767_225_600;

pub struct TestApp {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub router: Router,
}

pub fn test_config() -> AppConfig {
    let mut auth = AuthConfig::new(TEST_SECRET, "admin@example.com", "adminpassword");
    auth.secure_cookies = false;

    AppConfig {
        database: Some(DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_idle: 1,
        }),
        auth: Some(auth),
        rate_limit: RateLimitConfig {
            enabled: true,
            max_requests: 1_000,
            window_secs: 60,
            trust_forwarded_for: false,
        },
        ..AppConfig::default()
    }
}

pub async fn sqlite_db() -> Result<DatabaseConnection, anyhow::Error> {
    let cfg = test_config()
        .database
        .ok_or_else(|| anyhow::anyhow!("test config has no database"))?;
    connection::connect(&cfg).await
}

pub async fn spawn_app() -> Result<TestApp, anyhow::Error> {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(cfg: AppConfig) -> Result<TestApp, anyhow::Error> {
    let db = sqlite_db().await?;
    let clock = Arc::new(ManualClock::at_unix(TEST_EPOCH));
    let state = AppState::new(cfg, db, clock.clone())?;
    state
        .services()
        .rbac()
        .initialize_rbac()
        .await
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    Ok(TestApp {
        router: app(Arc::clone(&state)),
        state,
        clock,
    })
}

impl TestApp {
    /// Creates a password account holding exactly `roles`.
    pub async fn create_user(&self, email: &str, roles: &[&str]) -> Result<user::Model, AppError> {
        let services = self.state.services();
        let hash = hash_password(TEST_PASSWORD)?;
        let user = services
            .user()
            .create_user(email, "Test User", Some(&hash), "user")
            .await?;
        let rbac = services.rbac();
        for role in roles {
            rbac.assign_role(&user.id, role).await?;
        }
        Ok(user)
    }
}
