use anyhow::{Result, bail};

use super::AppConfig;

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if let Some(database) = cfg.database.as_ref() {
        if database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if database.min_idle > database.max_connections {
            errors.push(format!(
                "database.min_idle ({}) must be <= database.max_connections ({})",
                database.min_idle, database.max_connections
            ));
        }
    }

    if let Some(auth) = cfg.auth.as_ref() {
        if auth.jwt_secret.trim().is_empty() {
            errors.push("auth.jwt_secret must not be empty".to_string());
        }

        if auth.admin_email.trim().is_empty() {
            errors.push("auth.admin_email must not be empty".to_string());
        }

        if auth.admin_password.len() < 8 {
            errors.push("auth.admin_password must be at least 8 characters".to_string());
        }

        if auth.access_ttl_secs == 0 {
            errors.push("auth.access_ttl_secs must be > 0".to_string());
        }

        if auth.refresh_ttl_secs <= auth.access_ttl_secs {
            errors.push(
                "auth.refresh_ttl_secs must be greater than auth.access_ttl_secs".to_string(),
            );
        }

        if auth.api_token_ttl_secs == 0 {
            errors.push("auth.api_token_ttl_secs must be > 0".to_string());
        }
    }

    let session = &cfg.session;
    if session.cookie_name.trim().is_empty() {
        errors.push("session.cookie_name must not be empty".to_string());
    }

    if session.update_age_secs >= session.ttl_secs {
        errors.push("session.update_age_secs must be less than session.ttl_secs".to_string());
    }

    if session.ttl_secs > session.max_lifetime_secs {
        errors.push("session.ttl_secs must be <= session.max_lifetime_secs".to_string());
    }

    if cfg.rate_limit.enabled {
        if cfg.rate_limit.max_requests == 0 {
            errors.push("rate_limit.max_requests must be > 0".to_string());
        }

        if cfg.rate_limit.window_secs == 0 {
            errors.push("rate_limit.window_secs must be > 0".to_string());
        }
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}
