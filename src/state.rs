use std::sync::Arc;

use anyhow::Context;
use sea_orm::DatabaseConnection;

use crate::{
    auth::{clock::SharedClock, identity::IdentityResolver, jwt::TokenCodec},
    config::{AppConfig, AuthConfig},
    rate_limit::{InMemoryRateLimiter, RateLimiter, Unlimited},
    services::{ServiceContext, auth_service::AuthService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthConfig,
    pub db: DatabaseConnection,
    pub clock: SharedClock,
    pub tokens: Arc<TokenCodec>,
    pub identity: IdentityResolver,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        clock: SharedClock,
    ) -> anyhow::Result<Arc<Self>> {
        let rate_limiter: Arc<dyn RateLimiter> = if config.rate_limit.enabled {
            Arc::new(InMemoryRateLimiter::new(
                &config.rate_limit,
                Arc::clone(&clock),
            ))
        } else {
            Arc::new(Unlimited)
        };
        Self::with_rate_limiter(config, db, clock, rate_limiter)
    }

    pub fn with_rate_limiter(
        config: AppConfig,
        db: DatabaseConnection,
        clock: SharedClock,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> anyhow::Result<Arc<Self>> {
        let auth = config
            .auth
            .clone()
            .context("auth config is required (APP_AUTH__JWT_SECRET, ...)")?;

        let tokens = Arc::new(TokenCodec::from_config(&auth, Arc::clone(&clock)));
        let sessions = ServiceContext::new(&db, Arc::clone(&clock)).sessions(&config.session);
        let identity =
            IdentityResolver::standard(Arc::clone(&tokens), sessions, &config.session.cookie_name);

        Ok(Arc::new(Self {
            config,
            auth,
            db,
            clock,
            tokens,
            identity,
            rate_limiter,
        }))
    }

    pub fn services(&self) -> ServiceContext {
        ServiceContext::from_state(self)
    }

    pub fn auth_service(&self) -> AuthService {
        self.services()
            .auth(Arc::clone(&self.tokens), &self.auth, &self.config.session)
    }
}
