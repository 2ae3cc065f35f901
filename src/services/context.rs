use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    auth::{
        clock::SharedClock, credentials::CredentialVerifier, jwt::TokenCodec,
        session::SessionResolver,
    },
    config::{AuthConfig, SessionConfig},
    db::dao::DaoContext,
    services::{auth_service::AuthService, rbac_service::RbacService, user_service::UserService},
    state::AppState,
};

#[derive(Clone)]
pub struct ServiceContext {
    daos: DaoContext,
    clock: SharedClock,
}

impl ServiceContext {
    pub fn new(db: &DatabaseConnection, clock: SharedClock) -> Self {
        Self {
            daos: DaoContext::new(db),
            clock,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(&state.db, Arc::clone(&state.clock))
    }

    pub fn user(&self) -> UserService {
        UserService::new(self.daos.user(), Arc::clone(&self.clock))
    }

    pub fn rbac(&self) -> RbacService {
        RbacService::new(
            self.daos.user(),
            self.daos.role(),
            self.daos.permission(),
            Arc::clone(&self.clock),
        )
    }

    pub fn credentials(&self) -> CredentialVerifier {
        CredentialVerifier::new(self.daos.user())
    }

    pub fn sessions(&self, cfg: &SessionConfig) -> SessionResolver {
        SessionResolver::new(
            self.daos.session(),
            self.daos.user(),
            Arc::clone(&self.clock),
            cfg,
        )
    }

    pub fn auth(
        &self,
        tokens: Arc<TokenCodec>,
        auth: &AuthConfig,
        session: &SessionConfig,
    ) -> AuthService {
        AuthService::new(
            self.user(),
            self.rbac(),
            self.credentials(),
            self.sessions(session),
            tokens,
            auth,
        )
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }
}
