use std::{collections::BTreeSet, sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    auth::{
        ClaimSet, Role, TokenBundle,
        credentials::{CredentialVerifier, normalize_email},
        jwt::TokenCodec,
        password::hash_password,
        session::{ClientMeta, SessionResolver},
    },
    config::AuthConfig,
    db::entities::{session, user},
    error::AppError,
    services::{rbac_service::RbacService, user_service::UserService},
};

#[derive(Debug, Clone)]
pub struct SignUpInput {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Result of a successful sign-in or sign-up.
#[derive(Debug)]
pub struct AuthSession {
    pub user: user::Model,
    pub roles: BTreeSet<String>,
    pub session: session::Model,
    pub tokens: TokenBundle,
}

#[derive(Debug)]
pub struct ApiToken {
    pub token: String,
    pub expires_in: u64,
    pub user: user::Model,
    pub roles: BTreeSet<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    rbac: RbacService,
    credentials: CredentialVerifier,
    sessions: SessionResolver,
    tokens: Arc<TokenCodec>,
    access_ttl: Duration,
    api_token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: UserService,
        rbac: RbacService,
        credentials: CredentialVerifier,
        sessions: SessionResolver,
        tokens: Arc<TokenCodec>,
        cfg: &AuthConfig,
    ) -> Self {
        Self {
            users,
            rbac,
            credentials,
            sessions,
            tokens,
            access_ttl: Duration::from_secs(cfg.access_ttl_secs),
            api_token_ttl: Duration::from_secs(cfg.api_token_ttl_secs),
        }
    }

    pub async fn sign_up(
        &self,
        input: SignUpInput,
        meta: ClientMeta,
    ) -> Result<AuthSession, AppError> {
        let email = normalize_email(&input.email);
        if !looks_like_email(&email) {
            return Err(AppError::bad_request("Invalid email"));
        }
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("Name is required"));
        }

        let hash = hash_password(&input.password)?;
        let user = self
            .users
            .create_user(&email, name, Some(&hash), Role::User.as_str())
            .await?;
        if let Err(err) = self.rbac.assign_role(&user.id, Role::User.as_str()).await {
            // Leave the email free for a retry.
            if let Err(cleanup) = self.users.delete_user(&user.id).await {
                tracing::error!(user_id = %user.id, error = %cleanup, "sign-up rollback failed");
            }
            return Err(err);
        }
        tracing::info!(user_id = %user.id, "account registered");

        self.establish(user, meta).await
    }

    /// Any failure is the same `401 Invalid credentials`.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        meta: ClientMeta,
    ) -> Result<AuthSession, AppError> {
        let Some(user) = self.credentials.verify_credentials(email, password).await? else {
            return Err(AppError::invalid_credentials());
        };
        tracing::info!(user_id = %user.id, "signed in");
        self.establish(user, meta).await
    }

    pub async fn sign_out(&self, session_token: Option<&str>) -> Result<bool, AppError> {
        match session_token {
            Some(token) => self.sessions.revoke(token).await,
            None => Ok(false),
        }
    }

    /// Only tokens tagged `t: "refresh"` are accepted. The new pair carries the
    /// user's current primary role.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(user::Model, TokenBundle), AppError> {
        let claims = self
            .tokens
            .verify(refresh_token)
            .filter(|claims| claims.is_refresh())
            .ok_or_else(|| AppError::unauthorized("Unauthorized"))?;
        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::unauthorized("Unauthorized"))?;
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Unauthorized"))?;

        let role = self.rbac.primary_role(&user.id).await?;
        let tokens = self.issue_pair(&user, role)?;
        Ok((user, tokens))
    }

    pub async fn issue_api_token(&self, user_id: &Uuid) -> Result<ApiToken, AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(AppError::authentication_required)?;
        let roles = self.rbac.get_user_roles(&user.id).await?;
        let role = Role::primary(roles.iter().map(String::as_str));

        let token = self.tokens.issue(
            &ClaimSet::new(&user.id, &user.email, role.as_str()),
            self.api_token_ttl,
        )?;
        tracing::info!(user_id = %user.id, "api token issued");

        Ok(ApiToken {
            token,
            expires_in: self.api_token_ttl.as_secs(),
            user,
            roles,
        })
    }

    /// Creates the configured admin account when missing and makes sure it
    /// holds `admin`.
    pub async fn seed_admin(&self, cfg: &AuthConfig) -> Result<user::Model, AppError> {
        let email = normalize_email(&cfg.admin_email);
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let hash = hash_password(&cfg.admin_password)?;
                let user = self
                    .users
                    .create_user(&email, &cfg.admin_name, Some(&hash), Role::User.as_str())
                    .await?;
                tracing::info!(user_id = %user.id, "admin account created");
                user
            }
        };

        self.rbac.assign_role(&user.id, Role::Admin.as_str()).await?;
        Ok(user)
    }

    async fn establish(
        &self,
        user: user::Model,
        meta: ClientMeta,
    ) -> Result<AuthSession, AppError> {
        let session = self.sessions.create_session(&user.id, meta).await?;
        let roles = self.rbac.get_user_roles(&user.id).await?;
        let role = Role::primary(roles.iter().map(String::as_str));
        let tokens = self.issue_pair(&user, role)?;

        Ok(AuthSession {
            user,
            roles,
            session,
            tokens,
        })
    }

    fn issue_pair(&self, user: &user::Model, role: Role) -> Result<TokenBundle, AppError> {
        let claims = ClaimSet::new(&user.id, &user.email, role.as_str());
        Ok(TokenBundle {
            access_token: self.tokens.issue(&claims, self.access_ttl)?,
            refresh_token: self.tokens.issue_refresh(&claims)?,
            token_type: "Bearer",
            expires_in: self.access_ttl.as_secs(),
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::looks_like_email;

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("plain"));
        assert!(!looks_like_email("a@b."));
    }
}
