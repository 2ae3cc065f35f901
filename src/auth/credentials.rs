use crate::{
    auth::password::{verify_against_dummy, verify_password},
    db::{dao::UserDao, entities::user},
    error::AppError,
};

/// Email + password check. Every miss looks the same to the caller and costs
/// one argon2 verification.
#[derive(Clone)]
pub struct CredentialVerifier {
    users: UserDao,
}

impl CredentialVerifier {
    pub fn new(users: UserDao) -> Self {
        Self { users }
    }

    /// `Ok(None)` for an unknown email, an account without a password
    /// (social-only) and a wrong password alike. Only storage failures are
    /// errors.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<user::Model>, AppError> {
        let email = normalize_email(email);
        let user = self.users.find_by_email(&email).await?;

        let Some(user) = user else {
            verify_against_dummy(password);
            tracing::debug!("credential check failed");
            return Ok(None);
        };

        let Some(hash) = user.password_hash.as_deref() else {
            verify_against_dummy(password);
            tracing::debug!(user_id = %user.id, "credential check failed");
            return Ok(None);
        };

        if !verify_password(password, hash) {
            tracing::debug!(user_id = %user.id, "credential check failed");
            return Ok(None);
        }

        Ok(Some(user))
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
