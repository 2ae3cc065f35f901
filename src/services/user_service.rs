use uuid::Uuid;

use crate::{
    auth::clock::SharedClock,
    db::dao::{DaoBase, DaoLayerError, UserDao},
    db::entities::user,
    error::AppError,
};

#[derive(Clone)]
pub struct UserService {
    user_dao: UserDao,
    clock: SharedClock,
}

impl UserService {
    pub fn new(user_dao: UserDao, clock: SharedClock) -> Self {
        Self { user_dao, clock }
    }

    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<user::Model>, AppError> {
        match self.user_dao.find_by_id(*id).await {
            Ok(model) => Ok(Some(model)),
            Err(DaoLayerError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, AppError> {
        Ok(self.user_dao.find_by_email(email).await?)
    }

    /// `role` only seeds the cached column; grant roles through the RBAC
    /// service.
    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: Option<&str>,
        role: &str,
    ) -> Result<user::Model, AppError> {
        match self
            .user_dao
            .create_user(
                email,
                name,
                password_hash,
                role,
                self.clock.now().fixed_offset(),
            )
            .await
        {
            Ok(user) => Ok(user),
            Err(err) if err.is_unique_violation() => {
                Err(AppError::conflict("Email already registered"))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns whether a row was removed.
    pub async fn delete_user(&self, id: &Uuid) -> Result<bool, AppError> {
        Ok(self.user_dao.delete_user(id).await? > 0)
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        Ok(self.user_dao.count_users().await?)
    }
}
