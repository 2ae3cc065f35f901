use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::{prelude::User, user};

#[derive(Clone)]
pub struct UserDao {
    db: DatabaseConnection,
}

impl DaoBase for UserDao {
    type Entity = User;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl UserDao {
    pub async fn find_by_email(&self, email: &str) -> DaoResult<Option<user::Model>> {
        let email = email.to_string();
        self.find_one(move |query| query.filter(user::Column::Email.eq(email)))
            .await
    }

    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: Option<&str>,
        role: &str,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<user::Model> {
        let model = user::ActiveModel {
            email: Set(email.to_string()),
            name: Set(name.to_string()),
            role: Set(role.to_string()),
            password_hash: Set(password_hash.map(str::to_string)),
            email_verified: Set(false),
            ..Default::default()
        };
        self.insert_model(Uuid::new_v4(), now, model).await
    }

    pub async fn set_role(
        &self,
        id: &Uuid,
        role: &str,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<user::Model> {
        let role = role.to_string();
        self.update_at(*id, now, move |active| {
            active.role = Set(role);
        })
        .await
    }

    /// Returns the number of rows removed. Sessions and role assignments
    /// cascade.
    pub async fn delete_user(&self, id: &Uuid) -> DaoResult<u64> {
        let result = User::delete_by_id(*id)
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;
        Ok(result.rows_affected)
    }

    pub async fn count_users(&self) -> DaoResult<u64> {
        User::find()
            .count(&self.db)
            .await
            .map_err(DaoLayerError::Db)
    }
}
