use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::prelude::{Role, UserRole};
use crate::db::entities::{role, user_role};

#[derive(Clone)]
pub struct RoleDao {
    db: DatabaseConnection,
}

impl DaoBase for RoleDao {
    type Entity = Role;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl RoleDao {
    pub async fn find_by_name(&self, name: &str) -> DaoResult<Option<role::Model>> {
        let name = name.to_string();
        self.find_one(move |query| query.filter(role::Column::Name.eq(name)))
            .await
    }

    pub async fn find_by_ids(&self, ids: Vec<Uuid>) -> DaoResult<Vec<role::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(move |query| query.filter(role::Column::Id.is_in(ids)))
            .await
    }

    pub async fn list_roles(&self) -> DaoResult<Vec<role::Model>> {
        self.find_all(|query| query).await
    }

    /// Inserts the role unless a row with `id` already exists. Existing rows are
    /// never modified. Returns whether a row was written.
    pub async fn ensure_role(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<bool> {
        let existing = Role::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;
        if existing.is_some() {
            return Ok(false);
        }

        let model = role::ActiveModel {
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            ..Default::default()
        };
        self.insert_model(id, now, model).await?;
        Ok(true)
    }

    pub async fn role_ids_for_user(&self, user_id: &Uuid) -> DaoResult<Vec<Uuid>> {
        let rows = UserRole::find()
            .filter(user_role::Column::UserId.eq(*user_id))
            .all(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;
        Ok(rows.into_iter().map(|row| row.role_id).collect())
    }

    pub async fn has_assignment(&self, user_id: &Uuid, role_id: &Uuid) -> DaoResult<bool> {
        let found = UserRole::find_by_id((*user_id, *role_id))
            .one(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;
        Ok(found.is_some())
    }

    /// Single-row insert into `user_roles`. Returns `false` when the pair was
    /// already present (including a concurrent insert that won the race).
    pub async fn insert_assignment(
        &self,
        user_id: &Uuid,
        role_id: &Uuid,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<bool> {
        if self.has_assignment(user_id, role_id).await? {
            return Ok(false);
        }

        let row = user_role::ActiveModel {
            user_id: Set(*user_id),
            role_id: Set(*role_id),
            created_at: Set(now),
            ..Default::default()
        };
        match row.insert(&self.db).await.map_err(DaoLayerError::Db) {
            Ok(_) => Ok(true),
            Err(err) if err.is_unique_violation() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Returns the number of rows removed (0 or 1).
    pub async fn delete_assignment(&self, user_id: &Uuid, role_id: &Uuid) -> DaoResult<u64> {
        let result = UserRole::delete_many()
            .filter(user_role::Column::UserId.eq(*user_id))
            .filter(user_role::Column::RoleId.eq(*role_id))
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;
        Ok(result.rows_affected)
    }

    pub async fn count_holders(&self, role_id: &Uuid) -> DaoResult<u64> {
        UserRole::find()
            .filter(user_role::Column::RoleId.eq(*role_id))
            .count(&self.db)
            .await
            .map_err(DaoLayerError::Db)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use crate::db::entities::{role, user_role};

    use super::RoleDao;
    use crate::db::dao::{DaoBase, DaoLayerError};

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn role_model(id: Uuid, name: &str) -> role::Model {
        role::Model {
            id,
            created_at: ts(),
            updated_at: ts(),
            name: name.to_string(),
            description: format!("{name} role"),
        }
    }

    fn assignment(user_id: Uuid, role_id: Uuid) -> user_role::Model {
        user_role::Model {
            created_at: ts(),
            user_id,
            role_id,
        }
    }

    #[tokio::test]
    async fn find_by_ids_skips_query_for_empty_input() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let dao = RoleDao::new(&db);

        let roles = dao
            .find_by_ids(Vec::new())
            .await
            .expect("empty lookup should succeed");

        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn ensure_role_leaves_existing_row_untouched() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[role_model(id, "admin")]])
            .into_connection();
        let dao = RoleDao::new(&db);

        let inserted = dao
            .ensure_role(id, "admin", "Administrator", ts())
            .await
            .expect("ensure should succeed");

        assert!(!inserted);
    }

    #[tokio::test]
    async fn insert_assignment_is_noop_when_pair_exists() {
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[assignment(user_id, role_id)]])
            .into_connection();
        let dao = RoleDao::new(&db);

        let inserted = dao
            .insert_assignment(&user_id, &role_id, ts())
            .await
            .expect("insert should succeed");

        assert!(!inserted);
    }

    #[tokio::test]
    async fn delete_assignment_reports_rows_affected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let dao = RoleDao::new(&db);

        let removed = dao
            .delete_assignment(&Uuid::new_v4(), &Uuid::new_v4())
            .await
            .expect("delete should succeed");

        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn role_ids_for_user_maps_database_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("select failed".to_string())])
            .into_connection();
        let dao = RoleDao::new(&db);

        let err = dao
            .role_ids_for_user(&Uuid::new_v4())
            .await
            .expect_err("query should fail");

        assert!(matches!(err, DaoLayerError::Db(_)));
    }
}
