use std::collections::BTreeSet;

use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::prelude::{Permission, RolePermission};
use crate::db::entities::{permission, role_permission};

#[derive(Clone)]
pub struct PermissionDao {
    db: DatabaseConnection,
}

impl DaoBase for PermissionDao {
    type Entity = Permission;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl PermissionDao {
    pub async fn find_by_ids(&self, ids: Vec<Uuid>) -> DaoResult<Vec<permission::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(move |query| query.filter(permission::Column::Id.is_in(ids)))
            .await
    }

    pub async fn list_permissions(&self) -> DaoResult<Vec<permission::Model>> {
        self.find_all(|query| query).await
    }

    /// Inserts the permission unless a row with `id` already exists.
    pub async fn ensure_permission(
        &self,
        id: Uuid,
        name: &str,
        resource: &str,
        action: &str,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<bool> {
        let existing = Permission::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;
        if existing.is_some() {
            return Ok(false);
        }

        let model = permission::ActiveModel {
            name: Set(name.to_string()),
            resource: Set(resource.to_string()),
            action: Set(action.to_string()),
            ..Default::default()
        };
        self.insert_model(id, now, model).await?;
        Ok(true)
    }

    pub async fn permission_ids_for_roles(&self, role_ids: Vec<Uuid>) -> DaoResult<Vec<Uuid>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = RolePermission::find()
            .filter(role_permission::Column::RoleId.is_in(role_ids))
            .all(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;

        let unique: BTreeSet<Uuid> = rows.into_iter().map(|row| row.permission_id).collect();
        Ok(unique.into_iter().collect())
    }

    pub async fn list_role_permissions(&self) -> DaoResult<Vec<role_permission::Model>> {
        RolePermission::find()
            .all(&self.db)
            .await
            .map_err(DaoLayerError::Db)
    }

    /// Deletes every `role_permissions` row and writes `pairs` in one
    /// transaction, so readers never observe a half-written mapping.
    pub async fn replace_role_permissions(
        &self,
        pairs: &BTreeSet<(Uuid, Uuid)>,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<()> {
        let txn = self.db.begin().await.map_err(DaoLayerError::Db)?;

        RolePermission::delete_many()
            .exec(&txn)
            .await
            .map_err(DaoLayerError::Db)?;

        for (role_id, permission_id) in pairs {
            role_permission::ActiveModel {
                role_id: Set(*role_id),
                permission_id: Set(*permission_id),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(DaoLayerError::Db)?;
        }

        txn.commit().await.map_err(DaoLayerError::Db)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    use crate::db::entities::role_permission;

    use super::PermissionDao;
    use crate::db::dao::DaoBase;

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn grant(role_id: Uuid, permission_id: Uuid) -> role_permission::Model {
        role_permission::Model {
            created_at: ts(),
            role_id,
            permission_id,
        }
    }

    #[tokio::test]
    async fn permission_ids_for_roles_deduplicates_across_roles() {
        let admin = Uuid::new_v4();
        let moderator = Uuid::new_v4();
        let shared = Uuid::new_v4();
        let admin_only = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                grant(admin, shared),
                grant(admin, admin_only),
                grant(moderator, shared),
            ]])
            .into_connection();
        let dao = PermissionDao::new(&db);

        let ids = dao
            .permission_ids_for_roles(vec![admin, moderator])
            .await
            .expect("query should succeed");

        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&shared));
        assert!(ids.contains(&admin_only));
    }

    #[tokio::test]
    async fn permission_ids_for_roles_is_empty_without_roles() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let dao = PermissionDao::new(&db);

        let ids = dao
            .permission_ids_for_roles(Vec::new())
            .await
            .expect("empty lookup should succeed");

        assert!(ids.is_empty());
    }
}
