use std::collections::{BTreeMap, BTreeSet};

use sea_orm::entity::prelude::DateTimeWithTimeZone;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::{Role, clock::SharedClock, taxonomy},
    db::dao::{DaoBase, DaoLayerError, PermissionDao, RoleDao, UserDao},
    error::AppError,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub user_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: usize,
    pub permissions_created: usize,
    pub mappings: usize,
}

/// Authoritative role and permission lookups backed by `user_roles` and
/// `role_permissions`. Nothing is cached between calls.
#[derive(Clone)]
pub struct RbacService {
    users: UserDao,
    roles: RoleDao,
    permissions: PermissionDao,
    clock: SharedClock,
}

impl RbacService {
    pub fn new(
        users: UserDao,
        roles: RoleDao,
        permissions: PermissionDao,
        clock: SharedClock,
    ) -> Self {
        Self {
            users,
            roles,
            permissions,
            clock,
        }
    }

    pub async fn get_user_roles(&self, user_id: &Uuid) -> Result<BTreeSet<String>, AppError> {
        let role_ids = self.roles.role_ids_for_user(user_id).await?;
        let roles = self.roles.find_by_ids(role_ids).await?;
        Ok(roles.into_iter().map(|role| role.name).collect())
    }

    pub async fn get_user_permissions(
        &self,
        user_id: &Uuid,
    ) -> Result<BTreeSet<String>, AppError> {
        let role_ids = self.roles.role_ids_for_user(user_id).await?;
        let permission_ids = self.permissions.permission_ids_for_roles(role_ids).await?;
        let permissions = self.permissions.find_by_ids(permission_ids).await?;
        Ok(permissions
            .into_iter()
            .map(|permission| permission.name)
            .collect())
    }

    pub async fn has_role(&self, user_id: &Uuid, role: &str) -> Result<bool, AppError> {
        Ok(self.get_user_roles(user_id).await?.contains(role))
    }

    pub async fn has_permission(&self, user_id: &Uuid, permission: &str) -> Result<bool, AppError> {
        Ok(self.get_user_permissions(user_id).await?.contains(permission))
    }

    /// Highest-precedence role held, `user` when none.
    pub async fn primary_role(&self, user_id: &Uuid) -> Result<Role, AppError> {
        let roles = self.get_user_roles(user_id).await?;
        Ok(Role::primary(roles.iter().map(String::as_str)))
    }

    /// Idempotent. Returns whether a new assignment was written.
    pub async fn assign_role(&self, user_id: &Uuid, role_name: &str) -> Result<bool, AppError> {
        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| AppError::bad_request(format!("Role not found: {role_name}")))?;
        self.require_user(user_id).await?;

        let created = self
            .roles
            .insert_assignment(user_id, &role.id, self.now())
            .await?;
        if created {
            tracing::info!(user_id = %user_id, role = %role.name, "role assigned");
            self.refresh_role_cache(user_id).await?;
        }
        Ok(created)
    }

    /// Idempotent. Removing a role that is not held, or does not exist, is a
    /// successful no-op. Returns whether a row was deleted.
    pub async fn remove_role(&self, user_id: &Uuid, role_name: &str) -> Result<bool, AppError> {
        self.require_user(user_id).await?;
        let Some(role) = self.roles.find_by_name(role_name).await? else {
            return Ok(false);
        };

        let removed = self.roles.delete_assignment(user_id, &role.id).await? > 0;
        if removed {
            tracing::info!(user_id = %user_id, role = %role.name, "role removed");
            self.refresh_role_cache(user_id).await?;
        }
        Ok(removed)
    }

    /// Rewrites `users.role` from the junction table.
    pub async fn refresh_role_cache(&self, user_id: &Uuid) -> Result<(), AppError> {
        let primary = self.primary_role(user_id).await?;
        let user = self.users.find_by_id(*user_id).await?;
        if user.role != primary.as_str() {
            self.users
                .set_role(user_id, primary.as_str(), self.now())
                .await?;
        }
        Ok(())
    }

    /// Seeds the built-in roles and permissions (rows that already exist by id
    /// are left alone) and replaces the whole role -> permission mapping with
    /// the built-in one. Run before serving traffic.
    pub async fn initialize_rbac(&self) -> Result<SeedReport, AppError> {
        let mut report = SeedReport::default();
        let now = self.now();

        for role in Role::ALL {
            let created = self
                .roles
                .ensure_role(
                    taxonomy::role_id(role),
                    role.as_str(),
                    taxonomy::description(role),
                    now,
                )
                .await?;
            report.roles_created += usize::from(created);
        }

        for name in taxonomy::all_permissions() {
            let Some((action, resource)) = taxonomy::split_permission(name) else {
                return Err(AppError::internal(format!("malformed permission {name}")));
            };
            let created = self
                .permissions
                .ensure_permission(
                    taxonomy::permission_id(name),
                    name,
                    resource,
                    action,
                    now,
                )
                .await?;
            report.permissions_created += usize::from(created);
        }

        let pairs: BTreeSet<(Uuid, Uuid)> = Role::ALL
            .into_iter()
            .flat_map(|role| {
                taxonomy::permissions_for(role)
                    .into_iter()
                    .map(move |name| (taxonomy::role_id(role), taxonomy::permission_id(name)))
            })
            .collect();
        report.mappings = pairs.len();
        self.permissions
            .replace_role_permissions(&pairs, now)
            .await?;

        tracing::info!(
            roles_created = report.roles_created,
            permissions_created = report.permissions_created,
            mappings = report.mappings,
            "rbac initialized"
        );
        Ok(report)
    }

    pub async fn list_roles(&self) -> Result<Vec<RoleSummary>, AppError> {
        let roles = self.roles.list_roles().await?;
        let permission_names: BTreeMap<Uuid, String> = self
            .permissions
            .list_permissions()
            .await?
            .into_iter()
            .map(|permission| (permission.id, permission.name))
            .collect();

        let mut by_role: BTreeMap<Uuid, Vec<String>> = BTreeMap::new();
        for row in self.permissions.list_role_permissions().await? {
            if let Some(name) = permission_names.get(&row.permission_id) {
                by_role.entry(row.role_id).or_default().push(name.clone());
            }
        }

        let mut out = Vec::with_capacity(roles.len());
        for role in roles {
            let mut permissions = by_role.remove(&role.id).unwrap_or_default();
            permissions.sort();
            out.push(RoleSummary {
                user_count: self.roles.count_holders(&role.id).await?,
                id: role.id,
                name: role.name,
                description: role.description,
                permissions,
            });
        }
        Ok(out)
    }

    fn now(&self) -> DateTimeWithTimeZone {
        self.clock.now().fixed_offset()
    }

    async fn require_user(&self, user_id: &Uuid) -> Result<(), AppError> {
        match self.users.find_by_id(*user_id).await {
            Ok(_) => Ok(()),
            Err(DaoLayerError::NotFound { .. }) => Err(AppError::bad_request("User not found")),
            Err(err) => Err(err.into()),
        }
    }
}
