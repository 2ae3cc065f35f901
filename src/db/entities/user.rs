use base_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

/// `role` mirrors the highest-precedence row in `user_roles`. It is rewritten by
/// the RBAC service on every assignment change and is never read for
/// authorization decisions.
#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub role: String,
    pub password_hash: Option<String>,
    #[sea_orm(default_value = false)]
    pub email_verified: bool,
    #[sea_orm(has_many)]
    pub sessions: HasMany<super::session::Entity>,
    #[sea_orm(has_many)]
    pub user_roles: HasMany<super::user_role::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
