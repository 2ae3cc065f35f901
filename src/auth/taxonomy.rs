//! Built-in roles and permissions. The role -> permission mapping here is the
//! source of truth; seeding rewrites the junction table to match it.

use uuid::Uuid;

use super::Role;

const ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b0e_8d4a_4c57_9a3e_51d2_7e0b_c4a1);

pub const USER_PERMISSIONS: &[&str] = &["read:products", "read:orders", "write:orders"];

pub const MODERATOR_PERMISSIONS: &[&str] = &[
    "write:products",
    "read:users",
    "moderate:reviews",
    "read:analytics",
];

pub const ADMIN_PERMISSIONS: &[&str] = &[
    "delete:products",
    "write:users",
    "delete:users",
    "manage:roles",
    "write:settings",
];

pub fn description(role: Role) -> &'static str {
    match role {
        Role::Admin => "Full access to the store and its users",
        Role::Moderator => "Manages catalogue content and community",
        Role::User => "Regular customer account",
    }
}

/// Permissions granted to `role`, including everything inherited from the
/// roles below it.
pub fn permissions_for(role: Role) -> Vec<&'static str> {
    let mut out = USER_PERMISSIONS.to_vec();
    if role >= Role::Moderator {
        out.extend_from_slice(MODERATOR_PERMISSIONS);
    }
    if role >= Role::Admin {
        out.extend_from_slice(ADMIN_PERMISSIONS);
    }
    out
}

pub fn all_permissions() -> Vec<&'static str> {
    permissions_for(Role::Admin)
}

/// Splits `action:resource`.
pub fn split_permission(name: &str) -> Option<(&str, &str)> {
    let (action, resource) = name.split_once(':')?;
    if action.is_empty() || resource.is_empty() {
        return None;
    }
    Some((action, resource))
}

/// Stable across runs and databases so seeding can detect existing rows.
pub fn role_id(role: Role) -> Uuid {
    Uuid::new_v5(&ID_NAMESPACE, format!("role:{}", role.as_str()).as_bytes())
}

pub fn permission_id(name: &str) -> Uuid {
    Uuid::new_v5(&ID_NAMESPACE, format!("permission:{name}").as_bytes())
}
