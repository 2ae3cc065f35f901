use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{
        AdminRole, Identity, Role,
        guards::{AuthRoleGuard, MatchMode, RequirePolicyLayer, RoutePolicy, ensure_not_self_lockout},
    },
    error::AppError,
    response::ApiResult,
    services::rbac_service::RoleSummary,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeRequest {
    pub user_id: Uuid,
    pub role_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeResponse {
    pub success: bool,
    pub message: String,
    pub changed: bool,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRolesResponse {
    pub user_id: Uuid,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub users: u64,
    pub active_sessions: u64,
    pub roles: Vec<RoleCount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCount {
    pub name: String,
    pub user_count: u64,
}

pub fn router(state: Arc<AppState>) -> Router {
    let read = Router::new()
        .route("/admin/users/{id}/roles", get(user_roles))
        .route("/admin/roles", get(list_roles))
        .route_layer(RequirePolicyLayer::new(
            state.clone(),
            RoutePolicy::role(Role::Admin),
        ));

    let manage = Router::new()
        .route("/admin/roles/assign", post(assign_role))
        .route("/admin/roles/remove", post(remove_role))
        .route_layer(RequirePolicyLayer::new(
            state.clone(),
            RoutePolicy::role(Role::Admin).with_permissions(["manage:roles"], MatchMode::All),
        ));

    Router::new()
        .merge(read)
        .merge(manage)
        .route("/admin/stats", get(stats))
        .with_state(state)
}

fn parse_role_name(name: &str) -> Result<Role, AppError> {
    Role::try_from(name).map_err(|_| AppError::bad_request("Invalid role name"))
}

async fn user_roles(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<UserRolesResponse> {
    let services = state.services();
    if services.user().find_by_id(&user_id).await?.is_none() {
        return Err(AppError::bad_request("User not found"));
    }
    let rbac = services.rbac();
    let roles = rbac.get_user_roles(&user_id).await?;
    let permissions = rbac.get_user_permissions(&user_id).await?;

    Ok(Json(UserRolesResponse {
        user_id,
        roles: roles.into_iter().collect(),
        permissions: permissions.into_iter().collect(),
    }))
}

async fn list_roles(State(state): State<Arc<AppState>>) -> ApiResult<Vec<RoleSummary>> {
    Ok(Json(state.services().rbac().list_roles().await?))
}

async fn assign_role(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Identity>,
    Json(body): Json<RoleChangeRequest>,
) -> ApiResult<RoleChangeResponse> {
    let role = parse_role_name(&body.role_name)?;
    let rbac = state.services().rbac();
    let changed = rbac.assign_role(&body.user_id, role.as_str()).await?;
    tracing::info!(
        caller = %caller.user_id,
        target = %body.user_id,
        role = %role,
        changed,
        "admin assigned role"
    );

    let roles = rbac.get_user_roles(&body.user_id).await?;
    Ok(Json(RoleChangeResponse {
        success: true,
        message: format!("Role {role} assigned"),
        changed,
        roles: roles.into_iter().collect(),
    }))
}

async fn remove_role(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Identity>,
    Json(body): Json<RoleChangeRequest>,
) -> ApiResult<RoleChangeResponse> {
    let role = parse_role_name(&body.role_name)?;
    ensure_not_self_lockout(&caller.user_id, &body.user_id, role.as_str())?;

    let rbac = state.services().rbac();
    let changed = rbac.remove_role(&body.user_id, role.as_str()).await?;
    tracing::info!(
        caller = %caller.user_id,
        target = %body.user_id,
        role = %role,
        changed,
        "admin removed role"
    );

    let roles = rbac.get_user_roles(&body.user_id).await?;
    Ok(Json(RoleChangeResponse {
        success: true,
        message: format!("Role {role} removed"),
        changed,
        roles: roles.into_iter().collect(),
    }))
}

async fn stats(
    State(state): State<Arc<AppState>>,
    AuthRoleGuard { identity, .. }: AuthRoleGuard<AdminRole>,
) -> ApiResult<StatsResponse> {
    let services = state.services();
    let users = services.user().count().await?;
    let active_sessions = services
        .sessions(&state.config.session)
        .count_active()
        .await?;
    let roles = services
        .rbac()
        .list_roles()
        .await?
        .into_iter()
        .map(|role| RoleCount {
            name: role.name,
            user_count: role.user_count,
        })
        .collect();
    tracing::debug!(admin = %identity.user_id, "stats requested");

    Ok(Json(StatsResponse {
        users,
        active_sessions,
        roles,
    }))
}
