use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{IdentitySource, guards::AuthGuard},
    error::AppError,
    response::ApiResult,
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub source: String,
    /// Role frozen into the presented token, if any. Informational only.
    pub role_claim: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/me", get(me)).with_state(state)
}

async fn me(
    State(state): State<Arc<AppState>>,
    AuthGuard(identity): AuthGuard,
) -> ApiResult<MeResponse> {
    let services = state.services();
    let user = services
        .user()
        .find_by_id(&identity.user_id)
        .await?
        .ok_or_else(AppError::authentication_required)?;
    let rbac = services.rbac();
    let roles = rbac.get_user_roles(&user.id).await?;
    let permissions = rbac.get_user_permissions(&user.id).await?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        source: match identity.source {
            IdentitySource::Bearer => "bearer".to_string(),
            IdentitySource::Session => "session".to_string(),
        },
        role_claim: identity.role_claim,
        roles: roles.into_iter().collect(),
        permissions: permissions.into_iter().collect(),
    }))
}
