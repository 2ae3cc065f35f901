use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{
        Identity, Role,
        guards::{AccessContext, MatchMode, RequirePolicyLayer, RoutePolicy},
    },
    response::{ApiResult, SuccessBody},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResponse {
    pub reviewer: String,
    pub acting_as: String,
    pub pending: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsResponse {
    pub requested_by: String,
    pub available: Vec<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let moderation = Router::new()
        .route("/backoffice/moderation", get(moderation_queue))
        .route_layer(RequirePolicyLayer::new(
            state.clone(),
            RoutePolicy::any_role([Role::Admin, Role::Moderator]),
        ));

    let reports = Router::new()
        .route("/backoffice/reports", get(reports))
        .route_layer(RequirePolicyLayer::new(
            state.clone(),
            RoutePolicy::permission("read:analytics"),
        ));

    let products = Router::new()
        .route("/backoffice/products/{id}", delete(delete_product))
        .route_layer(RequirePolicyLayer::new(
            state,
            RoutePolicy::authenticated()
                .with_permissions(["write:products", "delete:products"], MatchMode::All),
        ));

    Router::new().merge(moderation).merge(reports).merge(products)
}

async fn moderation_queue(
    Extension(identity): Extension<Identity>,
    Extension(access): Extension<AccessContext>,
) -> ApiResult<ModerationResponse> {
    Ok(Json(ModerationResponse {
        reviewer: identity.email,
        acting_as: access.primary_role.to_string(),
        pending: Vec::new(),
    }))
}

async fn reports(Extension(identity): Extension<Identity>) -> ApiResult<ReportsResponse> {
    Ok(Json(ReportsResponse {
        requested_by: identity.email,
        available: vec!["sales".to_string(), "traffic".to_string()],
    }))
}

/// The catalogue itself lives elsewhere; this acknowledges an authorized
/// delete.
async fn delete_product(
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<SuccessBody> {
    tracing::info!(user_id = %identity.user_id, product = %id, "product delete authorized");
    Ok(Json(SuccessBody::new(format!("Product {id} deleted"))))
}
