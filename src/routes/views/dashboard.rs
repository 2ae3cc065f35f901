use std::sync::Arc;

use askama::Template;
use axum::{
    Extension, Router,
    http::StatusCode,
    response::Html,
    routing::get,
};

use crate::{
    auth::{
        Identity,
        guards::{AccessContext, RequirePolicyLayer, RoutePolicy},
    },
    state::AppState,
};

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    email: String,
    role: String,
}

type HtmlError = (StatusCode, Html<String>);

/// Browser route: anonymous callers are redirected to sign in.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route_layer(RequirePolicyLayer::new(state, RoutePolicy::authenticated()).browser())
}

async fn dashboard(
    Extension(identity): Extension<Identity>,
    Extension(access): Extension<AccessContext>,
) -> Result<Html<String>, HtmlError> {
    let rendered = DashboardTemplate {
        email: identity.email,
        role: access.primary_role.as_str().to_string(),
    }
    .render()
    .map_err(|err| {
        tracing::error!(error = %err, "failed to render dashboard");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("failed to render dashboard".to_string()),
        )
    })?;
    Ok(Html(rendered))
}
