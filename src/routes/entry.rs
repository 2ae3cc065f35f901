use std::sync::Arc;

use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    middleware::{
        SessionCookieSettings, catch_panic_layer, json_error_middleware, renew_session_cookie,
        strip_identity_headers,
    },
    state::AppState,
};

use super::{api, views};

pub const API_PREFIX: &str = "/api";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest(API_PREFIX, api::router(state.clone()))
        .merge(views::router(state))
}

/// Router plus the HTTP middleware stack used in production and tests.
pub fn app(state: Arc<AppState>) -> Router {
    let session_cookie = SessionCookieSettings {
        name: state.config.session.cookie_name.clone(),
        secure: state.auth.secure_cookies,
    };
    router(state)
        .layer(middleware::from_fn_with_state(
            session_cookie,
            renew_session_cookie,
        ))
        .layer(middleware::from_fn(strip_identity_headers))
        .layer(middleware::from_fn(json_error_middleware))
        .layer(catch_panic_layer())
        .layer(TraceLayer::new_for_http())
}
