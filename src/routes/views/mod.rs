use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod dashboard;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().merge(dashboard::router(state))
}
