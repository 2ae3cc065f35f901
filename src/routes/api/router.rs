use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

use super::{admin, auth, backoffice, me};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(auth::router(state.clone()))
        .merge(me::router(state.clone()))
        .merge(backoffice::router(state.clone()))
        .merge(admin::router(state))
}
