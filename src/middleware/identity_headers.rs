use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::auth::Identity;

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_EMAIL_HEADER: HeaderName = HeaderName::from_static("x-user-email");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

const IDENTITY_HEADERS: [HeaderName; 3] = [USER_ID_HEADER, USER_EMAIL_HEADER, USER_ROLE_HEADER];

/// Drops identity headers supplied by the client. Only the guard layer may
/// set them, after a successful check.
pub async fn strip_identity_headers(mut req: Request, next: Next) -> Response {
    for name in IDENTITY_HEADERS {
        if req.headers_mut().remove(&name).is_some() {
            tracing::debug!(header = %name, "dropped client-supplied identity header");
        }
    }
    next.run(req).await
}

/// `role` is the live primary role, not the token claim.
pub fn set_identity_headers<B>(req: &mut axum::http::Request<B>, identity: &Identity, role: &str) {
    let headers = req.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&identity.user_id.to_string()) {
        headers.insert(USER_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&identity.email) {
        headers.insert(USER_EMAIL_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(role) {
        headers.insert(USER_ROLE_HEADER, value);
    }
}
