use std::sync::{Arc, OnceLock};

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};

use crate::auth::{Identity, SessionRenewal, cookies::auth_cookie};

/// Per-request slot a guard fills when the caller's session was slid forward.
#[derive(Clone, Default)]
pub struct RenewalSlot(Arc<OnceLock<SessionRenewal>>);

impl RenewalSlot {
    /// First renewal wins; later ones for the same request are the same token.
    pub fn offer(&self, identity: &Identity) {
        if let Some(renewal) = &identity.renewal {
            let _ = self.0.set(renewal.clone());
        }
    }

    fn get(&self) -> Option<&SessionRenewal> {
        self.0.get()
    }
}

/// Fills the slot from request extensions, if the renewal middleware is
/// installed.
pub fn offer_renewal(extensions: &axum::http::Extensions, identity: &Identity) {
    if let Some(slot) = extensions.get::<RenewalSlot>() {
        slot.offer(identity);
    }
}

#[derive(Clone)]
pub struct SessionCookieSettings {
    pub name: String,
    pub secure: bool,
}

/// Re-sends the session cookie with its new `Max-Age` after a sliding
/// refresh, unless the handler already set that cookie itself.
pub async fn renew_session_cookie(
    State(settings): State<SessionCookieSettings>,
    mut req: Request,
    next: Next,
) -> Response {
    let slot = RenewalSlot::default();
    req.extensions_mut().insert(slot.clone());
    let mut response = next.run(req).await;

    let Some(renewal) = slot.get() else {
        return response;
    };
    let prefix = format!("{}=", settings.name);
    let already_set = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix));
    if already_set {
        return response;
    }

    let cookie = auth_cookie(
        &settings.name,
        renewal.token.clone(),
        renewal.max_age_secs,
        settings.secure,
    );
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(err) => tracing::warn!(error = %err, "session cookie not renewed"),
    }
    response
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Router,
        body::Body,
        http::{Request, header},
        middleware,
        response::IntoResponse,
        routing::get,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::{RenewalSlot, SessionCookieSettings, renew_session_cookie};
    use crate::auth::{Identity, IdentitySource, SessionRenewal};

    fn identity(renewal: Option<SessionRenewal>) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "slide@example.com".into(),
            role_claim: None,
            source: IdentitySource::Session,
            renewal,
        }
    }

    fn app(renewal: Option<SessionRenewal>, handler_sets_cookie: bool) -> Router {
        let handler = move |Extension(slot): Extension<RenewalSlot>| {
            let renewal = renewal.clone();
            async move {
                slot.offer(&identity(renewal));
                if handler_sets_cookie {
                    [(header::SET_COOKIE, "session_token=; Max-Age=0")].into_response()
                } else {
                    "ok".into_response()
                }
            }
        };
        let settings = SessionCookieSettings {
            name: "session_token".into(),
            secure: false,
        };
        Router::new()
            .route("/", get(handler))
            .layer(middleware::from_fn_with_state(settings, renew_session_cookie))
    }

    async fn set_cookies(app: Router) -> Vec<String> {
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn renewed_session_gets_fresh_cookie() {
        let renewal = SessionRenewal {
            token: "tok".into(),
            max_age_secs: 3600,
        };
        let cookies = set_cookies(app(Some(renewal), false)).await;
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("session_token=tok"));
        assert!(cookies[0].contains("Max-Age=3600"));
        assert!(cookies[0].contains("HttpOnly"));
    }

    #[tokio::test]
    async fn no_renewal_means_no_cookie() {
        assert!(set_cookies(app(None, false)).await.is_empty());
    }

    #[tokio::test]
    async fn handler_cookie_is_not_overridden() {
        let renewal = SessionRenewal {
            token: "tok".into(),
            max_age_secs: 3600,
        };
        let cookies = set_cookies(app(Some(renewal), true)).await;
        assert_eq!(cookies, vec!["session_token=; Max-Age=0".to_string()]);
    }
}
