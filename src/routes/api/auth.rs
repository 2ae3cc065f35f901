use std::{collections::BTreeSet, net::SocketAddr, sync::Arc};

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    routing::post,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{
        TokenBundle,
        cookies::{ACCESS_COOKIE, REFRESH_COOKIE, auth_cookie, read_cookie, removal_cookie},
        session::ClientMeta,
    },
    db::entities::user,
    error::AppError,
    middleware::RenewalSlot,
    response::{ApiResult, SuccessBody},
    services::auth_service::{AuthSession, SignUpInput},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

impl UserSummary {
    pub fn new(user: &user::Model, roles: &BTreeSet<String>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            roles: roles.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub user: UserSummary,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserSummary,
}

/// Caller address and user agent. The address is the socket peer; the first
/// `x-forwarded-for` hop is used instead only when
/// `rate_limit.trust_forwarded_for` is set.
pub struct ClientInfo {
    pub meta: ClientMeta,
    pub key: String,
}

impl FromRequestParts<Arc<AppState>> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let ip_address = if state.config.rate_limit.trust_forwarded_for {
            forwarded_for(&parts.headers).or(peer)
        } else {
            peer
        };
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(Self {
            key: ip_address.clone().unwrap_or_else(|| "unknown".to_string()),
            meta: ClientMeta {
                ip_address,
                user_agent,
            },
        })
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/refresh", post(refresh))
        .route("/auth/token", post(issue_token))
        .with_state(state)
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    jar: CookieJar,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), AppError> {
    throttle(&state, "sign-up", &client.key)?;
    let signed_up = state
        .auth_service()
        .sign_up(
            SignUpInput {
                email: body.email,
                name: body.name,
                password: body.password,
            },
            client.meta,
        )
        .await?;

    let (jar, response) = session_response(&state, jar, signed_up);
    Ok((StatusCode::CREATED, jar, response))
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    throttle(&state, "sign-in", &client.key)?;
    let signed_in = state
        .auth_service()
        .sign_in(&body.email, &body.password, client.meta)
        .await?;

    Ok(session_response(&state, jar, signed_in))
}

async fn sign_out(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SuccessBody>), AppError> {
    let cookie_name = state.config.session.cookie_name.clone();
    let token = jar.get(&cookie_name).map(|cookie| cookie.value().to_string());
    state.auth_service().sign_out(token.as_deref()).await?;

    let secure = state.auth.secure_cookies;
    let jar = jar
        .add(removal_cookie(&cookie_name, secure))
        .add(removal_cookie(ACCESS_COOKIE, secure))
        .add(removal_cookie(REFRESH_COOKIE, secure));
    Ok((jar, Json(SuccessBody::new("Signed out"))))
}

/// Refresh token from the JSON body (`refreshToken`) or the `refresh_token`
/// cookie.
async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<TokenPairResponse>), AppError> {
    let request: RefreshRequest = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|_| AppError::bad_request("Invalid request body"))?
    };
    let token = request
        .refresh_token
        .filter(|token| !token.is_empty())
        .or_else(|| read_cookie(&headers, REFRESH_COOKIE))
        .ok_or_else(|| AppError::unauthorized("Unauthorized"))?;

    let (_, tokens) = state.auth_service().refresh(&token).await?;
    let jar = with_token_cookies(&state, jar, &tokens);
    Ok((
        jar,
        Json(TokenPairResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type.to_string(),
            expires_in: tokens.expires_in,
        }),
    ))
}

/// Long-lived bearer token for API clients. Only a session cookie can mint
/// one, so a leaked bearer token cannot extend itself.
async fn issue_token(
    State(state): State<Arc<AppState>>,
    renewal: Option<Extension<RenewalSlot>>,
    headers: HeaderMap,
) -> ApiResult<ApiTokenResponse> {
    let identity = state
        .identity
        .resolve_with("session", &headers)
        .await?
        .ok_or_else(AppError::authentication_required)?;
    if let Some(Extension(slot)) = renewal {
        slot.offer(&identity);
    }
    throttle(&state, "api-token", &identity.user_id.to_string())?;

    let issued = state
        .auth_service()
        .issue_api_token(&identity.user_id)
        .await?;
    Ok(Json(ApiTokenResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
        user: UserSummary::new(&issued.user, &issued.roles),
    }))
}

fn throttle(state: &AppState, scope: &str, key: &str) -> Result<(), AppError> {
    if state.rate_limiter.allow(&format!("{scope}:{key}")) {
        Ok(())
    } else {
        Err(AppError::too_many_requests())
    }
}

fn session_response(
    state: &AppState,
    jar: CookieJar,
    established: AuthSession,
) -> (CookieJar, Json<SessionResponse>) {
    let session_cookie = auth_cookie(
        &state.config.session.cookie_name,
        established.session.token.clone(),
        state.config.session.ttl_secs,
        state.auth.secure_cookies,
    );
    let jar = with_token_cookies(state, jar.add(session_cookie), &established.tokens);

    let body = SessionResponse {
        success: true,
        user: UserSummary::new(&established.user, &established.roles),
        access_token: established.tokens.access_token,
        refresh_token: established.tokens.refresh_token,
        token_type: established.tokens.token_type.to_string(),
        expires_in: established.tokens.expires_in,
    };
    (jar, Json(body))
}

fn with_token_cookies(state: &AppState, jar: CookieJar, tokens: &TokenBundle) -> CookieJar {
    let secure = state.auth.secure_cookies;
    jar.add(auth_cookie(
        ACCESS_COOKIE,
        tokens.access_token.clone(),
        state.auth.access_ttl_secs,
        secure,
    ))
    .add(auth_cookie(
        REFRESH_COOKIE,
        tokens.refresh_token.clone(),
        state.auth.refresh_ttl_secs,
        secure,
    ))
}
