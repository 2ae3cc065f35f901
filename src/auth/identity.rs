//! Resolving "who is calling" from a request.
//!
//! Strategies run in order and the first one that yields an identity wins.
//! The standard order is bearer token, then session cookie, so a request
//! carrying both is attributed to the token's subject.
//!
//! A bearer identity keeps the token's `role` as `role_claim`. That value was
//! frozen when the token was issued and may no longer match the store; guards
//! never consult it and always re-read roles by `user_id`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use uuid::Uuid;

use super::{
    cookies::{ACCESS_COOKIE, read_cookie},
    jwt::TokenCodec,
    session::SessionResolver,
    types::{Identity, IdentitySource, SessionRenewal},
};
use crate::error::AppError;

#[async_trait]
pub trait IdentityStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Missing or malformed credentials are `Ok(None)`. Errors are reserved
    /// for infrastructure failures.
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Identity>, AppError>;
}

/// Access token from `Authorization: Bearer`, else from the `access_token`
/// cookie. Refresh tokens never authenticate a request.
pub struct BearerTokenStrategy {
    codec: Arc<TokenCodec>,
}

impl BearerTokenStrategy {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    fn identity_from(&self, token: &str) -> Option<Identity> {
        let claims = self.codec.verify(token)?;
        if claims.is_refresh() {
            tracing::debug!("refresh token presented as access token");
            return None;
        }
        let user_id = Uuid::parse_str(&claims.sub).ok()?;
        Some(Identity {
            user_id,
            email: claims.email,
            role_claim: (!claims.role.is_empty()).then_some(claims.role),
            source: IdentitySource::Bearer,
            renewal: None,
        })
    }
}

#[async_trait]
impl IdentityStrategy for BearerTokenStrategy {
    fn name(&self) -> &'static str {
        "bearer"
    }

    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Identity>, AppError> {
        if let Some(identity) = bearer_token(headers).and_then(|token| self.identity_from(token)) {
            return Ok(Some(identity));
        }
        Ok(read_cookie(headers, ACCESS_COOKIE).and_then(|token| self.identity_from(&token)))
    }
}

pub struct SessionCookieStrategy {
    sessions: SessionResolver,
    cookie_name: String,
}

impl SessionCookieStrategy {
    pub fn new(sessions: SessionResolver, cookie_name: impl Into<String>) -> Self {
        Self {
            sessions,
            cookie_name: cookie_name.into(),
        }
    }
}

#[async_trait]
impl IdentityStrategy for SessionCookieStrategy {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Identity>, AppError> {
        let Some(raw) = read_cookie(headers, &self.cookie_name) else {
            return Ok(None);
        };
        let Some(resolved) = self.sessions.resolve_session(&raw).await? else {
            return Ok(None);
        };
        let renewal = resolved.refreshed.then(|| SessionRenewal {
            max_age_secs: self.sessions.remaining_secs(&resolved.session),
            token: raw,
        });
        Ok(Some(Identity {
            user_id: resolved.user.id,
            email: resolved.user.email,
            role_claim: None,
            source: IdentitySource::Session,
            renewal,
        }))
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    strategies: Vec<Arc<dyn IdentityStrategy>>,
}

impl IdentityResolver {
    pub fn new(strategies: Vec<Arc<dyn IdentityStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn standard(codec: Arc<TokenCodec>, sessions: SessionResolver, cookie_name: &str) -> Self {
        Self::new(vec![
            Arc::new(BearerTokenStrategy::new(codec)),
            Arc::new(SessionCookieStrategy::new(sessions, cookie_name)),
        ])
    }

    /// `Ok(None)` means anonymous.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Identity>, AppError> {
        for strategy in &self.strategies {
            if let Some(identity) = strategy.resolve(headers).await? {
                tracing::debug!(
                    strategy = strategy.name(),
                    user_id = %identity.user_id,
                    "identity resolved"
                );
                return Ok(Some(identity));
            }
        }
        Ok(None)
    }

    /// Like `resolve`, restricted to one strategy by name.
    pub async fn resolve_with(
        &self,
        name: &str,
        headers: &HeaderMap,
    ) -> Result<Option<Identity>, AppError> {
        for strategy in self.strategies.iter().filter(|s| s.name() == name) {
            if let Some(identity) = strategy.resolve(headers).await? {
                return Ok(Some(identity));
            }
        }
        Ok(None)
    }
}

/// `Bearer <token>`; anything else (other schemes, non-ASCII, empty) is absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use axum::http::{HeaderMap, HeaderValue, header};
    use uuid::Uuid;

    use super::{BearerTokenStrategy, IdentityResolver, IdentityStrategy, bearer_token};
    use crate::{
        auth::{ClaimSet, Identity, IdentitySource, clock::ManualClock, jwt::TokenCodec},
        error::AppError,
    };

    struct Fixed(Option<Identity>, &'static str);

    #[async_trait]
    impl IdentityStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.1
        }

        async fn resolve(&self, _headers: &HeaderMap) -> Result<Option<Identity>, AppError> {
            Ok(self.0.clone())
        }
    }

    fn identity(source: IdentitySource) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".into(),
            role_claim: None,
            source,
            renewal: None,
        }
    }

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(
            b"identity-test",
            Arc::new(ManualClock::at_unix(1_700_000_000)),
        ))
    }

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn first_strategy_with_identity_wins() {
        let bearer = identity(IdentitySource::Bearer);
        let resolver = IdentityResolver::new(vec![
            Arc::new(Fixed(None, "empty")),
            Arc::new(Fixed(Some(bearer.clone()), "bearer")),
            Arc::new(Fixed(Some(identity(IdentitySource::Session)), "session")),
        ]);

        let resolved = resolver.resolve(&HeaderMap::new()).await.unwrap();
        assert_eq!(resolved, Some(bearer));
    }

    #[tokio::test]
    async fn no_strategy_means_anonymous() {
        let resolver = IdentityResolver::new(vec![Arc::new(Fixed(None, "empty"))]);
        assert!(resolver.resolve(&HeaderMap::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bearer_strategy_keeps_role_claim_and_rejects_refresh_tokens() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let claims = ClaimSet::new(&user_id, "a@example.com", "admin");
        let access = codec.issue(&claims, Duration::from_secs(60)).unwrap();
        let refresh = codec.issue_refresh(&claims).unwrap();
        let strategy = BearerTokenStrategy::new(codec);

        let resolved = strategy
            .resolve(&with_auth(&format!("Bearer {access}")))
            .await
            .unwrap()
            .expect("access token resolves");
        assert_eq!(resolved.user_id, user_id);
        assert_eq!(resolved.role_claim.as_deref(), Some("admin"));
        assert_eq!(resolved.source, IdentitySource::Bearer);

        let refused = strategy
            .resolve(&with_auth(&format!("Bearer {refresh}")))
            .await
            .unwrap();
        assert!(refused.is_none());
    }

    #[tokio::test]
    async fn bearer_strategy_falls_back_to_access_cookie() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let token = codec
            .issue(
                &ClaimSet::new(&user_id, "a@example.com", "user"),
                Duration::from_secs(60),
            )
            .unwrap();
        let mut headers = with_auth("Bearer garbage");
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("access_token={token}")).unwrap(),
        );

        let resolved = BearerTokenStrategy::new(codec)
            .resolve(&headers)
            .await
            .unwrap();
        assert_eq!(resolved.map(|identity| identity.user_id), Some(user_id));
    }

    #[test]
    fn malformed_authorization_headers_are_absent() {
        assert_eq!(bearer_token(&with_auth("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&with_auth("Basic abc")), None);
        assert_eq!(bearer_token(&with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&with_auth("bearer abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
