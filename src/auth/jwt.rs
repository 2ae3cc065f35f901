use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::{
    clock::SharedClock,
    types::{ClaimSet, Claims, TokenType},
};
use crate::{config::AuthConfig, error::AppError};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs and verifies HS256 tokens. Expiry is checked against the injected
/// clock as `now < exp + leeway`, so with zero leeway a token is dead from
/// the second `exp` is reached.
#[derive(Clone)]
pub struct TokenCodec {
    enc: EncodingKey,
    dec: DecodingKey,
    clock: SharedClock,
    leeway_secs: u64,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], clock: SharedClock) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
            clock,
            leeway_secs: 0,
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    pub fn from_config(cfg: &AuthConfig, clock: SharedClock) -> Self {
        Self::new(cfg.jwt_secret.as_bytes(), clock)
            .with_leeway(cfg.token_leeway_secs)
            .with_refresh_ttl(Duration::from_secs(cfg.refresh_ttl_secs))
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn issue(&self, claims: &ClaimSet, ttl: Duration) -> Result<String, AppError> {
        self.sign(claims, ttl, None)
    }

    pub fn issue_refresh(&self, claims: &ClaimSet) -> Result<String, AppError> {
        self.sign(claims, self.refresh_ttl, Some(TokenType::Refresh))
    }

    /// `None` for a bad signature, foreign algorithm, malformed payload or
    /// expired token. Does not care whether the token is access or refresh.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = match decode::<Claims>(token, &self.dec, &validation) {
            Ok(data) => data.claims,
            Err(err) => {
                tracing::debug!(reason = %err, "token rejected");
                return None;
            }
        };

        let now = self.now_secs();
        if now >= claims.exp.saturating_add(self.leeway_secs) {
            tracing::debug!(sub = %claims.sub, exp = claims.exp, "token expired");
            return None;
        }

        Some(claims)
    }

    fn sign(
        &self,
        claims: &ClaimSet,
        ttl: Duration,
        t: Option<TokenType>,
    ) -> Result<String, AppError> {
        let iat = self.now_secs();
        let payload = Claims {
            sub: claims.sub.clone(),
            email: claims.email.clone(),
            role: claims.role.clone(),
            iat,
            exp: iat.saturating_add(ttl.as_secs()),
            t,
        };

        let mut header = Header::new(ALGORITHM);
        header.typ = Some("JWT".into());

        encode(&header, &payload, &self.enc)
            .map_err(|err| AppError::internal(format!("token encoding failed: {err}")))
    }

    fn now_secs(&self) -> u64 {
        u64::try_from(self.clock.unix()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use uuid::Uuid;

    use super::TokenCodec;
    use crate::auth::{
        ClaimSet, Claims,
        clock::{Clock, ManualClock},
    };

    const SECRET: &[u8] = b"unit-test-secret";
    const START: i64 = 1_700_000_000;

    fn codec() -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_unix(START));
        (TokenCodec::new(SECRET, clock.clone()), clock)
    }

    fn claim_set() -> ClaimSet {
        ClaimSet::new(&Uuid::new_v4(), "shopper@example.com", "admin")
    }

    #[test]
    fn verifies_within_ttl_and_fails_at_expiry() {
        let (codec, clock) = codec();
        let input = claim_set();
        let token = codec.issue(&input, Duration::from_secs(900)).unwrap();

        let claims = codec.verify(&token).expect("fresh token verifies");
        assert_eq!(claims.sub, input.sub);
        assert_eq!(claims.email, input.email);
        assert_eq!(claims.role, input.role);
        assert_eq!(claims.exp - claims.iat, 900);
        assert!(!claims.is_refresh());

        clock.advance(chrono::Duration::seconds(899));
        assert!(codec.verify(&token).is_some());

        clock.advance(chrono::Duration::seconds(1));
        assert!(codec.verify(&token).is_none(), "zero leeway rejects at exp");
    }

    #[test]
    fn leeway_extends_acceptance_window() {
        let (codec, clock) = codec();
        let codec = codec.with_leeway(30);
        let token = codec.issue(&claim_set(), Duration::from_secs(60)).unwrap();

        clock.advance(chrono::Duration::seconds(89));
        assert!(codec.verify(&token).is_some());
        clock.advance(chrono::Duration::seconds(1));
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn refresh_tokens_carry_discriminator() {
        let (codec, _) = codec();
        let codec = codec.with_refresh_ttl(Duration::from_secs(7 * 24 * 3600));
        let refresh = codec.issue_refresh(&claim_set()).unwrap();
        let access = codec.issue(&claim_set(), Duration::from_secs(60)).unwrap();

        let refresh_claims = codec.verify(&refresh).unwrap();
        assert!(refresh_claims.is_refresh());
        assert_eq!(refresh_claims.exp - refresh_claims.iat, 7 * 24 * 3600);
        assert!(!codec.verify(&access).unwrap().is_refresh());
    }

    #[test]
    fn any_flipped_byte_is_rejected() {
        let (codec, _) = codec();
        let token = codec.issue(&claim_set(), Duration::from_secs(60)).unwrap();

        for index in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            if bytes[index] == b'.' {
                continue;
            }
            bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            if tampered == token {
                continue;
            }
            assert!(
                codec.verify(&tampered).is_none(),
                "tampered byte {index} accepted"
            );
        }
    }

    #[test]
    fn other_algorithms_and_secrets_are_rejected() {
        let (codec, clock) = codec();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "x@example.com".into(),
            role: "admin".into(),
            iat: clock.unix() as u64,
            exp: clock.unix() as u64 + 600,
            t: None,
        };

        let hs512 = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(codec.verify(&hs512).is_none());

        let foreign = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"someone-else"),
        )
        .unwrap();
        assert!(codec.verify(&foreign).is_none());

        assert!(codec.verify("not-a-token").is_none());
        assert!(codec.verify("").is_none());
    }
}
