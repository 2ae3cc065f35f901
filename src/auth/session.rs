use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, distributions::DistString, thread_rng};
use uuid::Uuid;

use super::clock::SharedClock;
use crate::{
    config::SessionConfig,
    db::{
        dao::{DaoBase, DaoLayerError, NewSession, SessionDao, UserDao},
        entities::{session, user},
    },
    error::AppError,
};

const SESSION_TOKEN_LEN: usize = 48;

#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub user: user::Model,
    pub session: session::Model,
    /// Expiry was slid forward on this lookup; the client cookie needs the
    /// new lifetime.
    pub refreshed: bool,
}

/// Opaque, server-side sessions. Expiry slides forward on use, never past
/// `created_at + max_lifetime`, and the row is rewritten at most once per
/// `update_age`.
#[derive(Clone)]
pub struct SessionResolver {
    sessions: SessionDao,
    users: UserDao,
    clock: SharedClock,
    ttl: Duration,
    update_age: Duration,
    max_lifetime: Duration,
}

impl SessionResolver {
    pub fn new(
        sessions: SessionDao,
        users: UserDao,
        clock: SharedClock,
        cfg: &SessionConfig,
    ) -> Self {
        Self {
            sessions,
            users,
            clock,
            ttl: secs(cfg.ttl_secs),
            update_age: secs(cfg.update_age_secs),
            max_lifetime: secs(cfg.max_lifetime_secs),
        }
    }

    pub async fn create_session(
        &self,
        user_id: &Uuid,
        meta: ClientMeta,
    ) -> Result<session::Model, AppError> {
        let now = self.clock.now();
        let expires_at = now + self.ttl.min(self.max_lifetime);
        let token = Alphanumeric.sample_string(&mut thread_rng(), SESSION_TOKEN_LEN);

        let created = self
            .sessions
            .create_session(
                NewSession {
                    user_id: *user_id,
                    token,
                    expires_at: expires_at.fixed_offset(),
                    ip_address: meta.ip_address,
                    user_agent: meta.user_agent,
                },
                now.fixed_offset(),
            )
            .await?;

        tracing::info!(user_id = %user_id, session_id = %created.id, "session created");
        Ok(created)
    }

    /// `Ok(None)` for unknown, expired or orphaned sessions. Dead rows found
    /// here are removed.
    pub async fn resolve_session(
        &self,
        raw_token: &str,
    ) -> Result<Option<ResolvedSession>, AppError> {
        if raw_token.is_empty() {
            return Ok(None);
        }

        let Some(session) = self.sessions.find_by_token(raw_token).await? else {
            return Ok(None);
        };

        let now = self.clock.now();
        let hard_limit = self.hard_limit(&session);
        if session.expires_at.with_timezone(&Utc) <= now || hard_limit <= now {
            tracing::debug!(session_id = %session.id, "session expired");
            self.sessions.delete_by_token(raw_token).await?;
            return Ok(None);
        }

        let user = match self.users.find_by_id(session.user_id).await {
            Ok(user) => user,
            Err(DaoLayerError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let refreshed = now - session.updated_at.with_timezone(&Utc) >= self.update_age;
        let session = if refreshed {
            let expires_at = (now + self.ttl).min(hard_limit);
            self.sessions
                .extend(&session.id, expires_at.fixed_offset(), now.fixed_offset())
                .await?
        } else {
            session
        };

        Ok(Some(ResolvedSession {
            user,
            session,
            refreshed,
        }))
    }

    pub async fn revoke(&self, raw_token: &str) -> Result<bool, AppError> {
        let removed = self.sessions.delete_by_token(raw_token).await?;
        if removed > 0 {
            tracing::info!("session revoked");
        }
        Ok(removed > 0)
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let removed = self
            .sessions
            .delete_expired(self.clock.now().fixed_offset())
            .await?;
        Ok(removed)
    }

    pub async fn count_active(&self) -> Result<u64, AppError> {
        Ok(self
            .sessions
            .count_active(self.clock.now().fixed_offset())
            .await?)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Seconds until `session` expires, for a cookie `Max-Age`.
    pub fn remaining_secs(&self, session: &session::Model) -> u64 {
        let left = session.expires_at.with_timezone(&Utc) - self.clock.now();
        u64::try_from(left.num_seconds()).unwrap_or(0)
    }

    fn hard_limit(&self, session: &session::Model) -> DateTime<Utc> {
        session.created_at.with_timezone(&Utc) + self.max_lifetime
    }
}

// Keeps `now + window` far from chrono's overflow panic.
const MAX_WINDOW_SECS: i64 = 100 * 365 * 86_400;

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(MAX_WINDOW_SECS).min(MAX_WINDOW_SECS))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::SessionResolver;
    use crate::{
        auth::clock::ManualClock,
        config::SessionConfig,
        db::{
            dao::{DaoBase, SessionDao, UserDao},
            entities::{session, user},
        },
    };

    const START: i64 = 1_767_225_600;

    fn at(secs: i64) -> chrono::DateTime<chrono::FixedOffset> {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .unwrap()
            .fixed_offset()
    }

    fn session_row(created: i64, updated: i64, expires: i64, user_id: Uuid) -> session::Model {
        session::Model {
            id: Uuid::new_v4(),
            created_at: at(created),
            updated_at: at(updated),
            token: "tok".to_string(),
            user_id,
            expires_at: at(expires),
            ip_address: None,
            user_agent: None,
        }
    }

    fn user_row(id: Uuid) -> user::Model {
        user::Model {
            id,
            created_at: at(START),
            updated_at: at(START),
            email: "shopper@example.com".to_string(),
            name: "Shopper".to_string(),
            role: "user".to_string(),
            password_hash: None,
            email_verified: true,
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            cookie_name: "session_token".to_string(),
            ttl_secs: 7 * 86_400,
            update_age_secs: 86_400,
            max_lifetime_secs: 30 * 86_400,
        }
    }

    fn resolver(db: &sea_orm::DatabaseConnection, now: i64) -> SessionResolver {
        SessionResolver::new(
            SessionDao::new(db),
            UserDao::new(db),
            Arc::new(ManualClock::at_unix(now)),
            &config(),
        )
    }

    #[tokio::test]
    async fn fresh_session_resolves_without_write() {
        let user_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session_row(START, START, START + 7 * 86_400, user_id)]])
            .append_query_results([[user_row(user_id)]])
            .into_connection();

        let resolved = resolver(&db, START + 3600)
            .resolve_session("tok")
            .await
            .unwrap()
            .expect("session should resolve");

        assert_eq!(resolved.user.id, user_id);
        assert!(!resolved.refreshed);
        assert_eq!(resolved.session.expires_at, at(START + 7 * 86_400));
        assert_eq!(db.into_transaction_log().len(), 2);
    }

    #[tokio::test]
    async fn stale_session_slides_expiry_within_hard_limit() {
        let user_id = Uuid::new_v4();
        let now = START + 25 * 86_400;
        let row = session_row(START, START + 20 * 86_400, START + 27 * 86_400, user_id);
        let mut extended = row.clone();
        extended.expires_at = at(START + 30 * 86_400);
        extended.updated_at = at(now);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row.clone()]])
            .append_query_results([[user_row(user_id)]])
            .append_query_results([[row]])
            .append_query_results([[extended]])
            .into_connection();

        let resolver = resolver(&db, now);
        let resolved = resolver
            .resolve_session("tok")
            .await
            .unwrap()
            .expect("session should resolve");

        assert!(resolved.refreshed);
        assert_eq!(resolved.session.expires_at, at(START + 30 * 86_400));
        assert_eq!(resolver.remaining_secs(&resolved.session), 5 * 86_400);
    }

    #[tokio::test]
    async fn expired_session_is_deleted_and_absent() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session_row(START, START, START + 60, Uuid::new_v4())]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let resolved = resolver(&db, START + 60).resolve_session("tok").await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn unknown_token_is_absent() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<session::Model>::new()])
            .into_connection();

        assert!(
            resolver(&db, START)
                .resolve_session("missing")
                .await
                .unwrap()
                .is_none()
        );
    }
}
