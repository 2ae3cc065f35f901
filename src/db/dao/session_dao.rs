use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::{prelude::Session, session};

#[derive(Clone)]
pub struct SessionDao {
    db: DatabaseConnection,
}

impl DaoBase for SessionDao {
    type Entity = Session;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTimeWithTimeZone,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl SessionDao {
    pub async fn create_session(
        &self,
        new: NewSession,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<session::Model> {
        let model = session::ActiveModel {
            token: Set(new.token),
            user_id: Set(new.user_id),
            expires_at: Set(new.expires_at),
            ip_address: Set(new.ip_address),
            user_agent: Set(new.user_agent),
            ..Default::default()
        };
        self.insert_model(Uuid::new_v4(), now, model).await
    }

    pub async fn find_by_token(&self, token: &str) -> DaoResult<Option<session::Model>> {
        let token = token.to_string();
        self.find_one(move |query| query.filter(session::Column::Token.eq(token)))
            .await
    }

    /// Moves the sliding expiry forward and stamps `updated_at` with `now`.
    pub async fn extend(
        &self,
        id: &Uuid,
        expires_at: DateTimeWithTimeZone,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<session::Model> {
        self.update_at(*id, now, move |active| {
            active.expires_at = Set(expires_at);
        })
        .await
    }

    pub async fn delete_by_token(&self, token: &str) -> DaoResult<u64> {
        let result = Session::delete_many()
            .filter(session::Column::Token.eq(token))
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;
        Ok(result.rows_affected)
    }

    pub async fn delete_expired(&self, now: DateTimeWithTimeZone) -> DaoResult<u64> {
        let result = Session::delete_many()
            .filter(session::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;
        Ok(result.rows_affected)
    }

    pub async fn count_active(&self, now: DateTimeWithTimeZone) -> DaoResult<u64> {
        Session::find()
            .filter(session::Column::ExpiresAt.gt(now))
            .count(&self.db)
            .await
            .map_err(DaoLayerError::Db)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use crate::db::entities::session;

    use super::SessionDao;
    use crate::db::dao::{DaoBase, DaoLayerError};

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn session_model(token: &str, user_id: Uuid) -> session::Model {
        session::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            token: token.to_string(),
            user_id,
            expires_at: ts() + Duration::days(7),
            ip_address: Some("203.0.113.7".to_string()),
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn find_by_token_returns_session_when_present() {
        let user_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session_model("session-1", user_id)]])
            .into_connection();
        let dao = SessionDao::new(&db);

        let found = dao
            .find_by_token("session-1")
            .await
            .expect("query should succeed")
            .expect("session should exist");

        assert_eq!(found.user_id, user_id);
        assert_eq!(found.token, "session-1");
    }

    #[tokio::test]
    async fn delete_by_token_reports_rows_affected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let dao = SessionDao::new(&db);

        let removed = dao
            .delete_by_token("session-1")
            .await
            .expect("delete should succeed");

        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn delete_expired_maps_database_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_errors([DbErr::Custom("delete failed".to_string())])
            .into_connection();
        let dao = SessionDao::new(&db);

        let err = dao
            .delete_expired(ts())
            .await
            .expect_err("delete should fail");

        assert!(matches!(err, DaoLayerError::Db(_)));
    }
}
