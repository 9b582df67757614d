use rapido_core::CoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

/// Connection-pooled access to Postgres
#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    /// Callers wait for a free connection once `max_connections` are checked
    /// out. The wait is bounded by `acquire_timeout_seconds`: past it the
    /// request fails with `PoolTimedOut` (a 500) instead of blocking forever.
    /// Raise the setting to approximate an unbounded wait.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        info!("Connected to Postgres");
        Ok(())
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Which statement failed, for mapping constraint violations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Statement {
    Select,
    Insert,
    Delete,
}

/// Map a statement error outside a transaction to a `CoreError`.
///
/// A foreign-key violation means a missing parent on insert and a
/// still-referenced row on delete.
pub(crate) fn map_db_error(err: sqlx::Error, statement: Statement, what: &str) -> CoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return CoreError::ConflictError(format!("{} already exists", what));
        }
        if db_err.is_foreign_key_violation() {
            return match statement {
                Statement::Delete => CoreError::ConflictError(format!("{} is still referenced", what)),
                _ => CoreError::NotFoundError(format!("{} references a missing record", what)),
            };
        }
    }
    CoreError::InternalError(err.to_string())
}

/// Map a failure inside a multi-statement transaction
pub(crate) fn tx_error(err: sqlx::Error) -> CoreError {
    CoreError::TransactionError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    /// Postgres-style error carrying only a SQLSTATE code
    #[derive(Debug)]
    struct PgStateError(&'static str);

    impl fmt::Display for PgStateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "SQLSTATE {}", self.0)
        }
    }

    impl StdError for PgStateError {}

    impl DatabaseError for PgStateError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                "23505" => ErrorKind::UniqueViolation,
                "23503" => ErrorKind::ForeignKeyViolation,
                "23514" => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgStateError(code)))
    }

    #[test]
    fn test_unique_violation_is_conflict() {
        let err = map_db_error(db_error("23505"), Statement::Insert, "client with cpf 12345678901");
        match err {
            CoreError::ConflictError(msg) => assert!(msg.contains("12345678901")),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_key_violation_depends_on_statement() {
        let err = map_db_error(db_error("23503"), Statement::Insert, "order for client 4");
        assert!(matches!(err, CoreError::NotFoundError(_)));

        let err = map_db_error(db_error("23503"), Statement::Delete, "client 4");
        assert!(matches!(err, CoreError::ConflictError(_)));
    }

    #[test]
    fn test_other_failures_are_internal() {
        let err = map_db_error(db_error("23514"), Statement::Insert, "order");
        assert!(matches!(err, CoreError::InternalError(_)));

        let err = map_db_error(sqlx::Error::PoolTimedOut, Statement::Select, "order");
        assert!(matches!(err, CoreError::InternalError(_)));
    }

    #[test]
    fn test_transaction_failures() {
        assert!(matches!(tx_error(db_error("23505")), CoreError::TransactionError(_)));
        assert!(matches!(tx_error(sqlx::Error::PoolClosed), CoreError::TransactionError(_)));
    }
}
