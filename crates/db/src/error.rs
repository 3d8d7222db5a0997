use thiserror::Error;

/// Result type alias for store operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised while talking to the relational store.
#[derive(Debug, Error)]
pub enum DbError {
    /// Driver, pool or query failure.
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),

    /// A migration script failed to apply.
    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },
}

impl DbError {
    /// True when the failure is a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Sqlx(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}
