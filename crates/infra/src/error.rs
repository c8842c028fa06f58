use thiserror::Error;
use uuid::Uuid;

/// Failures of operations that check business preconditions.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Conflict(String),

    #[error("spectator capacity reached for match {0}")]
    CapacityReached(Uuid),

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("database error")]
    Db(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl RepoError {
    /// Turns a unique violation into [`RepoError::Conflict`].
    pub fn on_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(message.into())
            }
            _ => RepoError::Db(err),
        }
    }

    pub fn validation(errors: Vec<String>) -> RepoResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RepoError::Validation(errors))
        }
    }
}
