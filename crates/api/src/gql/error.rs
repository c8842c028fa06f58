use std::fmt::Display;

use async_graphql::{Error, ErrorExtensions, Result};
use infra::error::RepoError;

fn coded(message: impl Into<String>, code: &'static str) -> Error {
    Error::new(message.into()).extend_with(|_, e| e.set("code", code))
}

pub fn unauthorized(message: impl Into<String>) -> Error {
    coded(message, "UNAUTHORIZED")
}

pub fn forbidden(message: impl Into<String>) -> Error {
    coded(message, "FORBIDDEN")
}

pub fn not_found(what: &str) -> Error {
    coded(format!("{what} not found"), "NOT_FOUND")
}

pub fn require_found<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| not_found(what))
}

pub fn validation(errors: Vec<String>) -> Error {
    Error::new(errors.join("; ")).extend_with(|_, e| {
        e.set("code", "VALIDATION");
        e.set("errors", errors.clone());
    })
}

pub fn repo_error(err: RepoError) -> Error {
    match err {
        RepoError::NotFound(what) => not_found(what),
        RepoError::InvalidState(message) => coded(message, "INVALID_STATE"),
        RepoError::Conflict(message) => coded(message, "CONFLICT"),
        RepoError::CapacityReached(match_id) => {
            coded(format!("Le match {match_id} est complet"), "CAPACITY_REACHED")
        }
        RepoError::Validation(errors) => validation(errors),
        RepoError::Db(e) => {
            tracing::error!(error = ?e, "database error in resolver");
            coded("Internal server error", "INTERNAL")
        }
    }
}

pub trait ResultExt<T> {
    /// Attach a context message to any displayable error.
    fn gql_err(self, context: &str) -> Result<T>;
}

impl<T, E: Display> ResultExt<T> for std::result::Result<T, E> {
    fn gql_err(self, context: &str) -> Result<T> {
        self.map_err(|e| coded(format!("{context}: {e}"), "INTERNAL"))
    }
}

/// Conversion of repository results into coded GraphQL errors.
pub trait RepoResultExt<T> {
    fn gql(self) -> Result<T>;
}

impl<T> RepoResultExt<T> for std::result::Result<T, RepoError> {
    fn gql(self) -> Result<T> {
        self.map_err(repo_error)
    }
}

impl<T> RepoResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn gql(self) -> Result<T> {
        self.map_err(|e| repo_error(RepoError::Db(e)))
    }
}

impl<T> RepoResultExt<T> for std::result::Result<T, crate::error::AppError> {
    fn gql(self) -> Result<T> {
        use crate::error::AppError;
        self.map_err(|err| match err {
            AppError::BadRequest(message) => coded(message, "VALIDATION"),
            AppError::NotFound(what) => not_found(&what),
            AppError::Unauthorized(message) => unauthorized(message),
            AppError::Forbidden(message) => forbidden(message),
            AppError::Conflict(message) => coded(message, "CONFLICT"),
            AppError::Validation(errors) => validation(errors),
            AppError::Db(e) => repo_error(RepoError::Db(e)),
            AppError::Internal(_) | AppError::Anyhow(_) => {
                tracing::error!(error = ?err, "internal error in resolver");
                coded("Internal server error", "INTERNAL")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Value;

    fn code_of(err: &Error) -> Option<Value> {
        err.extensions.as_ref().and_then(|ext| ext.get("code").cloned())
    }

    #[test]
    fn test_repo_errors_carry_codes() {
        let err = repo_error(RepoError::NotFound("registration"));
        assert_eq!(err.message, "registration not found");
        assert_eq!(code_of(&err), Some(Value::from("NOT_FOUND")));

        let err = repo_error(RepoError::CapacityReached(uuid::Uuid::nil()));
        assert_eq!(code_of(&err), Some(Value::from("CAPACITY_REACHED")));
    }

    #[test]
    fn test_validation_lists_every_error() {
        let err = validation(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.message, "a; b");
        let errors = err.extensions.as_ref().and_then(|ext| ext.get("errors").cloned());
        assert_eq!(
            errors,
            Some(Value::List(vec![Value::from("a"), Value::from("b")]))
        );
    }
}
