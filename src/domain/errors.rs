use std::time::Duration;
use thiserror::Error;

/// Failures inside a store implementation. Never shown to end users.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Conflicting write: {0}")]
    Conflict(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
    #[error("Store task aborted: {0}")]
    Aborted(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by the issuer, redeemer and reaper.
///
/// Display strings are what end users see. `InvalidToken` deliberately covers
/// unknown, expired and used tokens alike.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResetError {
    #[error("Service temporarily unavailable, please try again later")]
    StoreUnavailable,
    #[error("Invalid or expired reset token")]
    InvalidToken,
    #[error("{0}")]
    PolicyViolation(String),
    /// Internal only; the issuer answers unknown accounts like known ones
    #[error("Account not found")]
    AccountNotFound,
    #[error("Internal server error")]
    Internal,
}

pub type ResetResult<T> = Result<T, ResetError>;

impl From<StoreError> for ResetError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Password reset store failure");
        ResetError::StoreUnavailable
    }
}

/// True when a database error is a uniqueness violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            db_err.is_unique_violation() || message.contains("UNIQUE") || message.contains("unique")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_surface_as_unavailable() {
        let err: ResetError = StoreError::Timeout(Duration::from_secs(5)).into();
        assert_eq!(err, ResetError::StoreUnavailable);

        let err: ResetError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err, ResetError::StoreUnavailable);
    }

    #[test]
    fn test_store_detail_not_in_user_message() {
        let err: ResetError = StoreError::Corrupt("password_reset_tokens.expires_at".into()).into();
        assert!(!err.to_string().contains("password_reset_tokens"));
    }

    #[test]
    fn test_policy_violation_is_verbatim() {
        let err = ResetError::PolicyViolation("Password must be 10-72 characters long".into());
        assert_eq!(err.to_string(), "Password must be 10-72 characters long");
    }

    #[test]
    fn test_pool_timeout_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
