use crate::ids::{AccountOwner, TeamId, UserId};
use crate::models::OperationStatus;
use crate::Grams;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Failures a caller of the ledger can act on.
///
/// Every variant except `StorageFailure` is a deterministic rejection: retrying the same request
/// against the same state fails the same way. A failed call never leaves partial state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid transfer target: {0}")]
    InvalidTarget(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountOwner),

    #[error("Account frozen: {0}")]
    AccountFrozen(AccountOwner),

    #[error("Insufficient balance on {owner}: requested {requested}, available {available}")]
    InsufficientBalance {
        owner: AccountOwner,
        requested: Grams,
        available: Grams,
    },

    #[error("Operation not found: {0}")]
    OperationNotFound(Uuid),

    #[error("Operation {0} is {1}, cannot be resolved")]
    InvalidState(Uuid, OperationStatus),

    #[error("Operation {0} expired at {1}")]
    Expired(Uuid, DateTime<Utc>),

    #[error("User {0} is not a core member of {1}")]
    Unauthorized(UserId, TeamId),

    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }
}

/// Finds the `LedgerError` behind an `anyhow::Error`, if there is one.
pub fn ledger_error(err: &anyhow::Error) -> Option<&LedgerError> {
    err.downcast_ref::<LedgerError>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(LedgerError::StorageFailure("lock timeout".to_string()).is_retryable());
        assert!(!LedgerError::InvalidAmount("0".to_string()).is_retryable());
        assert!(!LedgerError::AccountFrozen(AccountOwner::Team(TeamId(1))).is_retryable());
    }

    #[test]
    fn downcast_through_anyhow() {
        let err: anyhow::Error = LedgerError::OperationNotFound(Uuid::nil()).into();

        assert_eq!(
            ledger_error(&err),
            Some(&LedgerError::OperationNotFound(Uuid::nil()))
        );

        let other = anyhow::anyhow!("unrelated");
        assert!(ledger_error(&other).is_none());
    }
}
