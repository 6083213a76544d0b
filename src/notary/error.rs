//! Notarization error types

use std::path::PathBuf;

use thiserror::Error;

use crate::git::GitError;
use crate::hashing::HashError;
use crate::ledger::LedgerError;
use crate::retry::RetryError;

/// Hard faults of the notarization protocol.
///
/// Failed verified reads and writes are not faults; they come back as an
/// [`ErrorRecord`](crate::ledger::ErrorRecord) inside `Ok`.
#[derive(Debug, Error)]
pub enum NotaryError {
    #[error("hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("git metadata error: {0}")]
    Git(#[from] GitError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// a transient failure persisted through every attempt
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: LedgerError,
    },

    /// retrying stopped at the configured deadline
    #[error("{operation} reached its deadline after {attempts} attempts: {last}")]
    DeadlineExceeded {
        operation: String,
        attempts: u32,
        last: LedgerError,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// the path has no file name to record
    #[error("invalid artifact path: {0}")]
    InvalidPath(PathBuf),
}

impl From<RetryError> for NotaryError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Permanent(e) => NotaryError::Ledger(e),
            RetryError::Exhausted {
                operation,
                attempts,
                last,
            } => NotaryError::RetriesExhausted {
                operation,
                attempts,
                last,
            },
            RetryError::DeadlineExceeded {
                operation,
                attempts,
                last,
                ..
            } => NotaryError::DeadlineExceeded {
                operation,
                attempts,
                last,
            },
        }
    }
}

impl NotaryError {
    /// the ledger failure behind this error, if any
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            NotaryError::Ledger(e) => Some(e),
            NotaryError::RetriesExhausted { last, .. } => Some(last),
            NotaryError::DeadlineExceeded { last, .. } => Some(last),
            _ => None,
        }
    }

    /// check if the ledger served data that failed verification
    pub fn is_tampering(&self) -> bool {
        self.ledger_error().is_some_and(LedgerError::is_tampering)
    }
}

/// result type alias for notarization operations
pub type NotaryResult<T> = Result<T, NotaryError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ledger::RpcError;

    #[test]
    fn test_retry_errors_map_to_notary_errors() {
        let exhausted = RetryError::Exhausted {
            operation: "notarize".into(),
            attempts: 5,
            last: RpcError::unavailable("Connection timed out").into(),
        };
        let err = NotaryError::from(exhausted);
        assert!(matches!(err, NotaryError::RetriesExhausted { attempts: 5, .. }));
        assert_eq!(
            err.to_string(),
            "notarize failed after 5 attempts: rpc error: code = Unavailable desc = Connection timed out"
        );

        let deadline = RetryError::DeadlineExceeded {
            operation: "authenticate".into(),
            attempts: 2,
            deadline: Duration::from_secs(15),
            last: RpcError::unavailable("Connection timed out").into(),
        };
        assert!(matches!(NotaryError::from(deadline), NotaryError::DeadlineExceeded { attempts: 2, .. }));

        let permanent = RetryError::Permanent(RpcError::unauthenticated("denied").into());
        assert!(matches!(NotaryError::from(permanent), NotaryError::Ledger(LedgerError::Rpc(_))));
    }

    #[test]
    fn test_tampering_classification() {
        let err = NotaryError::from(LedgerError::Verification {
            key: "k".into(),
            reason: "head root mismatch".into(),
        });
        assert!(err.is_tampering());
        assert!(!NotaryError::InvalidPath(PathBuf::from("/")).is_tampering());
    }
}
