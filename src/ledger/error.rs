//! Ledger error types
//!
//! Two layers: [`RpcError`] is what a ledger client reports for a failed call
//! (a status code plus the server's detail text), [`LedgerError`] is what the
//! session layer raises as a hard fault. Failed verified reads and writes are
//! not faults; they are returned as an [`ErrorRecord`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status codes reported by the ledger transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl RpcCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "Cancelled",
            Self::Unknown => "Unknown",
            Self::InvalidArgument => "InvalidArgument",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::PermissionDenied => "PermissionDenied",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::FailedPrecondition => "FailedPrecondition",
            Self::Aborted => "Aborted",
            Self::OutOfRange => "OutOfRange",
            Self::Unimplemented => "Unimplemented",
            Self::Internal => "Internal",
            Self::Unavailable => "Unavailable",
            Self::DataLoss => "DataLoss",
            Self::Unauthenticated => "Unauthenticated",
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call against the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rpc error: code = {code} desc = {details}")]
pub struct RpcError {
    pub code: RpcCode,
    pub details: String,
}

impl RpcError {
    pub fn new(code: RpcCode, details: impl Into<String>) -> Self {
        Self {
            code,
            details: details.into(),
        }
    }

    pub fn unavailable(details: impl Into<String>) -> Self {
        Self::new(RpcCode::Unavailable, details)
    }

    pub fn not_found(details: impl Into<String>) -> Self {
        Self::new(RpcCode::NotFound, details)
    }

    pub fn unauthenticated(details: impl Into<String>) -> Self {
        Self::new(RpcCode::Unauthenticated, details)
    }
}

/// result type alias for raw client calls
pub type RpcResult<T> = Result<T, RpcError>;

/// Hard faults raised by the session layer.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// the transport failed outside a captured verified read/write
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// the value can't be turned into ledger bytes
    #[error("encoding error: {0}")]
    Encoding(String),

    /// the server's proof doesn't match the data or the trusted state
    #[error("verification failed for key {key}: {reason}")]
    Verification { key: String, reason: String },

    /// the stored key or value is not in the expected format
    #[error("failed to decode entry {key}: {reason}")]
    Decode { key: String, reason: String },
}

impl LedgerError {
    /// the underlying transport failure, if this is one
    pub fn rpc(&self) -> Option<&RpcError> {
        match self {
            LedgerError::Rpc(e) => Some(e),
            _ => None,
        }
    }

    /// check if this error means the ledger served data that failed its proof
    pub fn is_tampering(&self) -> bool {
        matches!(self, LedgerError::Verification { .. })
    }
}

/// result type alias for session operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A failed verified read or write, returned as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: String,
}

impl ErrorRecord {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

impl From<&RpcError> for ErrorRecord {
    fn from(e: &RpcError) -> Self {
        Self::new(e.to_string())
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error)
    }
}

/// Outcome of a verified ledger call: the payload, or the captured failure.
pub type Reply<T> = Result<T, ErrorRecord>;
