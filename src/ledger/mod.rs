//! Verified ledger access.
//!
//! The ledger itself is an external verified key-value store. This module
//! owns everything on the client side of that boundary:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      LedgerSession                          │
//! │     (config, connector, trusted state, login lifecycle)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ login()
//!                              ▼
//!                       ┌─────────────┐
//!                       │   Session   │  verified_set / verified_get
//!                       └─────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │    codec    │       │    proof    │       │   client    │
//!  │ (bytes/JSON)│       │ (hash chain)│       │  (traits)   │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ledger_notary::ledger::{LedgerConfig, LedgerSession, MemoryLedger};
//!
//! let session = LedgerSession::connect(LedgerConfig::default(), MemoryLedger::new())?;
//! let mut s = session.login()?;
//! s.verified_set("key", serde_json::json!({"Hash": "key"}))??;
//! let entry = s.verified_get("key", None)??;
//! ```

mod client;
mod codec;
mod config;
mod error;
mod memory;
mod proof;
mod session;

pub use client::{Connector, LedgerClient, RawEntry, RawReceipt};
pub use codec::{decode_record, encode, LedgerValue, SetReceipt, VerifiedEntry};
pub use config::{
    LedgerConfig, ALMALINUX_DATABASE_ADDRESS, ALMALINUX_DATABASE_NAME, CONNECTION_TIMED_OUT, READ_ONLY_PASSWORD,
    READ_ONLY_USERNAME,
};
pub use error::{ErrorRecord, LedgerError, LedgerResult, Reply, RpcCode, RpcError, RpcResult};
pub use memory::{MemoryClient, MemoryLedger, RpcOp};
pub use proof::{chain, entry_digest, Digest, Proof, TrustedState, ZERO_ROOT};
pub use session::{LedgerSession, Session};
