//! ledger-notary - notarize artifacts into a verified ledger
//!
//! This crate records files and git repository states in a tamper-evident
//! key-value ledger and looks them up again by content hash. Every write and
//! read is checked against the ledger's proofs, and the client remembers the
//! newest verified state so a rewritten or rolled-back ledger is noticed.
//!
//! # Example
//!
//! ```no_run
//! use ledger_notary::ledger::{LedgerConfig, MemoryLedger};
//! use ledger_notary::notary::Notary;
//!
//! let notary = Notary::connect(LedgerConfig::default(), MemoryLedger::new()).unwrap();
//! let entry = notary.notarize_file("./Cargo.toml", None).unwrap().unwrap();
//! assert_eq!(entry.value["Kind"], "file");
//! ```

pub mod canonical;
pub mod git;
pub mod hashing;
pub mod ledger;
pub mod log;
pub mod notary;
pub mod retry;

pub use ledger::{ErrorRecord, LedgerConfig, LedgerSession, Reply, VerifiedEntry};
pub use notary::{Notary, NotaryError, NotaryResult, PROTOCOL_VERSION};

/// crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
