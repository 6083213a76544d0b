//! Notarization protocol.
//!
//! Ties the other modules together: an artifact is fingerprinted
//! ([`crate::hashing`] or [`crate::git`]), described by a
//! [`NotarizationRecord`], and written to the ledger under its hash. Lookups
//! recompute the hash and do a verified read.
//!
//! ```text
//!   file ──► hash_file ──────────────┐
//!                                    ├──► key ──► Notary::notarize ──► LedgerSession
//!   repo ──► extract_git_metadata ───┘            (retried login + set + get)
//!              └─► GitBlock ──► canonical JSON ──► sha256
//! ```
//!
//! Outcomes are two-level. `Err(NotaryError)` is a hard fault: bad input, a
//! ledger that failed verification, or retries used up. `Ok(Err(ErrorRecord))`
//! is a ledger call that failed normally, such as a key that was never
//! notarized.
//!
//! # Usage
//!
//! ```ignore
//! use ledger_notary::ledger::{LedgerConfig, MemoryLedger};
//! use ledger_notary::notary::Notary;
//!
//! let notary = Notary::connect(LedgerConfig::default(), MemoryLedger::new())?;
//! let entry = notary.notarize_file("dist/app.tar.gz", None)??;
//! match notary.authenticate_file("dist/app.tar.gz")? {
//!     Ok(found) => println!("notarized by {}", found.value["Signer"]),
//!     Err(record) => println!("not notarized: {}", record),
//! }
//! ```

mod api;
mod error;
mod record;

pub use api::Notary;
pub use error::{NotaryError, NotaryResult};
pub use record::{
    default_metadata, merge_metadata, ArtifactKind, NotarizationRecord, PROTOCOL_VERSION, RECORD_FIELDS,
};
