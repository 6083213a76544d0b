//! The narrow contract this crate needs from a verified ledger service.
//!
//! A [`Connector`] dials the service described by a [`LedgerConfig`] and
//! returns a fresh [`LedgerClient`]. Clients are call-scoped: each login
//! creates its own, so no authentication state is shared between calls.

use crate::ledger::config::LedgerConfig;
use crate::ledger::error::RpcResult;
use crate::ledger::proof::Proof;

/// A value as stored in the ledger, with the proof that covers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// transaction that wrote this value
    pub tx: u64,
    /// 1-based version of this key
    pub revision: u64,
    pub proof: Proof,
}

/// Server acknowledgement of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReceipt {
    pub tx: u64,
    pub revision: u64,
    pub proof: Proof,
}

/// Operations of an authenticated ledger connection.
///
/// `since` is the transaction of the caller's trusted state; servers build
/// proofs that start no later than it.
pub trait LedgerClient {
    /// authenticate and open `database`
    fn login(&mut self, username: &str, password: &str, database: &[u8]) -> RpcResult<()>;

    /// switch the active database
    fn use_database(&mut self, database: &[u8]) -> RpcResult<()>;

    /// write `value` under `key` as a new transaction
    fn verified_set(&mut self, key: &[u8], value: &[u8], since: u64) -> RpcResult<RawReceipt>;

    /// read the latest value of `key`, or its `at_revision`-th version
    fn verified_get(&mut self, key: &[u8], at_revision: Option<u64>, since: u64) -> RpcResult<RawEntry>;
}

/// Opens new client connections.
pub trait Connector: Send + Sync {
    type Client: LedgerClient;

    /// dial the ledger described by `config`
    fn connect(&self, config: &LedgerConfig) -> RpcResult<Self::Client>;
}
