//! In-process verified ledger.
//!
//! `MemoryLedger` implements the same contract as a networked ledger: users,
//! databases, append-only per-key history, hash-chained transactions and
//! proofs relative to the caller's trusted state. It is also a [`Connector`],
//! so a `LedgerSession` can run against it directly. Failures can be injected
//! per operation to exercise retry and error handling.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ledger::client::{Connector, LedgerClient, RawEntry, RawReceipt};
use crate::ledger::config::LedgerConfig;
use crate::ledger::error::{RpcCode, RpcError, RpcResult};
use crate::ledger::proof::{chain, entry_digest, Digest, Proof, ZERO_ROOT};

/// Ledger operations, for fault targeting and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcOp {
    Connect,
    Login,
    UseDatabase,
    VerifiedSet,
    VerifiedGet,
}

struct Fault {
    op: Option<RpcOp>,
    remaining: usize,
    error: RpcError,
}

struct Tx {
    key: Vec<u8>,
    value: Vec<u8>,
    digest: Digest,
}

/// One database: transactions, roots and a per-key index.
struct Database {
    txs: Vec<Tx>,
    /// `roots[n]` is the state after transaction `n`
    roots: Vec<Digest>,
    index: HashMap<Vec<u8>, Vec<u64>>,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            txs: Vec::new(),
            roots: vec![ZERO_ROOT],
            index: HashMap::new(),
        }
    }
}

impl Database {
    fn head(&self) -> u64 {
        self.txs.len() as u64
    }

    fn append(&mut self, key: &[u8], value: &[u8]) -> (u64, u64) {
        let tx = self.head() + 1;
        let digest = entry_digest(tx, key, value);
        let root = chain(&self.roots[self.roots.len() - 1], &digest);
        self.txs.push(Tx {
            key: key.to_vec(),
            value: value.to_vec(),
            digest,
        });
        self.roots.push(root);

        let history = self.index.entry(key.to_vec()).or_default();
        history.push(tx);
        (tx, history.len() as u64)
    }

    fn proof(&self, tx: u64, since: u64) -> Proof {
        let head = self.head();
        let start = since.min(tx.saturating_sub(1)).min(head);
        Proof {
            start,
            start_root: self.roots[start as usize],
            leaves: self.txs[start as usize..].iter().map(|t| t.digest).collect(),
            head_root: self.roots[head as usize],
        }
    }

    fn rehash_from(&mut self, tx: u64) {
        for n in tx..=self.head() {
            let i = (n - 1) as usize;
            let digest = entry_digest(n, &self.txs[i].key, &self.txs[i].value);
            self.txs[i].digest = digest;
            self.roots[n as usize] = chain(&self.roots[i], &digest);
        }
    }
}

#[derive(Default)]
struct State {
    users: HashMap<String, String>,
    databases: HashMap<String, Database>,
}

struct MemoryLedgerInner {
    state: Mutex<State>,
    faults: Mutex<VecDeque<Fault>>,
    calls: Mutex<HashMap<RpcOp, usize>>,
}

/// Shared in-process ledger. Clones refer to the same data.
#[derive(Clone)]
pub struct MemoryLedger {
    inner: Arc<MemoryLedgerInner>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// A ledger with the `immudb`/`immudb` user and a `defaultdb` database.
    pub fn new() -> Self {
        let mut state = State::default();
        state.users.insert("immudb".to_string(), "immudb".to_string());
        state.databases.insert("defaultdb".to_string(), Database::default());

        Self {
            inner: Arc::new(MemoryLedgerInner {
                state: Mutex::new(state),
                faults: Mutex::new(VecDeque::new()),
                calls: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Add or replace a user.
    pub fn add_user(&self, username: impl Into<String>, password: impl Into<String>) {
        self.inner.state.lock().users.insert(username.into(), password.into());
    }

    /// Create an empty database if it doesn't exist.
    pub fn create_database(&self, name: impl Into<String>) {
        self.inner.state.lock().databases.entry(name.into()).or_default();
    }

    /// number of transactions in `database` (0 if it doesn't exist)
    pub fn head(&self, database: &str) -> u64 {
        self.inner
            .state
            .lock()
            .databases
            .get(database)
            .map(Database::head)
            .unwrap_or(0)
    }

    /// Fail the next `times` calls of any operation with `error`.
    pub fn fail_next(&self, times: usize, error: RpcError) {
        self.push_fault(None, times, error);
    }

    /// Fail the next `times` calls of `op` with `error`.
    pub fn fail_next_on(&self, op: RpcOp, times: usize, error: RpcError) {
        self.push_fault(Some(op), times, error);
    }

    fn push_fault(&self, op: Option<RpcOp>, times: usize, error: RpcError) {
        if times > 0 {
            self.inner.faults.lock().push_back(Fault {
                op,
                remaining: times,
                error,
            });
        }
    }

    /// how many times `op` was called, failed calls included
    pub fn calls(&self, op: RpcOp) -> usize {
        self.inner.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Overwrite the stored value of a transaction, leaving its digest stale.
    pub fn tamper(&self, database: &str, tx: u64, value: &[u8]) {
        let mut state = self.inner.state.lock();
        let index = (tx as usize).wrapping_sub(1);
        if let Some(record) = state.databases.get_mut(database).and_then(|db| db.txs.get_mut(index)) {
            record.value = value.to_vec();
        }
    }

    /// Overwrite a transaction and recompute every digest and root after it.
    pub fn rewrite(&self, database: &str, tx: u64, value: &[u8]) {
        let mut state = self.inner.state.lock();
        if let Some(db) = state.databases.get_mut(database) {
            if tx == 0 || tx > db.head() {
                return;
            }
            db.txs[(tx - 1) as usize].value = value.to_vec();
            db.rehash_from(tx);
        }
    }

    /// count the call and fire a pending fault for it, if any
    fn enter(&self, op: RpcOp) -> RpcResult<()> {
        *self.inner.calls.lock().entry(op).or_insert(0) += 1;

        let mut faults = self.inner.faults.lock();
        let Some(pos) = faults.iter().position(|f| f.op.is_none() || f.op == Some(op)) else {
            return Ok(());
        };
        let error = faults[pos].error.clone();
        faults[pos].remaining -= 1;
        if faults[pos].remaining == 0 {
            faults.remove(pos);
        }
        Err(error)
    }
}

impl Connector for MemoryLedger {
    type Client = MemoryClient;

    fn connect(&self, _config: &LedgerConfig) -> RpcResult<MemoryClient> {
        self.enter(RpcOp::Connect)?;
        Ok(MemoryClient {
            ledger: self.clone(),
            user: None,
            database: None,
        })
    }
}

/// A connection to a [`MemoryLedger`].
pub struct MemoryClient {
    ledger: MemoryLedger,
    user: Option<String>,
    database: Option<String>,
}

impl MemoryClient {
    fn active_database(&self) -> RpcResult<&str> {
        if self.user.is_none() {
            return Err(RpcError::unauthenticated("not logged in"));
        }
        self.database
            .as_deref()
            .ok_or_else(|| RpcError::new(RpcCode::FailedPrecondition, "no database selected"))
    }
}

fn database_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

impl LedgerClient for MemoryClient {
    fn login(&mut self, username: &str, password: &str, database: &[u8]) -> RpcResult<()> {
        self.ledger.enter(RpcOp::Login)?;
        let state = self.ledger.inner.state.lock();

        if state.users.get(username).map(String::as_str) != Some(password) {
            return Err(RpcError::unauthenticated("invalid user name or password"));
        }
        let name = database_name(database);
        if !state.databases.contains_key(&name) {
            return Err(RpcError::not_found(format!("database {} does not exist", name)));
        }

        self.user = Some(username.to_string());
        self.database = Some(name);
        Ok(())
    }

    fn use_database(&mut self, database: &[u8]) -> RpcResult<()> {
        self.ledger.enter(RpcOp::UseDatabase)?;
        if self.user.is_none() {
            return Err(RpcError::unauthenticated("not logged in"));
        }
        let name = database_name(database);
        if !self.ledger.inner.state.lock().databases.contains_key(&name) {
            return Err(RpcError::not_found(format!("database {} does not exist", name)));
        }
        self.database = Some(name);
        Ok(())
    }

    fn verified_set(&mut self, key: &[u8], value: &[u8], since: u64) -> RpcResult<RawReceipt> {
        self.ledger.enter(RpcOp::VerifiedSet)?;
        let name = self.active_database()?.to_string();
        if key.is_empty() {
            return Err(RpcError::new(RpcCode::InvalidArgument, "illegal arguments: empty key"));
        }

        let mut state = self.ledger.inner.state.lock();
        let db = state
            .databases
            .get_mut(&name)
            .ok_or_else(|| RpcError::not_found(format!("database {} does not exist", name)))?;

        let (tx, revision) = db.append(key, value);
        Ok(RawReceipt {
            tx,
            revision,
            proof: db.proof(tx, since),
        })
    }

    fn verified_get(&mut self, key: &[u8], at_revision: Option<u64>, since: u64) -> RpcResult<RawEntry> {
        self.ledger.enter(RpcOp::VerifiedGet)?;
        let name = self.active_database()?.to_string();

        let state = self.ledger.inner.state.lock();
        let db = state
            .databases
            .get(&name)
            .ok_or_else(|| RpcError::not_found(format!("database {} does not exist", name)))?;

        let history = db.index.get(key).ok_or_else(|| RpcError::not_found("key not found"))?;
        let (tx, revision) = match at_revision {
            None | Some(0) => (history[history.len() - 1], history.len() as u64),
            Some(r) => {
                let tx = history
                    .get((r - 1) as usize)
                    .copied()
                    .ok_or_else(|| RpcError::not_found(format!("revision {} not found", r)))?;
                (tx, r)
            }
        };

        let record = &db.txs[(tx - 1) as usize];
        Ok(RawEntry {
            key: record.key.clone(),
            value: record.value.clone(),
            tx,
            revision,
            proof: db.proof(tx, since),
        })
    }
}
