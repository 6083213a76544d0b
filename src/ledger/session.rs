//! Authenticated sessions against the verified ledger.
//!
//! [`LedgerSession`] is the long-lived handle: it owns the configuration, the
//! connector and the trusted ledger state. Every [`LedgerSession::login`]
//! dials a fresh client, authenticates and selects the database, and hands
//! back a call-scoped [`Session`]. Sessions never share authentication state,
//! so one `LedgerSession` can serve concurrent callers.

use parking_lot::Mutex;

use crate::ledger::client::{Connector, LedgerClient};
use crate::ledger::codec::{self, LedgerValue, SetReceipt, VerifiedEntry};
use crate::ledger::config::LedgerConfig;
use crate::ledger::error::{ErrorRecord, LedgerError, LedgerResult, Reply};
use crate::ledger::proof::{self, Digest, Proof, TrustedState};
use crate::log::{default_log, SharedLog};

/// Long-lived ledger handle.
pub struct LedgerSession<C: Connector> {
    config: LedgerConfig,
    connector: C,
    trusted: Mutex<TrustedState>,
    log: SharedLog,
}

impl<C: Connector> LedgerSession<C> {
    /// Create a session handle without contacting the ledger.
    pub fn new(config: LedgerConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            trusted: Mutex::new(TrustedState::default()),
            log: default_log(),
        }
    }

    /// Create a session handle and check the credentials with one login.
    pub fn connect(config: LedgerConfig, connector: C) -> LedgerResult<Self> {
        let session = Self::new(config, connector);
        session.login()?;
        Ok(session)
    }

    /// Replace the log sink.
    pub fn with_log(mut self, log: SharedLog) -> Self {
        self.log = log;
        self
    }

    /// Start verification from a previously saved state instead of genesis.
    pub fn with_trusted_state(self, state: TrustedState) -> Self {
        *self.trusted.lock() = state;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn log(&self) -> &SharedLog {
        &self.log
    }

    /// the newest state verified so far
    pub fn trusted_state(&self) -> TrustedState {
        *self.trusted.lock()
    }

    /// Authenticate a fresh client and select the configured database.
    ///
    /// Safe to call repeatedly; every call yields an independent session.
    pub fn login(&self) -> LedgerResult<Session<'_, C>> {
        let database = codec::encode(&LedgerValue::from(self.config.database.as_str()))?;

        let mut client = self.connector.connect(&self.config)?;
        client.login(&self.config.username, self.config.password(), &database)?;
        client.use_database(&database)?;

        self.log.debug(&format!(
            "logged in to {} as {} using database {}",
            self.config.address, self.config.username, self.config.database
        ));

        Ok(Session { client, ledger: self })
    }

    fn check_proof(
        &self,
        snapshot: &TrustedState,
        key: &[u8],
        tx: u64,
        entry: &Digest,
        proof: &Proof,
    ) -> LedgerResult<()> {
        let next = snapshot.verify(tx, entry, proof).map_err(|reason| LedgerError::Verification {
            key: String::from_utf8_lossy(key).into_owned(),
            reason,
        })?;

        // concurrent sessions may already have moved further ahead
        let mut trusted = self.trusted.lock();
        if next.tx > trusted.tx {
            *trusted = next;
        }
        Ok(())
    }
}

/// An authenticated, call-scoped connection.
pub struct Session<'a, C: Connector> {
    client: C::Client,
    ledger: &'a LedgerSession<C>,
}

impl<'a, C: Connector> Session<'a, C> {
    /// Write `value` under `key` and verify the server's proof of the write.
    ///
    /// Transport failures come back as an [`ErrorRecord`]. A proof that
    /// doesn't check out is a [`LedgerError::Verification`].
    pub fn verified_set(
        &mut self,
        key: impl Into<LedgerValue>,
        value: impl Into<LedgerValue>,
    ) -> LedgerResult<Reply<SetReceipt>> {
        let key = codec::encode(&key.into())?;
        let value = codec::encode(&value.into())?;
        let snapshot = self.ledger.trusted_state();

        let receipt = match self.client.verified_set(&key, &value, snapshot.tx) {
            Ok(receipt) => receipt,
            Err(e) => {
                self.ledger
                    .log
                    .debug(&format!("verified set of {} failed: {}", String::from_utf8_lossy(&key), e));
                return Ok(Err(ErrorRecord::from(&e)));
            }
        };

        let entry = proof::entry_digest(receipt.tx, &key, &value);
        self.ledger.check_proof(&snapshot, &key, receipt.tx, &entry, &receipt.proof)?;

        self.ledger.log.debug(&format!(
            "verified set of {} at tx {} revision {}",
            String::from_utf8_lossy(&key),
            receipt.tx,
            receipt.revision
        ));
        Ok(Ok(SetReceipt {
            tx: receipt.tx,
            revision: receipt.revision,
            verified: true,
        }))
    }

    /// Read `key` (latest, or a specific revision) and verify it.
    pub fn verified_get(
        &mut self,
        key: impl Into<LedgerValue>,
        at_revision: Option<u64>,
    ) -> LedgerResult<Reply<VerifiedEntry>> {
        let key = codec::encode(&key.into())?;
        let snapshot = self.ledger.trusted_state();

        let raw = match self.client.verified_get(&key, at_revision, snapshot.tx) {
            Ok(raw) => raw,
            Err(e) => {
                self.ledger
                    .log
                    .debug(&format!("verified get of {} failed: {}", String::from_utf8_lossy(&key), e));
                return Ok(Err(ErrorRecord::from(&e)));
            }
        };

        if raw.key != key {
            return Err(LedgerError::Verification {
                key: String::from_utf8_lossy(&key).into_owned(),
                reason: format!("server answered with key {}", String::from_utf8_lossy(&raw.key)),
            });
        }

        let entry = proof::entry_digest(raw.tx, &raw.key, &raw.value);
        self.ledger.check_proof(&snapshot, &key, raw.tx, &entry, &raw.proof)?;

        self.ledger.log.debug(&format!(
            "verified get of {} at tx {} revision {}",
            String::from_utf8_lossy(&key),
            raw.tx,
            raw.revision
        ));
        codec::decode_record(&raw, true).map(Ok)
    }
}
