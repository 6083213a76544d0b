//! Ledger connection and retry settings.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::ledger::error::RpcCode;

/// failure text the ledger reports when a connection attempt times out
pub const CONNECTION_TIMED_OUT: &str = "Connection timed out";

/// user of the public read-only AlmaLinux ledger
pub const READ_ONLY_USERNAME: &str = "sbom_public_almalinux";

/// password of the public read-only AlmaLinux ledger user
pub const READ_ONLY_PASSWORD: &str = "%VF%414Ibmsk";

/// address of the public AlmaLinux ledger
pub const ALMALINUX_DATABASE_ADDRESS: &str = "pulpdb01.awsuseast1.almalinux.org:3322";

/// database holding AlmaLinux notarizations
pub const ALMALINUX_DATABASE_NAME: &str = "almalinux";

/// Settings for reaching and authenticating against the ledger.
pub struct LedgerConfig {
    /// User to log in as; also recorded as the signer of notarized records.
    pub username: String,
    password: SecretString,
    /// Database selected after login.
    pub database: String,
    /// `host:port` of the ledger service.
    pub address: String,
    /// Server public key used to authenticate responses.
    pub public_key_file: Option<PathBuf>,
    /// Per-call timeout; calls wait for the server when unset.
    pub timeout: Option<Duration>,
    /// Largest message the server may send.
    pub max_message_length: Option<usize>,
    /// Total attempts for a retried operation.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_backoff: Duration,
    /// Failure details that mark an error as transient.
    pub retry_signatures: Vec<String>,
    /// Status codes that mark an error as transient.
    pub retryable_codes: Vec<RpcCode>,
    /// Upper bound on the whole retried call, sleeps included.
    pub deadline: Option<Duration>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            username: "immudb".to_string(),
            password: SecretString::from("immudb"),
            database: "defaultdb".to_string(),
            address: "localhost:3322".to_string(),
            public_key_file: None,
            timeout: None,
            max_message_length: None,
            max_retries: 5,
            retry_backoff: Duration::from_secs(10),
            retry_signatures: vec![CONNECTION_TIMED_OUT.to_string()],
            retryable_codes: Vec::new(),
            deadline: None,
        }
    }
}

impl LedgerConfig {
    /// Create a configuration for the given credentials and database.
    pub fn new(username: impl Into<String>, password: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            database: database.into(),
            ..Default::default()
        }
    }

    /// Read-only access to the public AlmaLinux ledger.
    pub fn almalinux_read_only() -> Self {
        Self::new(READ_ONLY_USERNAME, READ_ONLY_PASSWORD, ALMALINUX_DATABASE_NAME).address(ALMALINUX_DATABASE_ADDRESS)
    }

    /// the login password
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Set the ledger address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the server public key file.
    pub fn public_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.public_key_file = Some(path.into());
        self
    }

    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the maximum response size.
    pub fn max_message_length(mut self, len: usize) -> Self {
        self.max_message_length = Some(len);
        self
    }

    /// Set the number of attempts for retried operations.
    pub fn max_retries(mut self, value: u32) -> Self {
        self.max_retries = value;
        self
    }

    /// Set the pause between attempts.
    pub fn retry_backoff(mut self, value: Duration) -> Self {
        self.retry_backoff = value;
        self
    }

    /// Add a failure detail substring that triggers a retry.
    pub fn retry_on_detail(mut self, signature: impl Into<String>) -> Self {
        self.retry_signatures.push(signature.into());
        self
    }

    /// Add a status code that triggers a retry.
    pub fn retry_on_code(mut self, code: RpcCode) -> Self {
        if !self.retryable_codes.contains(&code) {
            self.retryable_codes.push(code);
        }
        self
    }

    /// Bound the whole retried call.
    pub fn deadline(mut self, value: Duration) -> Self {
        self.deadline = Some(value);
        self
    }
}

impl Clone for LedgerConfig {
    fn clone(&self) -> Self {
        Self {
            username: self.username.clone(),
            password: SecretString::from(self.password.expose_secret().to_owned()),
            database: self.database.clone(),
            address: self.address.clone(),
            public_key_file: self.public_key_file.clone(),
            timeout: self.timeout,
            max_message_length: self.max_message_length,
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
            retry_signatures: self.retry_signatures.clone(),
            retryable_codes: self.retryable_codes.clone(),
            deadline: self.deadline,
        }
    }
}

impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("address", &self.address)
            .field("public_key_file", &self.public_key_file)
            .field("timeout", &self.timeout)
            .field("max_message_length", &self.max_message_length)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("retry_signatures", &self.retry_signatures)
            .field("retryable_codes", &self.retryable_codes)
            .field("deadline", &self.deadline)
            .finish()
    }
}
