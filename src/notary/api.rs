//! Notary API - notarize and authenticate artifacts.

use std::path::Path;

use serde_json::{Map, Value};

use crate::git::{self, GitMetadata};
use crate::hashing::{self, HashAlgorithm, DEFAULT_CHUNK_SIZE};
use crate::ledger::{Connector, LedgerConfig, LedgerSession, LedgerValue, Reply, VerifiedEntry};
use crate::notary::error::{NotaryError, NotaryResult};
use crate::notary::record::{default_metadata, merge_metadata, ArtifactKind, NotarizationRecord};
use crate::retry::RetryPolicy;

/// Notarizes artifacts into a verified ledger and looks them up again.
///
/// Every operation logs in afresh, so a `Notary` can be shared between
/// threads. Login plus the ledger call are retried together on transient
/// transport failures.
pub struct Notary<C: Connector> {
    session: LedgerSession<C>,
    retry: RetryPolicy,
}

impl<C: Connector> Notary<C> {
    /// Wrap an existing session; the retry policy comes from its config.
    pub fn new(session: LedgerSession<C>) -> Self {
        let retry = RetryPolicy::from_config(session.config()).with_log(session.log().clone());
        Self { session, retry }
    }

    /// Build a session from `config` and check the credentials once.
    pub fn connect(config: LedgerConfig, connector: C) -> NotaryResult<Self> {
        let session = LedgerSession::connect(config, connector)?;
        Ok(Self::new(session))
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn session(&self) -> &LedgerSession<C> {
        &self.session
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// the identity recorded as `Signer`
    pub fn signer(&self) -> &str {
        &self.session.config().username
    }

    /// Write `value` under `key`, then read it back verified.
    ///
    /// A failed write is returned as is, without the read.
    pub fn notarize(
        &self,
        key: impl Into<LedgerValue>,
        value: impl Into<LedgerValue>,
    ) -> NotaryResult<Reply<VerifiedEntry>> {
        let key = key.into();
        let value = value.into();

        let reply = self.retry.run("notarize", || {
            let mut session = self.session.login()?;
            if let Err(record) = session.verified_set(key.clone(), value.clone())? {
                return Ok(Err(record));
            }
            session.verified_get(key.clone(), None)
        })?;
        Ok(reply)
    }

    /// Notarize a file under the hash of its contents.
    pub fn notarize_file(
        &self,
        path: impl AsRef<Path>,
        user_metadata: Option<&Map<String, Value>>,
    ) -> NotaryResult<Reply<VerifiedEntry>> {
        let path = path.as_ref();
        let hash = hashing::hash_file(path, HashAlgorithm::Sha256, DEFAULT_CHUNK_SIZE)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| NotaryError::InvalidPath(path.to_path_buf()))?;

        let record = NotarizationRecord {
            name,
            kind: ArtifactKind::File,
            size: hashing::format_size(hashing::file_size(path)?),
            hash: hash.clone(),
            signer: self.signer().to_string(),
            metadata: merge_metadata(default_metadata(), user_metadata, self.session.log().as_ref()),
        };

        self.notarize(hash, LedgerValue::json(&record)?)
    }

    /// Notarize the current HEAD of a git repository.
    ///
    /// The key is the hash of the commit block, so every clone of the same
    /// commit maps to the same entry.
    pub fn notarize_git_repo(
        &self,
        repo_path: impl AsRef<Path>,
        user_metadata: Option<&Map<String, Value>>,
    ) -> NotaryResult<Reply<VerifiedEntry>> {
        let repo_path = repo_path.as_ref();
        let GitMetadata { name, git: block } = git::extract_git_metadata(repo_path)?;
        let key = block.key()?;

        let mut base = Map::new();
        base.insert("git".to_string(), serde_json::to_value(&block)?);
        base.extend(default_metadata());

        let record = NotarizationRecord {
            name,
            kind: ArtifactKind::Git,
            size: hashing::format_size(hashing::directory_size(repo_path)?),
            hash: key.clone(),
            signer: self.signer().to_string(),
            metadata: merge_metadata(base, user_metadata, self.session.log().as_ref()),
        };

        self.notarize(key, LedgerValue::json(&record)?)
    }

    /// Verified read of the latest value under `key`.
    pub fn authenticate(&self, key: impl Into<LedgerValue>) -> NotaryResult<Reply<VerifiedEntry>> {
        self.read("authenticate", key.into(), None)
    }

    /// Verified read of a specific revision of `key`, counting from 1.
    pub fn authenticate_at(
        &self,
        key: impl Into<LedgerValue>,
        revision: u64,
    ) -> NotaryResult<Reply<VerifiedEntry>> {
        self.read("authenticate_at", key.into(), Some(revision))
    }

    /// Look up a file by the hash of its contents.
    pub fn authenticate_file(&self, path: impl AsRef<Path>) -> NotaryResult<Reply<VerifiedEntry>> {
        let hash = hashing::hash_file(path, HashAlgorithm::Sha256, DEFAULT_CHUNK_SIZE)?;
        self.authenticate(hash)
    }

    /// Look up a repository by the hash of its HEAD commit block.
    pub fn authenticate_git_repo(&self, repo_path: impl AsRef<Path>) -> NotaryResult<Reply<VerifiedEntry>> {
        let key = git::extract_git_metadata(repo_path)?.key()?;
        self.authenticate(key)
    }

    fn read(
        &self,
        operation: &str,
        key: LedgerValue,
        revision: Option<u64>,
    ) -> NotaryResult<Reply<VerifiedEntry>> {
        let reply = self.retry.run(operation, || {
            self.session.login()?.verified_get(key.clone(), revision)
        })?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use git2::Repository;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::git::{fixtures, GitError};
    use crate::ledger::{LedgerError, MemoryLedger, RpcError, RpcOp, CONNECTION_TIMED_OUT};
    use crate::log::testing::RecordingLog;
    use crate::retry::testing::ManualClock;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    struct Harness {
        ledger: MemoryLedger,
        notary: Notary<MemoryLedger>,
        clock: Arc<ManualClock>,
        log: Arc<RecordingLog>,
    }

    fn harness(config: LedgerConfig) -> Harness {
        let ledger = MemoryLedger::new();
        let clock = Arc::new(ManualClock::new());
        let log = Arc::new(RecordingLog::default());
        let session = LedgerSession::new(config, ledger.clone()).with_log(log.clone());
        let notary = Notary::new(session);
        let retry = notary.retry_policy().clone().with_clock(clock.clone());
        let notary = notary.with_retry_policy(retry);
        Harness {
            ledger,
            notary,
            clock,
            log,
        }
    }

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn timed_out() -> RpcError {
        RpcError::unavailable(CONNECTION_TIMED_OUT)
    }

    #[test]
    fn test_notarize_file_round_trip() {
        let h = harness(LedgerConfig::default());
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "hello.txt", b"hello world");

        let entry = h.notary.notarize_file(&path, None).unwrap().unwrap();
        assert_eq!(entry.key, HELLO_SHA256);
        assert!(entry.verified);
        assert_eq!(
            entry.value,
            json!({
                "Name": "hello.txt",
                "Kind": "file",
                "Size": "11.00 B",
                "Hash": HELLO_SHA256,
                "Signer": "immudb",
                "Metadata": {"sbom_api_ver": "0.2"}
            })
        );

        let found = h.notary.authenticate_file(&path).unwrap().unwrap();
        assert_eq!(found.value, entry.value);
        let record: NotarizationRecord = found.record().unwrap();
        assert_eq!(record.kind, ArtifactKind::File);
        assert_eq!(record.hash, HELLO_SHA256);
    }

    #[test]
    fn test_renotarize_adds_revision() {
        let h = harness(LedgerConfig::default());
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "hello.txt", b"hello world");

        h.notary.notarize_file(&path, None).unwrap().unwrap();
        let tagged = json!({"stage": "release"});
        let second = h
            .notary
            .notarize_file(&path, tagged.as_object())
            .unwrap()
            .unwrap();
        assert_eq!(second.revision, 2);

        let first = h.notary.authenticate_at(HELLO_SHA256, 1).unwrap().unwrap();
        assert_eq!(first.value["Metadata"], json!({"sbom_api_ver": "0.2"}));
        let latest = h.notary.authenticate(HELLO_SHA256).unwrap().unwrap();
        assert_eq!(latest.value["Metadata"]["stage"], json!("release"));
    }

    #[test]
    fn test_user_metadata_cannot_replace_record_fields() {
        let h = harness(LedgerConfig::default());
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "hello.txt", b"hello world");

        let user = json!({"sbom_api_ver": "1.0", "Hash": "forged", "build": 7});
        let entry = h.notary.notarize_file(&path, user.as_object()).unwrap().unwrap();

        assert_eq!(entry.value["Hash"], json!(HELLO_SHA256));
        assert_eq!(
            entry.value["Metadata"],
            json!({"sbom_api_ver": "1.0", "Hash": "forged", "build": 7})
        );
        assert_eq!(h.log.at("warn").len(), 1);
    }

    #[test]
    fn test_signer_is_configured_user() {
        let ledger = MemoryLedger::new();
        ledger.add_user("ci", "secret");
        let config = LedgerConfig::new("ci", "secret", "defaultdb");
        let notary = Notary::connect(config, ledger).unwrap();

        let entry = notary.notarize("k", json!({"a": 1})).unwrap().unwrap();
        assert_eq!(entry.value, json!({"a": 1}));
        assert_eq!(notary.signer(), "ci");
    }

    #[test]
    fn test_notarize_git_repo_and_clone() {
        let h = harness(LedgerConfig::default());
        let dir = TempDir::new().unwrap();
        let origin_path = dir.path().join("origin");
        let repo = fixtures::repo_with_commits(&origin_path, 2);
        let head = repo.head().unwrap().peel_to_commit().unwrap().id().to_string();

        let entry = h.notary.notarize_git_repo(&origin_path, None).unwrap().unwrap();
        assert_eq!(entry.value["Kind"], json!("git"));
        assert_eq!(
            entry.value["Name"],
            json!(format!("git@github.com:example/project.git@{}", &head[..7]))
        );
        assert_eq!(entry.value["Metadata"]["git"]["Commit"], json!(head));
        let keys: Vec<&str> = entry.value["Metadata"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["git", "sbom_api_ver"]);

        let clone_path = dir.path().join("clone");
        Repository::clone(origin_path.to_str().unwrap(), &clone_path).unwrap();
        let found = h.notary.authenticate_git_repo(&clone_path).unwrap().unwrap();
        assert_eq!(found.key, entry.key);
        assert_eq!(found.value, entry.value);
    }

    #[test]
    fn test_authenticate_missing_key_is_error_record() {
        let h = harness(LedgerConfig::default());
        let reply = h.notary.authenticate("0000").unwrap();
        assert_eq!(reply.unwrap_err().error, "rpc error: code = NotFound desc = key not found");
    }

    #[test]
    fn test_invalid_repository_is_hard_error() {
        let h = harness(LedgerConfig::default());
        let dir = TempDir::new().unwrap();

        let err = h.notary.notarize_git_repo(dir.path(), None).unwrap_err();
        assert!(matches!(err, NotaryError::Git(GitError::RepositoryNotFound(_))));
        let err = h.notary.authenticate_git_repo(dir.path()).unwrap_err();
        assert!(matches!(err, NotaryError::Git(ref e) if e.is_not_found()));
        assert_eq!(h.ledger.calls(RpcOp::Login), 0);
    }

    #[test]
    fn test_missing_file_is_hard_error() {
        let h = harness(LedgerConfig::default());
        let dir = TempDir::new().unwrap();
        let err = h.notary.authenticate_file(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, NotaryError::Hash(_)));
    }

    #[test]
    fn test_retries_are_bounded() {
        let config = LedgerConfig::default()
            .max_retries(3)
            .retry_backoff(Duration::from_secs(10));
        let h = harness(config);
        h.ledger.fail_next_on(RpcOp::Login, 100, timed_out());

        let err = h.notary.authenticate("abc").unwrap_err();
        assert!(matches!(err, NotaryError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(h.ledger.calls(RpcOp::Login), 3);
        assert_eq!(*h.clock.sleeps.lock(), vec![Duration::from_secs(10); 2]);
        assert_eq!(h.log.at("error").len(), 2);
    }

    #[test]
    fn test_transient_login_failure_recovers() {
        let h = harness(LedgerConfig::default());
        h.ledger.fail_next_on(RpcOp::Login, 2, timed_out());

        let entry = h.notary.notarize("k", json!({"v": 1})).unwrap().unwrap();
        assert_eq!(entry.value, json!({"v": 1}));
        assert_eq!(h.ledger.calls(RpcOp::Login), 3);
        assert_eq!(h.ledger.calls(RpcOp::VerifiedSet), 1);
        assert_eq!(h.clock.sleep_count(), 2);
    }

    #[test]
    fn test_unrecognized_failure_is_attempted_once() {
        let h = harness(LedgerConfig::default());
        h.ledger
            .fail_next_on(RpcOp::Login, 5, RpcError::unavailable("connection reset by peer"));

        let err = h.notary.notarize("k", json!({})).unwrap_err();
        assert!(matches!(err, NotaryError::Ledger(LedgerError::Rpc(_))));
        assert_eq!(h.ledger.calls(RpcOp::Login), 1);
        assert_eq!(h.clock.sleep_count(), 0);
    }

    #[test]
    fn test_failed_write_skips_read() {
        let h = harness(LedgerConfig::default());
        h.ledger.fail_next_on(RpcOp::VerifiedSet, 1, timed_out());

        let reply = h.notary.notarize("k", json!({})).unwrap();
        assert!(reply.unwrap_err().error.contains(CONNECTION_TIMED_OUT));
        assert_eq!(h.ledger.calls(RpcOp::VerifiedGet), 0);
    }

    #[test]
    fn test_tampering_surfaces_as_hard_error() {
        let h = harness(LedgerConfig::default());
        h.notary.notarize("k", json!({"owner": "alice"})).unwrap().unwrap();
        h.ledger.tamper("defaultdb", 1, br#"{"owner": "mallory"}"#);

        let err = h.notary.authenticate("k").unwrap_err();
        assert!(err.is_tampering());
    }

    #[test]
    fn test_concurrent_notarizations() {
        let h = harness(LedgerConfig::default());

        std::thread::scope(|s| {
            for i in 0..8 {
                let notary = &h.notary;
                s.spawn(move || {
                    notary
                        .notarize(format!("key-{}", i), json!({"n": i}))
                        .unwrap()
                        .unwrap();
                });
            }
        });

        assert_eq!(h.ledger.head("defaultdb"), 8);
        let entry = h.notary.authenticate("key-3").unwrap().unwrap();
        assert_eq!(entry.value, json!({"n": 3}));
        assert_eq!(h.notary.session().trusted_state().tx, 8);
    }
}
