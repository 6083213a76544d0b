//! Repository state extraction.
//!
//! Reads the HEAD commit and the remote of a repository and turns them into
//! the serializable block that is embedded in git notarization records. The
//! key of a git artifact is the hash of this block, not of the working tree,
//! so every clone of the same commit maps to the same ledger entry.

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use git2::{Repository, Sort};
use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::git::error::{GitError, GitResult};
use crate::git::remote::RemoteLocation;
use crate::hashing;

/// timestamp layout used for author and committer dates
pub const WHEN_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// An author or committer identity with its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GitPerson {
    pub email: String,
    pub name: String,
    pub when: String,
}

impl GitPerson {
    fn from_signature(sig: &git2::Signature<'_>) -> Self {
        Self {
            email: lossy(sig.email(), sig.email_bytes()),
            name: lossy(sig.name(), sig.name_bytes()),
            when: format_when(sig.when()),
        }
    }
}

/// The commit description that is hashed into a git artifact key.
///
/// Field order is part of the key derivation; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitBlock {
    #[serde(rename = "Author")]
    pub author: GitPerson,
    #[serde(rename = "Commit")]
    pub commit: String,
    #[serde(rename = "Committer")]
    pub committer: GitPerson,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "PGPSignature")]
    pub pgp_signature: Option<String>,
    #[serde(rename = "Parents")]
    pub parents: Vec<String>,
    #[serde(rename = "Tree")]
    pub tree: String,
}

impl GitBlock {
    /// canonical JSON text of the block
    pub fn canonical_json(&self) -> serde_json::Result<String> {
        canonical::to_canonical_string(self)
    }

    /// artifact key: SHA-256 of the canonical JSON
    pub fn key(&self) -> serde_json::Result<String> {
        Ok(hashing::hash_content(self.canonical_json()?))
    }

    /// first seven characters of the commit sha
    pub fn short_sha(&self) -> &str {
        &self.commit[..self.commit.len().min(7)]
    }
}

/// Name plus commit block for a repository at its current HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitMetadata {
    #[serde(rename = "Name")]
    pub name: String,
    pub git: GitBlock,
}

impl GitMetadata {
    /// artifact key of the embedded block
    pub fn key(&self) -> serde_json::Result<String> {
        self.git.key()
    }
}

/// Read the metadata of the repository at `repo_path`.
///
/// The path must be the repository itself; parent directories are not
/// searched. Nothing in the repository is modified.
pub fn extract_git_metadata(repo_path: impl AsRef<Path>) -> GitResult<GitMetadata> {
    let path = repo_path.as_ref();
    let repo = Repository::open(path).map_err(|_| GitError::RepositoryNotFound(path.to_path_buf()))?;

    let remote_url = remote_url(&repo, path)?;
    let location = RemoteLocation::parse(&remote_url)?;

    let head = repo.head().map_err(|e| {
        if e.code() == git2::ErrorCode::UnbornBranch || e.code() == git2::ErrorCode::NotFound {
            GitError::EmptyRepository(path.to_path_buf())
        } else {
            GitError::Git(e)
        }
    })?;
    let commit = head.peel_to_commit()?;

    let block = GitBlock {
        author: GitPerson::from_signature(&commit.author()),
        commit: commit.id().to_string(),
        committer: GitPerson::from_signature(&commit.committer()),
        message: lossy(commit.message(), commit.message_bytes()),
        pgp_signature: commit
            .header_field_bytes("gpgsig")
            .ok()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned()),
        parents: ancestors(&repo, &commit)?,
        tree: commit.tree_id().to_string(),
    };

    Ok(GitMetadata {
        name: location.artifact_name(block.short_sha()),
        git: block,
    })
}

/// URL of `origin`, or of the first configured remote when there is no origin
fn remote_url(repo: &Repository, path: &Path) -> GitResult<String> {
    let names = repo.remotes()?;
    let name = if names.iter().flatten().any(|n| n == "origin") {
        "origin".to_string()
    } else {
        names
            .iter()
            .flatten()
            .next()
            .map(str::to_string)
            .ok_or_else(|| GitError::NoRemote(path.to_path_buf()))?
    };

    let remote = repo.find_remote(&name)?;
    remote
        .url()
        .map(str::to_string)
        .ok_or_else(|| GitError::InvalidRemote(lossy(None, remote.url_bytes())))
}

/// Every ancestor of `commit`, newest first, as `git rev-list <commit>^@` lists them.
fn ancestors(repo: &Repository, commit: &git2::Commit<'_>) -> GitResult<Vec<String>> {
    if commit.parent_count() == 0 {
        return Ok(Vec::new());
    }

    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TIME)?;
    for id in commit.parent_ids() {
        walk.push(id)?;
    }
    walk.map(|id| id.map(|id| id.to_string()).map_err(GitError::from))
        .collect()
}

fn format_when(time: git2::Time) -> String {
    let Some(utc) = DateTime::from_timestamp(time.seconds(), 0) else {
        return time.seconds().to_string();
    };
    match FixedOffset::east_opt(time.offset_minutes() * 60) {
        Some(offset) => utc.with_timezone(&offset).format(WHEN_FORMAT).to_string(),
        None => utc.format(WHEN_FORMAT).to_string(),
    }
}

fn lossy(text: Option<&str>, bytes: &[u8]) -> String {
    match text {
        Some(s) => s.to_string(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}
