//! Git metadata error types

use std::path::PathBuf;

use thiserror::Error;

/// errors raised while reading repository state
#[derive(Debug, Error)]
pub enum GitError {
    /// the path does not contain a git repository
    #[error("not a git repository: {0}")]
    RepositoryNotFound(PathBuf),

    /// the repository has no remote to derive a name from
    #[error("repository has no configured remote: {0}")]
    NoRemote(PathBuf),

    /// HEAD points at an unborn branch
    #[error("repository is empty: no commits found at {0}")]
    EmptyRepository(PathBuf),

    /// the remote URL can't be split into host and path
    #[error("invalid remote url: {0}")]
    InvalidRemote(String),

    /// error from the underlying git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

impl GitError {
    /// check if this error means the caller pointed at something that isn't a repository
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitError::RepositoryNotFound(_))
    }
}

/// result type alias for git metadata operations
pub type GitResult<T> = Result<T, GitError>;
