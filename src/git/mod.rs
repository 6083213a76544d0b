//! Git repository metadata for notarization.
//!
//! This module is the only place that touches `git2`. It opens a repository
//! read-only, resolves HEAD and the remote, and produces a [`GitMetadata`]
//! whose [`GitBlock`] is hashed into the artifact key.
//!
//! # Usage
//!
//! ```ignore
//! use ledger_notary::git::extract_git_metadata;
//!
//! let meta = extract_git_metadata("./my-project")?;
//! println!("{} -> {}", meta.name, meta.key()?);
//! ```

mod error;
mod metadata;
mod remote;

pub use error::{GitError, GitResult};
pub use metadata::{extract_git_metadata, GitBlock, GitMetadata, GitPerson, WHEN_FORMAT};
pub use remote::RemoteLocation;

#[cfg(test)]
pub(crate) use metadata::fixtures;
