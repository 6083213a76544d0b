//! Remote URL handling for synthesized artifact names.
//!
//! A repository is named `git@{host}:{path}@{short sha}`. The host and path
//! come from the remote URL, which may be a real URL (`https://`, `ssh://`,
//! `file://`), an SCP-style address (`git@host:org/repo.git`) or a bare path.

use url::Url;

use crate::git::error::{GitError, GitResult};

/// Host and path components of a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    /// host, with `:port` appended when the URL names one
    pub host: String,
    /// path as written in the URL, including any leading `/`
    pub path: String,
}

impl RemoteLocation {
    /// Split a remote URL into host and path.
    pub fn parse(raw: &str) -> GitResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(GitError::InvalidRemote(raw.to_string()));
        }

        if let Some(location) = Self::parse_scp(raw) {
            return Ok(location);
        }

        match Url::parse(raw) {
            Ok(url) => {
                let host = match (url.host_str(), url.port()) {
                    (Some(host), Some(port)) => format!("{}:{}", host, port),
                    (Some(host), None) => host.to_string(),
                    (None, _) => String::new(),
                };
                Ok(Self {
                    host,
                    path: url.path().to_string(),
                })
            }
            // local paths have no host
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self {
                host: String::new(),
                path: raw.to_string(),
            }),
            Err(_) => Err(GitError::InvalidRemote(raw.to_string())),
        }
    }

    /// `user@host:path`, where the part before the colon has no slash
    fn parse_scp(raw: &str) -> Option<Self> {
        if raw.contains("://") {
            return None;
        }
        let (authority, path) = raw.split_once(':')?;
        if authority.contains('/') || authority.is_empty() {
            return None;
        }
        // a drive letter is a windows path, not a host
        if authority.len() == 1 && path.starts_with('\\') {
            return None;
        }
        let host = authority.rsplit('@').next().unwrap_or(authority);
        Some(Self {
            host: host.to_string(),
            path: path.to_string(),
        })
    }

    /// `git@{host}:{path}@{short_sha}`
    pub fn artifact_name(&self, short_sha: &str) -> String {
        let path = match self.path.strip_prefix('/') {
            Some(rest) => format!(":{}", rest),
            None if self.path.is_empty() => String::new(),
            None if self.host.is_empty() => self.path.clone(),
            None => format!(":{}", self.path),
        };
        format!("git@{}{}@{}", self.host, path, short_sha)
    }
}
