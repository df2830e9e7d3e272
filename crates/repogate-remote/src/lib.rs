//! Remote repository access for the repogate facade.
//!
//! This crate provides the [`RepositoryClient`] trait the facade consumes, a
//! reqwest-backed [`GitHubClient`] speaking the GitHub REST API, and the
//! [`GitHubConfig`] carrying the credential and owner identity the client is
//! constructed with.

pub mod config;
pub mod http;

pub use config::GitHubConfig;
pub use http::GitHubClient;

use serde::Serialize;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("upstream responded with HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("upstream unreachable: {0}")]
    Transport(String),
    #[error("malformed upstream response: {0}")]
    Decode(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// HTTP status of the upstream response, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Kind of an entry in a repository tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// A single path in a repository tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn new(path: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// A file as read from the remote, still in its transport encoding.
///
/// `revision` is the upstream blob SHA. It authorizes exactly one subsequent
/// update or delete and goes stale as soon as anyone else touches the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobSnapshot {
    pub path: String,
    pub content_base64: String,
    pub revision: String,
}

/// Upstream confirmation of a created or updated blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    pub path: String,
}

/// Trait for remote repository backends.
///
/// Every method issues exactly one upstream request. Implementations never
/// retry; failures are returned as-is for the caller to translate.
pub trait RepositoryClient: Send + Sync {
    /// Resolve the branch new commits land on.
    fn fetch_default_branch(
        &self,
        repo: &str,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;

    /// Recursive listing of every file and directory at `branch`.
    fn fetch_tree(
        &self,
        repo: &str,
        branch: &str,
    ) -> impl Future<Output = Result<Vec<TreeEntry>, RemoteError>> + Send;

    /// Read a single file together with its current revision token.
    fn fetch_blob(
        &self,
        repo: &str,
        path: &str,
    ) -> impl Future<Output = Result<BlobSnapshot, RemoteError>> + Send;

    /// Create a file (`revision` = `None`) or replace it (`revision` = its current token).
    fn put_blob(
        &self,
        repo: &str,
        path: &str,
        content_base64: &str,
        commit_message: &str,
        revision: Option<&str>,
    ) -> impl Future<Output = Result<PutResult, RemoteError>> + Send;

    /// Delete a file at the given revision.
    fn delete_blob(
        &self,
        repo: &str,
        path: &str,
        commit_message: &str,
        revision: &str,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_entry_serializes_type_field() {
        let entry = TreeEntry::new("src/main.rs", EntryKind::File);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"path": "src/main.rs", "type": "file"}));

        let dir = TreeEntry::new("src", EntryKind::Directory);
        assert_eq!(serde_json::to_value(&dir).unwrap()["type"], "directory");
    }

    #[test]
    fn status_only_for_status_errors() {
        let e = RemoteError::Status {
            status: 409,
            message: "sha mismatch".to_owned(),
        };
        assert_eq!(e.status(), Some(409));
        assert_eq!(RemoteError::Transport("dns".to_owned()).status(), None);
    }
}
