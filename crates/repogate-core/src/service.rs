use crate::path::{FileReference, FileWriteRequest};
use crate::translate::{translate, UpstreamCall};
use crate::validate::UpdateValidator;
use crate::DomainError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use repogate_remote::{RepositoryClient, TreeEntry};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const UTF8_ENCODING: &str = "utf-8";

/// Outward-facing result of every file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContentResult {
    pub path: String,
    pub content: String,
    pub encoding: String,
}

impl FileContentResult {
    fn utf8(path: String, content: String) -> Self {
        Self {
            path,
            content,
            encoding: UTF8_ENCODING.to_owned(),
        }
    }
}

/// Facade over a remote repository.
///
/// Decodes and encodes content, runs the update validator, calls the client
/// and translates its failures. Holds no per-request state; every call works
/// only with what it is given and what it fetches.
pub struct FileService<C> {
    client: C,
    validator: UpdateValidator,
}

impl<C: RepositoryClient> FileService<C> {
    pub fn new(client: C, validator: UpdateValidator) -> Self {
        Self { client, validator }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn validator(&self) -> &UpdateValidator {
        &self.validator
    }

    /// Full recursive tree of the repository's default branch, in upstream order.
    pub async fn read_structure(&self, repository: &str) -> Result<Vec<TreeEntry>, DomainError> {
        let branch = self
            .client
            .fetch_default_branch(repository)
            .await
            .map_err(|e| translate(UpstreamCall::DefaultBranch, repository, "", e))?;
        debug!("listing {repository}@{branch}");
        self.client
            .fetch_tree(repository, &branch)
            .await
            .map_err(|e| translate(UpstreamCall::Tree, repository, "", e))
    }

    pub async fn read_file(
        &self,
        repository: &str,
        path: &str,
    ) -> Result<FileContentResult, DomainError> {
        let snapshot = self
            .client
            .fetch_blob(repository, path)
            .await
            .map_err(|e| translate(UpstreamCall::FetchBlob, repository, path, e))?;
        let content = decode_content(&snapshot.content_base64, &snapshot.path)?;
        Ok(FileContentResult::utf8(snapshot.path, content))
    }

    /// Create a file. The echoed content is the caller's input, not a re-fetch.
    pub async fn create_file(
        &self,
        request: &FileWriteRequest,
    ) -> Result<FileContentResult, DomainError> {
        let repository = request.repository.as_str();
        let path = request.target.full_path();
        info!("creating {path} in {repository}");

        let encoded = STANDARD.encode(request.content.as_bytes());
        let created = self
            .client
            .put_blob(repository, &path, &encoded, &request.commit_message, None)
            .await
            .map_err(|e| translate(UpstreamCall::CreateBlob, repository, &path, e))?;
        Ok(FileContentResult::utf8(
            created.path,
            request.content.clone(),
        ))
    }

    /// Validate, then replace a file at its freshly fetched revision.
    ///
    /// A rejected update never reaches the client. A concurrent edit between the
    /// revision fetch and the write surfaces as the upstream conflict; there is
    /// no retry.
    pub async fn update_file(
        &self,
        request: &FileWriteRequest,
    ) -> Result<FileContentResult, DomainError> {
        let repository = request.repository.as_str();
        let path = request.target.full_path();

        if let Err(e) = self.validator.validate_update(
            &request.content,
            request.expected_content_hash.as_deref(),
            request.expected_line_count,
            request.target.filename(),
        ) {
            warn!("rejected update of {path} in {repository}: {e}");
            return Err(e.into());
        }

        let current = self
            .client
            .fetch_blob(repository, &path)
            .await
            .map_err(|e| translate(UpstreamCall::FetchBlob, repository, &path, e))?;

        info!(
            "updating {path} in {repository} at revision {}",
            current.revision
        );
        let encoded = STANDARD.encode(request.content.as_bytes());
        let updated = self
            .client
            .put_blob(
                repository,
                &path,
                &encoded,
                &request.commit_message,
                Some(&current.revision),
            )
            .await
            .map_err(|e| translate(UpstreamCall::UpdateBlob, repository, &path, e))?;
        Ok(FileContentResult::utf8(
            updated.path,
            request.content.clone(),
        ))
    }

    pub async fn delete_file(
        &self,
        repository: &str,
        target: &FileReference,
        commit_message: &str,
    ) -> Result<FileContentResult, DomainError> {
        let path = target.full_path();
        let current = self
            .client
            .fetch_blob(repository, &path)
            .await
            .map_err(|e| translate(UpstreamCall::FetchBlob, repository, &path, e))?;

        info!(
            "deleting {path} in {repository} at revision {}",
            current.revision
        );
        self.client
            .delete_blob(repository, &path, commit_message, &current.revision)
            .await
            .map_err(|e| translate(UpstreamCall::DeleteBlob, repository, &path, e))?;
        Ok(FileContentResult::utf8(path, String::new()))
    }
}

/// Decode GitHub's base64 payload, which arrives wrapped at 60 columns.
fn decode_content(encoded: &str, path: &str) -> Result<String, DomainError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact).map_err(|e| DomainError::Upstream {
        status: 502,
        message: format!("content of '{path}' is not valid base64: {e}"),
    })?;
    String::from_utf8(bytes).map_err(|_| DomainError::Upstream {
        status: 502,
        message: format!("content of '{path}' is not valid UTF-8"),
    })
}
