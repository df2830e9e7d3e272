use crate::{
    BlobSnapshot, EntryKind, GitHubConfig, PutResult, RemoteError, RepositoryClient, TreeEntry,
};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("repogate/", env!("CARGO_PKG_VERSION"));
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// GitHub REST API backend.
///
/// Speaks the subset of the API the facade needs:
/// - `GET    /repos/{owner}/{repo}` resolves the default branch
/// - `GET    /repos/{owner}/{repo}/git/trees/{ref}?recursive=1` lists the full tree
/// - `GET    /repos/{owner}/{repo}/contents/{path}` reads a file and its blob SHA
/// - `PUT    /repos/{owner}/{repo}/contents/{path}` creates or updates a file
/// - `DELETE /repos/{owner}/{repo}/contents/{path}` deletes a file
#[derive(Debug)]
pub struct GitHubClient {
    config: GitHubConfig,
    base: Url,
    client: Client,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self, RemoteError> {
        config.validate()?;
        let base = Url::parse(&config.api_url).map_err(|e| {
            RemoteError::Config(format!("invalid GitHub API URL '{}': {e}", config.api_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::Config(format!(
                "GitHub API URL '{}' cannot carry a path",
                config.api_url
            )));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RemoteError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            config,
            base,
            client,
        })
    }

    fn repo_url<'a>(&self, repo: &str, tail: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("repos")
                .push(&self.config.owner)
                .push(repo)
                .extend(tail);
        }
        url
    }

    fn contents_url(&self, repo: &str, path: &str) -> Url {
        let segments = path.split('/').filter(|s| !s.is_empty());
        self.repo_url(repo, std::iter::once("contents").chain(segments))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .bearer_auth(&self.config.token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("upstream request failed")
                    .to_owned()
            } else {
                body
            }
        });
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = self.send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<RawTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct RawTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    path: String,
    #[serde(default)]
    content: String,
    /// `base64` for inline content, `none` once a file exceeds the 1 MB inline limit.
    #[serde(default)]
    encoding: Option<String>,
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    path: String,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    message: &'a str,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

fn extract_error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok()?;
    parsed
        .get("message")
        .and_then(|message| message.as_str())
        .map(ToOwned::to_owned)
}

fn map_tree_entry(raw: RawTreeEntry) -> Option<TreeEntry> {
    let kind = match raw.kind.as_str() {
        "blob" => EntryKind::File,
        "tree" => EntryKind::Directory,
        other => {
            debug!("skipping tree entry {} of type {other}", raw.path);
            return None;
        }
    };
    Some(TreeEntry::new(raw.path, kind))
}

impl RepositoryClient for GitHubClient {
    async fn fetch_default_branch(&self, repo: &str) -> Result<String, RemoteError> {
        if let Some(branch) = &self.config.branch {
            return Ok(branch.clone());
        }
        let url = self.repo_url(repo, None::<&str>);
        debug!("GET {url}");
        let info: RepoResponse = self.send_json(self.request(Method::GET, url)).await?;
        Ok(info.default_branch)
    }

    async fn fetch_tree(&self, repo: &str, branch: &str) -> Result<Vec<TreeEntry>, RemoteError> {
        let mut url = self.repo_url(repo, ["git", "trees", branch]);
        url.query_pairs_mut().append_pair("recursive", "1");
        debug!("GET {url}");
        let listing: TreeResponse = self.send_json(self.request(Method::GET, url)).await?;
        if listing.truncated {
            warn!(
                "tree listing for {repo}@{branch} was truncated upstream ({} entries)",
                listing.tree.len()
            );
        }
        Ok(listing.tree.into_iter().filter_map(map_tree_entry).collect())
    }

    async fn fetch_blob(&self, repo: &str, path: &str) -> Result<BlobSnapshot, RemoteError> {
        let mut url = self.contents_url(repo, path);
        if let Some(branch) = &self.config.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        debug!("GET {url}");
        let value: serde_json::Value = self.send_json(self.request(Method::GET, url)).await?;
        if value.is_array() {
            return Err(RemoteError::Decode(format!("'{path}' is a directory")));
        }
        let content: ContentResponse =
            serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))?;
        if let Some(encoding) = content.encoding.as_deref().filter(|e| *e != "base64") {
            return Err(RemoteError::Decode(format!(
                "content of '{path}' is not inlined by the contents API (encoding '{encoding}')"
            )));
        }
        Ok(BlobSnapshot {
            path: content.path,
            content_base64: content.content,
            revision: content.sha,
        })
    }

    async fn put_blob(
        &self,
        repo: &str,
        path: &str,
        content_base64: &str,
        commit_message: &str,
        revision: Option<&str>,
    ) -> Result<PutResult, RemoteError> {
        let url = self.contents_url(repo, path);
        debug!("PUT {url} ({} bytes encoded)", content_base64.len());
        let body = PutRequest {
            message: commit_message,
            content: content_base64,
            sha: revision,
            branch: self.config.branch.as_deref(),
        };
        let response: PutResponse = self
            .send_json(self.request(Method::PUT, url).json(&body))
            .await?;
        Ok(PutResult {
            path: response.content.path,
        })
    }

    async fn delete_blob(
        &self,
        repo: &str,
        path: &str,
        commit_message: &str,
        revision: &str,
    ) -> Result<(), RemoteError> {
        let url = self.contents_url(repo, path);
        debug!("DELETE {url}");
        let body = DeleteRequest {
            message: commit_message,
            sha: revision,
            branch: self.config.branch.as_deref(),
        };
        self.send(self.request(Method::DELETE, url).json(&body))
            .await?;
        Ok(())
    }
}
