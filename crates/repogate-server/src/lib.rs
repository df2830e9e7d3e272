//! HTTP surface of the repogate facade.
//!
//! Routes:
//! - `GET    /repos/{repo}/structure` full recursive tree of the default branch
//! - `GET    /repos/{repo}/file?path=` decoded file content
//! - `POST   /repos/{repo}/file` create a file (201)
//! - `PUT    /repos/{repo}/file` validated update
//! - `DELETE /repos/{repo}/file` delete a file
//! - `GET    /health`
//!
//! Every failure renders as `{"detail": "..."}`. Malformed requests are 422,
//! domain failures use [`DomainError::http_status`].
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use repogate_core::{
    DomainError, FileContentResult, FileReference, FileService, FileWriteRequest, InvalidPath,
};
use repogate_remote::{RepositoryClient, TreeEntry};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const DEFAULT_CREATE_MESSAGE: &str = "Create file via API";
pub const DEFAULT_UPDATE_MESSAGE: &str = "Update file via API";
pub const DEFAULT_DELETE_MESSAGE: &str = "Delete file via API";

type Shared<C> = Arc<FileService<C>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    InvalidPath(#[from] InvalidPath),
    #[error("{0}")]
    Rejected(String),
    #[error("Not Found")]
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(e) => {
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::InvalidPath(_) | Self::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = ErrorBody {
            detail: self.to_string(),
        };
        (self.status(), Json(detail)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, Serialize)]
pub struct StructureResponse {
    pub repo: String,
    pub tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFileBody {
    pub path: String,
    pub filename: String,
    pub content: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFileBody {
    pub path: String,
    pub filename: String,
    pub content: String,
    pub message: Option<String>,
    /// Hex SHA-256 the caller computed over `content`.
    pub content_sha256: Option<String>,
    /// Line count of the file the caller is replacing.
    pub content_lines: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFileBody {
    pub path: String,
    pub filename: String,
    pub message: Option<String>,
}

impl CreateFileBody {
    pub fn into_request(self, repository: &str) -> Result<FileWriteRequest, ApiError> {
        let target = FileReference::new(&self.path, &self.filename)?;
        let message = self
            .message
            .unwrap_or_else(|| DEFAULT_CREATE_MESSAGE.to_owned());
        Ok(FileWriteRequest::new(repository, target, self.content, &message))
    }
}

impl UpdateFileBody {
    pub fn into_request(self, repository: &str) -> Result<FileWriteRequest, ApiError> {
        let target = FileReference::new(&self.path, &self.filename)?;
        let message = self
            .message
            .unwrap_or_else(|| DEFAULT_UPDATE_MESSAGE.to_owned());
        Ok(
            FileWriteRequest::new(repository, target, self.content, &message)
                .with_expected_hash(self.content_sha256)
                .with_expected_lines(self.content_lines),
        )
    }
}

/// Build the application router around a shared service.
pub fn router<C: RepositoryClient + 'static>(service: Shared<C>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/repos/{repo}/structure", get(read_structure::<C>))
        .route(
            "/repos/{repo}/file",
            get(read_file::<C>)
                .post(create_file::<C>)
                .put(update_file::<C>)
                .delete(delete_file::<C>),
        )
        .fallback(not_found)
        .layer(middleware::from_fn(log_requests))
        .with_state(service)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<C: RepositoryClient + 'static>(
    listener: TcpListener,
    service: FileService<C>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(Arc::new(service)))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    info!("→ {method} {path}");
    let response = next.run(request).await;
    info!("← {method} {path} {}", response.status().as_u16());
    response
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn read_structure<C: RepositoryClient>(
    State(service): State<Shared<C>>,
    Path(repo): Path<String>,
) -> Result<Json<StructureResponse>, ApiError> {
    let tree = service.read_structure(&repo).await?;
    Ok(Json(StructureResponse { repo, tree }))
}

async fn read_file<C: RepositoryClient>(
    State(service): State<Shared<C>>,
    Path(repo): Path<String>,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Result<Json<FileContentResult>, ApiError> {
    let Query(query) = query?;
    if query.path.is_empty() {
        return Err(ApiError::Rejected(
            "query parameter `path` must not be empty".to_owned(),
        ));
    }
    Ok(Json(service.read_file(&repo, &query.path).await?))
}

async fn create_file<C: RepositoryClient>(
    State(service): State<Shared<C>>,
    Path(repo): Path<String>,
    body: Result<Json<CreateFileBody>, JsonRejection>,
) -> Result<(StatusCode, Json<FileContentResult>), ApiError> {
    let Json(body) = body?;
    let request = body.into_request(&repo)?;
    let created = service.create_file(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_file<C: RepositoryClient>(
    State(service): State<Shared<C>>,
    Path(repo): Path<String>,
    body: Result<Json<UpdateFileBody>, JsonRejection>,
) -> Result<Json<FileContentResult>, ApiError> {
    let Json(body) = body?;
    let request = body.into_request(&repo)?;
    Ok(Json(service.update_file(&request).await?))
}

async fn delete_file<C: RepositoryClient>(
    State(service): State<Shared<C>>,
    Path(repo): Path<String>,
    body: Result<Json<DeleteFileBody>, JsonRejection>,
) -> Result<Json<FileContentResult>, ApiError> {
    let Json(body) = body?;
    let target = FileReference::new(&body.path, &body.filename)?;
    let message = body
        .message
        .unwrap_or_else(|| DEFAULT_DELETE_MESSAGE.to_owned());
    Ok(Json(service.delete_file(&repo, &target, &message).await?))
}

/// A test helper that serves the router on a random port in a background task.
///
/// The server listens on `127.0.0.1:{port}`. Dropping the `TestServer` aborts
/// the task.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind `127.0.0.1:0` and start serving `service`.
    pub async fn start<C: RepositoryClient + 'static>(service: FileService<C>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test HTTP server");
        let port = listener.local_addr().expect("no local address").port();
        let url = format!("http://127.0.0.1:{port}");

        let app = router(Arc::new(service));
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("test server on port {port} stopped: {e}");
            }
        });

        Self { url, port, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn create_body_defaults_message() {
        let body: CreateFileBody =
            serde_json::from_str(r#"{"path": "docs", "filename": "a.md", "content": "x"}"#)
                .unwrap();
        let request = body.into_request("widgets").unwrap();
        assert_eq!(request.commit_message, DEFAULT_CREATE_MESSAGE);
        assert_eq!(request.target.full_path(), "docs/a.md");
    }

    #[test]
    fn update_body_carries_expectations() {
        let body: UpdateFileBody = serde_json::from_str(
            r#"{"path": "", "filename": "a.py", "content": "x", "message": "m",
                "content_sha256": "abc", "content_lines": 12}"#,
        )
        .unwrap();
        let request = body.into_request("widgets").unwrap();
        assert_eq!(request.commit_message, "m");
        assert_eq!(request.expected_content_hash.as_deref(), Some("abc"));
        assert_eq!(request.expected_line_count, Some(12));
        assert_eq!(request.target.full_path(), "a.py");
    }

    #[test]
    fn update_body_without_expectations() {
        let body: UpdateFileBody =
            serde_json::from_str(r#"{"path": "d", "filename": "a.py", "content": "x"}"#).unwrap();
        let request = body.into_request("widgets").unwrap();
        assert_eq!(request.commit_message, DEFAULT_UPDATE_MESSAGE);
        assert!(request.expected_content_hash.is_none());
        assert!(request.expected_line_count.is_none());
    }

    #[test]
    fn slash_in_filename_is_unprocessable() {
        let body: CreateFileBody =
            serde_json::from_str(r#"{"path": "d", "filename": "a/b.txt", "content": "x"}"#)
                .unwrap();
        let err = body.into_request("widgets").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn leading_slash_in_path_is_unprocessable() {
        let body: CreateFileBody =
            serde_json::from_str(r#"{"path": "/abs", "filename": "a.txt", "content": "x"}"#)
                .unwrap();
        let err = body.into_request("widgets").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn domain_error_renders_detail() {
        let err = ApiError::from(DomainError::RepositoryNotFound {
            repository: "ghost-repo".to_owned(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"detail": "Repository 'ghost-repo' not found"})
        );
    }

    #[tokio::test]
    async fn upstream_conflict_keeps_status() {
        let err = ApiError::from(DomainError::Upstream {
            status: 409,
            message: "a.txt does not match".to_owned(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await["detail"],
            "GitHub API error: a.txt does not match"
        );
    }

    #[tokio::test]
    async fn fallback_renders_json_404() {
        let response = not_found().await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"detail": "Not Found"})
        );
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(value) = health().await;
        assert_eq!(value, serde_json::json!({"status": "ok"}));
    }
}
