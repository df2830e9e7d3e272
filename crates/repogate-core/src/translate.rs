use crate::DomainError;
use repogate_remote::RemoteError;
use tracing::debug;

/// The upstream call a transport failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamCall {
    DefaultBranch,
    Tree,
    FetchBlob,
    CreateBlob,
    UpdateBlob,
    DeleteBlob,
}

impl UpstreamCall {
    /// Whether a 404 from this call means the repository itself is missing.
    fn not_found_is_repository(self) -> bool {
        matches!(self, Self::DefaultBranch | Self::Tree | Self::CreateBlob)
    }
}

/// Map a remote failure onto the domain taxonomy. Pure; never retries.
pub fn translate(
    call: UpstreamCall,
    repository: &str,
    path: &str,
    err: RemoteError,
) -> DomainError {
    debug!("{call:?} on {repository} failed: {err}");
    if err.status() == Some(404) {
        return if call.not_found_is_repository() {
            DomainError::RepositoryNotFound {
                repository: repository.to_owned(),
            }
        } else {
            DomainError::FileNotFound {
                repository: repository.to_owned(),
                path: path.to_owned(),
            }
        };
    }
    match err {
        RemoteError::Status { status, message } => DomainError::Upstream { status, message },
        RemoteError::Transport(cause) => DomainError::UpstreamUnreachable(cause),
        other @ (RemoteError::Decode(_) | RemoteError::Config(_) | RemoteError::Io(_)) => {
            DomainError::Upstream {
                status: 502,
                message: other.to_string(),
            }
        }
    }
}
