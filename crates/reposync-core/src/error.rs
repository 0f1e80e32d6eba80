//! Sync error handling
//!
//! Typed errors for remote repository operations. Errors are stored in the
//! session state for display, so they are cheap to clone and compare.

use thiserror::Error;

/// Errors that can occur while talking to the repository metadata service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Could not reach the service (connect, timeout, TLS, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// Service answered with a body we could not decode
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// A single repository in a metadata batch failed to load
    #[error("Repo error: {0}")]
    RepoFetch(String),

    /// Dotted team path with an empty segment
    #[error("Invalid team name '{0}': team name segments must not be empty")]
    InvalidTeamName(String),

    /// Repository name is empty or whitespace
    #[error("Repository name must not be empty")]
    EmptyRepoName,
}

impl SyncError {
    /// Build an error from a failed HTTP request
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return SyncError::InvalidResponse(error.to_string());
        }
        match error.status() {
            Some(status) => SyncError::Server {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None => SyncError::Transport(error.to_string()),
        }
    }

    /// Whether trying the same operation again later could succeed
    ///
    /// Nothing in the core retries automatically; this only picks the hint.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Transport(_) => true,
            SyncError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get a hint to show next to the error
    pub fn user_hint(&self) -> Option<&'static str> {
        match self {
            SyncError::Transport(_) => {
                Some("Check that the repository service is reachable (server_url) and try again.")
            }
            SyncError::Server { status: 401, .. } | SyncError::Server { status: 403, .. } => {
                Some("The service rejected the request. Check that you are signed in.")
            }
            SyncError::InvalidTeamName(_) => {
                Some("Use a dotted team path such as 'acme' or 'acme.eng'.")
            }
            _ if self.is_transient() => {
                Some("The repository service is busy or unavailable. Try again shortly.")
            }
            _ => None,
        }
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
