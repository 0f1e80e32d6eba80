//! Remote repository metadata service
//!
//! The controller only talks to the service through `RepoService`, so the
//! transport can be swapped (HTTP in production, in-memory fakes in tests).

mod http;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::models::{RepoResult, TeamName};

pub use http::HttpRepoService;

/// Badge category cleared when the user leaves the repository view
pub const NEW_REPO_CATEGORY: &str = "new_git_repo";

#[async_trait]
pub trait RepoService: Send + Sync {
    /// Fetch metadata for every repository visible to the session
    async fn get_all_metadata(&self) -> SyncResult<Vec<RepoResult>>;

    async fn create_personal(&self, repo_name: &str) -> SyncResult<()>;

    async fn create_team(
        &self,
        repo_name: &str,
        team: &TeamName,
        notify_team: bool,
    ) -> SyncResult<()>;

    async fn delete_personal(&self, repo_name: &str) -> SyncResult<()>;

    async fn delete_team(
        &self,
        repo_name: &str,
        team: &TeamName,
        notify_team: bool,
    ) -> SyncResult<()>;

    /// Dismiss all notifications of one category
    async fn dismiss_category(&self, category: &str) -> SyncResult<()>;
}
