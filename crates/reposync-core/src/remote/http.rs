//! HTTP transport for the repository metadata service
//!
//! JSON endpoints, relative to the configured base URL:
//!
//! | operation          | request                      |
//! |--------------------|------------------------------|
//! | all metadata       | `GET /repos`                 |
//! | create personal    | `POST /repos/personal`       |
//! | create team        | `POST /repos/team`           |
//! | delete personal    | `DELETE /repos/personal`     |
//! | delete team        | `DELETE /repos/team`         |
//! | dismiss category   | `POST /notifications/dismiss`|

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use tracing::debug;

use super::RepoService;
use crate::error::{SyncError, SyncResult};
use crate::models::{RepoResult, TeamName};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PersonalRepoRequest<'a> {
    repo_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TeamRepoRequest<'a> {
    repo_name: &'a str,
    team_name: &'a TeamName,
    notify_team: bool,
}

#[derive(Debug, Serialize)]
struct DismissRequest<'a> {
    category: &'a str,
}

/// `RepoService` backed by a JSON HTTP API
#[derive(Debug, Clone)]
pub struct HttpRepoService {
    base_url: String,
    client: Client,
}

impl HttpRepoService {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SyncError::from_reqwest)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> SyncResult<Response> {
        let url = self.endpoint(path);
        debug!("{} {}", method, url);

        let response = self
            .client
            .request(method, &url)
            .json(body)
            .send()
            .await
            .map_err(SyncError::from_reqwest)?;

        check_status(response).await
    }
}

/// Turn non-success responses into `SyncError::Server`, keeping the body text
async fn check_status(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .ok()
        .filter(|body| !body.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

    Err(SyncError::Server {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RepoService for HttpRepoService {
    async fn get_all_metadata(&self) -> SyncResult<Vec<RepoResult>> {
        let url = self.endpoint("repos");
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(SyncError::from_reqwest)?;
        let response = check_status(response).await?;

        response
            .json::<Option<Vec<RepoResult>>>()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| SyncError::InvalidResponse(e.to_string()))
    }

    async fn create_personal(&self, repo_name: &str) -> SyncResult<()> {
        self.send(
            Method::POST,
            "repos/personal",
            &PersonalRepoRequest { repo_name },
        )
        .await?;
        Ok(())
    }

    async fn create_team(
        &self,
        repo_name: &str,
        team: &TeamName,
        notify_team: bool,
    ) -> SyncResult<()> {
        self.send(
            Method::POST,
            "repos/team",
            &TeamRepoRequest {
                repo_name,
                team_name: team,
                notify_team,
            },
        )
        .await?;
        Ok(())
    }

    async fn delete_personal(&self, repo_name: &str) -> SyncResult<()> {
        self.send(
            Method::DELETE,
            "repos/personal",
            &PersonalRepoRequest { repo_name },
        )
        .await?;
        Ok(())
    }

    async fn delete_team(
        &self,
        repo_name: &str,
        team: &TeamName,
        notify_team: bool,
    ) -> SyncResult<()> {
        self.send(
            Method::DELETE,
            "repos/team",
            &TeamRepoRequest {
                repo_name,
                team_name: team,
                notify_team,
            },
        )
        .await?;
        Ok(())
    }

    async fn dismiss_category(&self, category: &str) -> SyncResult<()> {
        self.send(
            Method::POST,
            "notifications/dismiss",
            &DismissRequest { category },
        )
        .await?;
        Ok(())
    }
}
