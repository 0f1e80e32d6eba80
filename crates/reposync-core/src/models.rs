//! Data models for reposync
//!
//! Two layers live here:
//! - wire types (`RepoResult`, `RepoInfo`, ...) as returned by the metadata service
//! - `RepoRecord`, the local entity kept in the session cache

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::reltime;

/// Opaque, globally unique repository identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(String);

impl RepoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepoId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A team name split on dots ("acme.eng" -> ["acme", "eng"])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamName {
    pub parts: Vec<String>,
}

impl TeamName {
    /// Parse a dotted team path
    pub fn parse(dotted: &str) -> Result<Self, SyncError> {
        let parts: Vec<String> = dotted.split('.').map(str::to_string).collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(SyncError::InvalidTeamName(dotted.to_string()));
        }
        Ok(Self { parts })
    }
}

impl fmt::Display for TeamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

/// Kind of folder a repository lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    Private,
    Public,
    Team,
    #[serde(other)]
    Unknown,
}

/// Folder (container) holding a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Username or team name owning the folder
    pub name: String,
    /// Visibility; only private repositories are tracked locally
    pub private: bool,
    pub folder_type: FolderType,
}

/// Metadata kept by the service about the last write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMetadata {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub mtime: DateTime<Utc>,
    pub last_modifying_username: String,
    pub last_modifying_device_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalMetadata {
    pub repo_name: String,
}

/// Full description of one repository as sent by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoInfo {
    pub global_unique_id: RepoId,
    pub repo_url: String,
    pub folder: Folder,
    pub local_metadata: LocalMetadata,
    pub server_metadata: ServerMetadata,
    pub can_delete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoResultState {
    Ok,
    Err,
}

/// Per-repository entry of a metadata batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoResult {
    pub state: RepoResultState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<RepoInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl RepoResult {
    pub fn ok(info: RepoInfo) -> Self {
        Self {
            state: RepoResultState::Ok,
            ok: Some(info),
            err: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            state: RepoResultState::Err,
            ok: None,
            err: Some(message.into()),
        }
    }

    /// Collapse the tagged entry into a `Result`
    ///
    /// An entry that claims success without a payload, or failure without a
    /// message, is reported as an "unknown" error.
    pub fn into_outcome(self) -> Result<RepoInfo, SyncError> {
        match (self.state, self.ok, self.err) {
            (RepoResultState::Ok, Some(info), _) => Ok(info),
            (RepoResultState::Err, _, Some(message)) => Err(SyncError::RepoFetch(message)),
            _ => Err(SyncError::RepoFetch("unknown".to_string())),
        }
    }
}

/// A privately scoped repository tracked in the session cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRecord {
    pub id: RepoId,
    pub name: String,
    /// Owning team; `None` for personal repositories
    pub team_owner: Option<String>,
    /// Clone URL
    pub url: String,
    pub last_editor: String,
    pub last_edit_device: String,
    /// Relative rendering of the last write, fixed at load time
    pub last_edit_time: String,
    pub can_delete: bool,
}

impl RepoRecord {
    /// Build a record from service metadata, rendering times relative to `now`
    pub fn from_info(info: RepoInfo, now: DateTime<Utc>) -> Self {
        let team_owner = match info.folder.folder_type {
            FolderType::Team => Some(info.folder.name),
            _ => None,
        };

        Self {
            id: info.global_unique_id,
            name: info.local_metadata.repo_name,
            team_owner,
            url: info.repo_url,
            last_editor: info.server_metadata.last_modifying_username,
            last_edit_device: info.server_metadata.last_modifying_device_name,
            last_edit_time: reltime::from_now(info.server_metadata.mtime, now),
            can_delete: info.can_delete,
        }
    }

    /// Display name including the owning team ("acme/proj")
    pub fn qualified_name(&self) -> String {
        match &self.team_owner {
            Some(team) => format!("{}/{}", team, self.name),
            None => self.name.clone(),
        }
    }
}
