//! End-to-end controller flows against an in-memory service

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reposync_core::models::{Folder, FolderType, LocalMetadata, ServerMetadata};
use reposync_core::sync::InboundMessage;
use reposync_core::{
    ControllerHandle, Effect, Layout, RepoCommand, RepoId, RepoInfo, RepoResult, RepoService,
    SyncController, SyncError, SyncResult, SyncState, TeamName,
};

struct MemoryService {
    repos: Mutex<Vec<RepoResult>>,
    fail_create: bool,
    metadata_calls: Mutex<usize>,
}

impl MemoryService {
    fn new(repos: Vec<RepoResult>) -> Self {
        Self {
            repos: Mutex::new(repos),
            fail_create: false,
            metadata_calls: Mutex::new(0),
        }
    }

    fn metadata_calls(&self) -> usize {
        *self.metadata_calls.lock().unwrap()
    }
}

fn info(id: &str, name: &str, folder_type: FolderType, private: bool) -> RepoInfo {
    let owner = if folder_type == FolderType::Team {
        "acme"
    } else {
        "alice"
    };
    RepoInfo {
        global_unique_id: RepoId::new(id),
        repo_url: format!("ssh://repos.example.com/{}/{}", owner, name),
        folder: Folder {
            name: owner.to_string(),
            private,
            folder_type,
        },
        local_metadata: LocalMetadata {
            repo_name: name.to_string(),
        },
        server_metadata: ServerMetadata {
            mtime: Utc::now(),
            last_modifying_username: "alice".to_string(),
            last_modifying_device_name: "laptop".to_string(),
        },
        can_delete: true,
    }
}

#[async_trait]
impl RepoService for MemoryService {
    async fn get_all_metadata(&self) -> SyncResult<Vec<RepoResult>> {
        *self.metadata_calls.lock().unwrap() += 1;
        Ok(self.repos.lock().unwrap().clone())
    }

    async fn create_personal(&self, repo_name: &str) -> SyncResult<()> {
        if self.fail_create {
            return Err(SyncError::Transport("connection reset by peer".into()));
        }
        let id = format!("personal-{}", repo_name);
        self.repos
            .lock()
            .unwrap()
            .push(RepoResult::ok(info(&id, repo_name, FolderType::Private, true)));
        Ok(())
    }

    async fn create_team(&self, repo_name: &str, team: &TeamName, _notify: bool) -> SyncResult<()> {
        let id = format!("team-{}-{}", team, repo_name);
        self.repos
            .lock()
            .unwrap()
            .push(RepoResult::ok(info(&id, repo_name, FolderType::Team, true)));
        Ok(())
    }

    async fn delete_personal(&self, repo_name: &str) -> SyncResult<()> {
        self.repos.lock().unwrap().retain(|r| {
            r.ok
                .as_ref()
                .map_or(true, |i| i.local_metadata.repo_name != repo_name)
        });
        Ok(())
    }

    async fn delete_team(&self, repo_name: &str, _team: &TeamName, _notify: bool) -> SyncResult<()> {
        self.delete_personal(repo_name).await
    }

    async fn dismiss_category(&self, _category: &str) -> SyncResult<()> {
        Ok(())
    }
}

async fn settle(handle: &ControllerHandle, done: impl Fn(&SyncState) -> bool) -> SyncState {
    let mut rx = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if done(&*state) {
                    return state.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("controller did not settle")
}

#[tokio::test]
async fn loads_only_private_repos_with_team_owner() {
    let service = Arc::new(MemoryService::new(vec![
        RepoResult::ok(info("pub-1", "site", FolderType::Public, false)),
        RepoResult::ok(info("team-1", "proj", FolderType::Team, true)),
    ]));
    let (handle, _effects) = SyncController::spawn(service, Layout::Regular);

    handle.request_load();
    let state = settle(&handle, |s| !s.records.is_empty() && !s.loading).await;

    assert_eq!(state.records.len(), 1);
    let record = &state.records[&RepoId::new("team-1")];
    assert_eq!(record.name, "proj");
    assert_eq!(record.team_owner.as_deref(), Some("acme"));
    assert_eq!(record.last_edit_time, "a few seconds ago");

    handle.shutdown().await;
}

#[tokio::test]
async fn create_then_delete_round_trip() {
    let service = Arc::new(MemoryService::new(vec![]));
    let (handle, mut effects) = SyncController::spawn(service.clone(), Layout::Compact);

    handle.run_command(RepoCommand::create_team("proj", "acme.eng", true).unwrap());
    let state = settle(&handle, |s| s.records.len() == 1 && !s.loading).await;
    assert_eq!(
        state.sorted_records()[0].team_owner.as_deref(),
        Some("acme")
    );
    assert!(matches!(effects.recv().await, Some(Effect::Navigate(route)) if route.len() == 2));

    handle.run_command(RepoCommand::delete_team("proj", "acme.eng", false).unwrap());
    settle(&handle, |s| s.records.is_empty() && !s.loading).await;

    handle.shutdown().await;
    assert_eq!(service.metadata_calls(), 2);
}

#[tokio::test]
async fn failed_create_stores_error_without_reload() {
    let mut service = MemoryService::new(vec![]);
    service.fail_create = true;
    let service = Arc::new(service);
    let (handle, _effects) = SyncController::spawn(service.clone(), Layout::Regular);

    handle.run_command(RepoCommand::create_personal("foo").unwrap());
    let state = settle(&handle, |s| s.error.is_some() && !s.loading).await;
    assert_eq!(
        state.error,
        Some(SyncError::Transport("connection reset by peer".into()))
    );

    handle.shutdown().await;
    assert_eq!(service.metadata_calls(), 0);
}

#[tokio::test]
async fn pushed_update_reloads_cache() {
    let service = Arc::new(MemoryService::new(vec![RepoResult::ok(info(
        "p-1",
        "dotfiles",
        FolderType::Private,
        true,
    ))]));
    let (handle, _effects) = SyncController::spawn(service.clone(), Layout::Regular);

    handle.notifications(vec![
        InboundMessage::new(r#"{"action": "noop"}"#),
        InboundMessage::new(r#"{"action": "update", "repo": "dotfiles"}"#),
        InboundMessage::new(r#"{"action": "delete"}"#),
    ]);
    let state = settle(&handle, |s| !s.records.is_empty() && !s.loading).await;
    assert!(state.records.contains_key(&RepoId::new("p-1")));

    handle.shutdown().await;
    assert_eq!(service.metadata_calls(), 1);
}
