//! Create/delete command orchestration
//!
//! Every mutation runs inside the same bracket:
//! clear error, set loading, call the service, then either navigate back to
//! the listing and request a reload, or store the error. Loading is cleared
//! on both paths and once more on the way out, whatever happened.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use super::reload::{ReloadReason, ReloadRequester};
use super::{Effect, EffectSender};
use crate::error::{SyncError, SyncResult};
use crate::models::TeamName;
use crate::nav::Layout;
use crate::remote::RepoService;
use crate::state::SessionStore;

/// A mutating repository operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCommand {
    CreatePersonal {
        name: String,
    },
    CreateTeam {
        name: String,
        team: TeamName,
        notify_team: bool,
    },
    DeletePersonal {
        name: String,
    },
    DeleteTeam {
        name: String,
        team: TeamName,
        notify_team: bool,
    },
}

impl RepoCommand {
    pub fn create_personal(name: &str) -> SyncResult<Self> {
        Ok(RepoCommand::CreatePersonal {
            name: validate_name(name)?,
        })
    }

    /// `team` is a dotted path such as "acme.eng"
    pub fn create_team(name: &str, team: &str, notify_team: bool) -> SyncResult<Self> {
        Ok(RepoCommand::CreateTeam {
            name: validate_name(name)?,
            team: TeamName::parse(team)?,
            notify_team,
        })
    }

    pub fn delete_personal(name: &str) -> SyncResult<Self> {
        Ok(RepoCommand::DeletePersonal {
            name: validate_name(name)?,
        })
    }

    pub fn delete_team(name: &str, team: &str, notify_team: bool) -> SyncResult<Self> {
        Ok(RepoCommand::DeleteTeam {
            name: validate_name(name)?,
            team: TeamName::parse(team)?,
            notify_team,
        })
    }

    /// Short label used in logs and reload reasons
    pub fn verb(&self) -> &'static str {
        match self {
            RepoCommand::CreatePersonal { .. } => "create personal repo",
            RepoCommand::CreateTeam { .. } => "create team repo",
            RepoCommand::DeletePersonal { .. } => "delete personal repo",
            RepoCommand::DeleteTeam { .. } => "delete team repo",
        }
    }

    pub fn repo_name(&self) -> &str {
        match self {
            RepoCommand::CreatePersonal { name }
            | RepoCommand::CreateTeam { name, .. }
            | RepoCommand::DeletePersonal { name }
            | RepoCommand::DeleteTeam { name, .. } => name,
        }
    }
}

fn validate_name(name: &str) -> SyncResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SyncError::EmptyRepoName);
    }
    Ok(name.to_string())
}

/// Clears `loading` when the command scope ends
struct LoadingCleanup<'a> {
    store: &'a SessionStore,
}

impl Drop for LoadingCleanup<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}

/// Runs repository commands against the service
#[derive(Clone)]
pub struct CommandOrchestrator {
    service: Arc<dyn RepoService>,
    store: SessionStore,
    effects: EffectSender,
    reload: ReloadRequester,
    layout: Layout,
}

impl CommandOrchestrator {
    pub fn new(
        service: Arc<dyn RepoService>,
        store: SessionStore,
        effects: EffectSender,
        reload: ReloadRequester,
        layout: Layout,
    ) -> Self {
        Self {
            service,
            store,
            effects,
            reload,
            layout,
        }
    }

    /// Run one command inside the standard bracket
    pub async fn run(&self, command: RepoCommand) -> SyncResult<()> {
        let verb = command.verb();
        info!("{}: {}", verb, command.repo_name());
        self.bracket(verb, self.invoke(&command)).await
    }

    async fn invoke(&self, command: &RepoCommand) -> SyncResult<()> {
        match command {
            RepoCommand::CreatePersonal { name } => self.service.create_personal(name).await,
            RepoCommand::CreateTeam {
                name,
                team,
                notify_team,
            } => self.service.create_team(name, team, *notify_team).await,
            RepoCommand::DeletePersonal { name } => self.service.delete_personal(name).await,
            RepoCommand::DeleteTeam {
                name,
                team,
                notify_team,
            } => self.service.delete_team(name, team, *notify_team).await,
        }
    }

    /// Reset/loading/error bracket around an arbitrary mutation
    ///
    /// The prelude writes happen before `call` is first polled, so they land
    /// even if the caller stops awaiting afterwards.
    pub async fn bracket<F>(&self, verb: &'static str, call: F) -> SyncResult<()>
    where
        F: Future<Output = SyncResult<()>>,
    {
        self.store.set_error(None);
        self.store.set_loading(true);
        let _cleanup = LoadingCleanup { store: &self.store };

        match call.await {
            Ok(()) => {
                let _ = self
                    .effects
                    .send(Effect::Navigate(self.layout.repo_listing_route()));
                self.store.set_loading(false);
                self.reload.request(ReloadReason::CommandSucceeded(verb));
                info!("{} succeeded", verb);
                Ok(())
            }
            Err(e) => {
                warn!("{} failed: {}", verb, e);
                self.store.set_error(Some(e.clone()));
                self.store.set_loading(false);
                Err(e)
            }
        }
    }
}
