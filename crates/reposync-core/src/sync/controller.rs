//! Sync controller event loop
//!
//! One controller runs per session. Inputs arrive as `ControllerEvent`s;
//! loads and commands run as tasks so the loop never blocks on the service.
//! Loads are latest-wins, commands all run (no single-flight).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::badge::{BadgeTracker, DismissCategory};
use super::commands::{CommandOrchestrator, RepoCommand};
use super::loader::{LoadGenerations, Loader};
use super::notify::{InboundMessage, NotificationListener};
use super::reload::{reload_channel, ReloadReason};
use super::Effect;
use crate::models::RepoId;
use crate::nav::Layout;
use crate::remote::RepoService;
use crate::state::{SessionStore, StateMutation, SyncState};

/// Inputs to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Reload the repository list
    Load,
    /// Run a create/delete command
    Command(RepoCommand),
    /// A batch of pushed notifications
    Notifications(Vec<InboundMessage>),
    /// The visible route changed
    Navigated(Vec<String>),
    /// Repositories flagged as new by the badge service
    BadgeRepos(Vec<RepoId>),
    /// Stop the controller
    Shutdown,
}

/// Per-session state that lives outside `SyncState`
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub badge: BadgeTracker,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            badge: BadgeTracker::for_repos_tab(),
        }
    }

    pub fn on_navigate(&mut self, route: &[String]) -> Option<DismissCategory> {
        self.badge.on_navigate(route)
    }
}

/// Cloneable sender for controller events
#[derive(Debug, Clone)]
pub struct ControllerSender {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl ControllerSender {
    /// Send an event; returns false once the controller has stopped
    pub fn send(&self, event: ControllerEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn request_load(&self) -> bool {
        self.send(ControllerEvent::Load)
    }

    pub fn run_command(&self, command: RepoCommand) -> bool {
        self.send(ControllerEvent::Command(command))
    }

    pub fn notifications(&self, batch: Vec<InboundMessage>) -> bool {
        self.send(ControllerEvent::Notifications(batch))
    }

    pub fn navigated(&self, route: Vec<String>) -> bool {
        self.send(ControllerEvent::Navigated(route))
    }

    pub fn badge_repos(&self, ids: Vec<RepoId>) -> bool {
        self.send(ControllerEvent::BadgeRepos(ids))
    }
}

/// Handle to a running controller
pub struct ControllerHandle {
    sender: ControllerSender,
    store: SessionStore,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    pub fn sender(&self) -> ControllerSender {
        self.sender.clone()
    }

    pub fn request_load(&self) -> bool {
        self.sender.request_load()
    }

    pub fn run_command(&self, command: RepoCommand) -> bool {
        self.sender.run_command(command)
    }

    pub fn notifications(&self, batch: Vec<InboundMessage>) -> bool {
        self.sender.notifications(batch)
    }

    pub fn navigated(&self, route: Vec<String>) -> bool {
        self.sender.navigated(route)
    }

    pub fn badge_repos(&self, ids: Vec<RepoId>) -> bool {
        self.sender.badge_repos(ids)
    }

    /// Current session state
    pub fn snapshot(&self) -> SyncState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.store.subscribe()
    }

    /// Stop the controller and wait for in-flight commands to finish
    pub async fn shutdown(self) {
        self.sender.send(ControllerEvent::Shutdown);
        if let Err(e) = self.task.await {
            error!("sync controller task failed: {}", e);
        }
    }
}

/// Owns the session store and drives all sync components
pub struct SyncController {
    service: Arc<dyn RepoService>,
    store: SessionStore,
    loader: Loader,
    orchestrator: CommandOrchestrator,
    listener: NotificationListener,
    generations: LoadGenerations,
    context: SessionContext,
    events: mpsc::UnboundedReceiver<ControllerEvent>,
    reloads: mpsc::UnboundedReceiver<ReloadReason>,
    tasks: JoinSet<()>,
}

impl SyncController {
    /// Start a controller for a new session
    ///
    /// Returns the handle and the receiving end of the effect channel
    /// (navigation requests and advisories).
    pub fn spawn(
        service: Arc<dyn RepoService>,
        layout: Layout,
    ) -> (ControllerHandle, mpsc::UnboundedReceiver<Effect>) {
        let store = SessionStore::new();
        let (effect_tx, effect_rx) = mpsc::unbounded_channel();
        let (reload, reloads) = reload_channel();
        let (event_tx, events) = mpsc::unbounded_channel();

        let controller = Self {
            loader: Loader::new(service.clone(), store.clone(), effect_tx.clone()),
            orchestrator: CommandOrchestrator::new(
                service.clone(),
                store.clone(),
                effect_tx,
                reload.clone(),
                layout,
            ),
            listener: NotificationListener::new(reload),
            service,
            store: store.clone(),
            generations: LoadGenerations::new(),
            context: SessionContext::new(),
            events,
            reloads,
            tasks: JoinSet::new(),
        };

        let task = tokio::spawn(controller.run());
        let handle = ControllerHandle {
            sender: ControllerSender { tx: event_tx },
            store,
            task,
        };
        (handle, effect_rx)
    }

    async fn run(mut self) {
        info!("Sync controller started");

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(ControllerEvent::Shutdown) | None => break,
                    Some(event) => self.handle_event(event),
                },
                Some(reason) = self.reloads.recv() => self.start_load(reason),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("sync task failed: {}", e);
                    }
                }
            }
        }

        self.stop().await;
        info!("Sync controller stopped");
    }

    fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Load => self.start_load(ReloadReason::Requested),
            ControllerEvent::Command(command) => {
                let orchestrator = self.orchestrator.clone();
                self.tasks.spawn(async move {
                    // errors are already stored in the session state
                    let _ = orchestrator.run(command).await;
                });
            }
            ControllerEvent::Notifications(batch) => {
                debug!("notification batch of {}", batch.len());
                self.listener.handle_batch(&batch);
            }
            ControllerEvent::Navigated(route) => self.on_navigate(&route),
            ControllerEvent::BadgeRepos(ids) => {
                let ids: HashSet<RepoId> = ids.into_iter().collect();
                self.store.apply(StateMutation::ReplaceNewIds(ids));
            }
            ControllerEvent::Shutdown => {}
        }
    }

    fn start_load(&mut self, reason: ReloadReason) {
        let token = self.generations.begin();
        info!("Loading repos (load {}, {})", token.generation(), reason);

        let loader = self.loader.clone();
        self.tasks.spawn(async move {
            loader.load_all(token).await;
        });
    }

    fn on_navigate(&mut self, route: &[String]) {
        let Some(DismissCategory(category)) = self.context.on_navigate(route) else {
            return;
        };

        debug!("dismissing badge category {}", category);
        let service = self.service.clone();
        self.tasks.spawn(async move {
            if let Err(e) = service.dismiss_category(&category).await {
                warn!("Failed to dismiss '{}' notifications: {}", category, e);
            }
        });
    }

    /// Drop interest in running loads, let commands finish
    async fn stop(&mut self) {
        let _ = self.generations.begin();
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!("sync task failed during shutdown: {}", e);
            }
        }
        // the superseding generation above never runs, so nobody else clears it
        self.store.set_loading(false);
    }
}
