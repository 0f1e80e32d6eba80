//! One-shot repository commands (list, create, delete)

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::debug;

use reposync_core::state::SessionStore;
use reposync_core::sync::{
    reload_channel, CommandOrchestrator, LoadGenerations, LoadOutcome, Loader, ReloadReason,
};
use reposync_core::{Config, Effect, RepoCommand};

use crate::output::Output;

/// A short-lived session: one store, driven inline instead of by a controller
struct Session {
    store: SessionStore,
    loader: Loader,
    orchestrator: CommandOrchestrator,
    generations: LoadGenerations,
    effects: mpsc::UnboundedReceiver<Effect>,
    reloads: mpsc::UnboundedReceiver<ReloadReason>,
}

impl Session {
    fn open(config: &Config) -> Result<Self> {
        let service = super::connect(config)?;
        let store = SessionStore::new();
        let (effect_tx, effects) = mpsc::unbounded_channel();
        let (reload, reloads) = reload_channel();

        Ok(Self {
            loader: Loader::new(service.clone(), store.clone(), effect_tx.clone()),
            orchestrator: CommandOrchestrator::new(
                service,
                store.clone(),
                effect_tx,
                reload,
                config.layout,
            ),
            store,
            generations: LoadGenerations::new(),
            effects,
            reloads,
        })
    }

    async fn load(&mut self, output: &Output) -> Result<()> {
        let outcome = self.loader.load_all(self.generations.begin()).await;
        self.drain_effects(output);

        match outcome {
            LoadOutcome::Applied(report) => {
                debug!("load applied: {:?}", report);
                Ok(())
            }
            LoadOutcome::Failed(e) => {
                output.error(&e);
                bail!("Could not load repositories");
            }
            LoadOutcome::Superseded => bail!("Load was superseded"),
        }
    }

    async fn run(&mut self, command: RepoCommand, output: &Output) -> Result<()> {
        let verb = command.verb();
        let name = command.repo_name().to_string();

        if let Err(e) = self.orchestrator.run(command).await {
            output.error(&e);
            bail!("Could not {} '{}'", verb, name);
        }
        output.success(&format!("{} '{}'", capitalize(verb), name));
        self.drain_effects(output);

        if let Ok(reason) = self.reloads.try_recv() {
            debug!("reloading: {}", reason);
            self.load(output).await?;
            let tracked = self.store.snapshot().records.len();
            output.message(&format!("{} repo(s) tracked", tracked));
        }
        Ok(())
    }

    fn drain_effects(&mut self, output: &Output) {
        while let Ok(effect) = self.effects.try_recv() {
            match effect {
                // no views to switch in a one-shot command
                Effect::Navigate(route) => debug!("navigate to {:?}", route),
                Effect::Advisory(e) => output.advisory(&e),
            }
        }
    }
}

/// List tracked repositories
pub async fn list(config: &Config, output: &Output) -> Result<()> {
    let mut session = Session::open(config)?;
    session.load(output).await?;
    output.print_records(&session.store.snapshot());
    Ok(())
}

/// Create a personal or team repository
pub async fn create(
    config: &Config,
    name: String,
    team: Option<String>,
    notify: bool,
    output: &Output,
) -> Result<()> {
    let command = match team {
        Some(team) => RepoCommand::create_team(&name, &team, notify)?,
        None => RepoCommand::create_personal(&name)?,
    };
    Session::open(config)?.run(command, output).await
}

/// Delete a personal or team repository
pub async fn delete(
    config: &Config,
    name: String,
    team: Option<String>,
    notify: bool,
    output: &Output,
) -> Result<()> {
    let command = match team {
        Some(team) => RepoCommand::delete_team(&name, &team, notify)?,
        None => RepoCommand::delete_personal(&name)?,
    };
    Session::open(config)?.run(command, output).await
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
