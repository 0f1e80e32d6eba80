//! Single-flight repository loader
//!
//! Fetches the full metadata set, keeps only private repositories, and
//! replaces the session cache in one write. Loads are latest-wins: every load
//! carries a `LoadToken`, and starting a newer load supersedes all older ones.
//! A superseded load stops waiting at the remote call and never writes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Effect, EffectSender};
use crate::error::SyncError;
use crate::models::{RepoId, RepoRecord, RepoResult};
use crate::remote::RepoService;
use crate::state::{SessionStore, StateMutation};

/// Source of load generations; `begin` supersedes every earlier token
#[derive(Debug, Clone)]
pub struct LoadGenerations {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for LoadGenerations {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadGenerations {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Start a new generation and hand out its token
    pub fn begin(&self) -> LoadToken {
        let mut generation = 0;
        self.tx.send_modify(|current| {
            *current += 1;
            generation = *current;
        });
        LoadToken {
            generation,
            latest: self.tx.subscribe(),
        }
    }
}

/// Cancellation token for one load
#[derive(Debug, Clone)]
pub struct LoadToken {
    generation: u64,
    latest: watch::Receiver<u64>,
}

impl LoadToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True until a newer load has begun
    pub fn is_current(&self) -> bool {
        *self.latest.borrow() == self.generation
    }

    /// Resolves once a newer load has begun
    ///
    /// Never resolves if the generation source is gone, since nothing can
    /// supersede this load any more.
    pub async fn superseded(&mut self) {
        loop {
            if !self.is_current() {
                return;
            }
            if self.latest.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Per-item error policy: only the last failure of a batch is kept
#[derive(Debug, Default)]
pub struct LastErrorWins(Option<SyncError>);

impl LastErrorWins {
    pub fn record(&mut self, error: SyncError) {
        self.0 = Some(error);
    }

    pub fn into_inner(self) -> Option<SyncError> {
        self.0
    }
}

/// Summary of an applied load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Private repositories now in the cache
    pub tracked: usize,
    /// Public repositories that were discarded
    pub skipped_public: usize,
    /// Entries that failed on the server side
    pub failed: usize,
    /// Last per-item error of the batch
    pub advisory: Option<SyncError>,
}

/// How a load ended
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Applied(LoadReport),
    /// A newer load started first; nothing was written
    Superseded,
    /// The metadata call itself failed
    Failed(SyncError),
}

/// Clears `loading` however the load exits, including panics and task abort
///
/// A superseded load leaves the flag alone: the newer load owns it and
/// clears it on its own exit.
struct LoadingGuard {
    store: SessionStore,
    token: LoadToken,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let token = &self.token;
        self.store
            .apply_if(|| token.is_current(), StateMutation::SetLoading(false));
    }
}

/// The only writer of the record cache
#[derive(Clone)]
pub struct Loader {
    service: Arc<dyn RepoService>,
    store: SessionStore,
    effects: EffectSender,
}

impl Loader {
    pub fn new(service: Arc<dyn RepoService>, store: SessionStore, effects: EffectSender) -> Self {
        Self {
            service,
            store,
            effects,
        }
    }

    /// Reload every repository, replacing the cache on success
    pub async fn load_all(&self, mut token: LoadToken) -> LoadOutcome {
        debug!("load {} starting", token.generation());
        // a token can be stale before its task is first polled
        if !self
            .store
            .apply_if(|| token.is_current(), StateMutation::SetError(None))
        {
            debug!("load {} superseded before it started", token.generation());
            return LoadOutcome::Superseded;
        }
        if !self
            .store
            .apply_if(|| token.is_current(), StateMutation::SetLoading(true))
        {
            debug!("load {} superseded before it started", token.generation());
            return LoadOutcome::Superseded;
        }
        let _guard = LoadingGuard {
            store: self.store.clone(),
            token: token.clone(),
        };

        let fetched = tokio::select! {
            biased;
            _ = token.superseded() => {
                debug!("load {} superseded while fetching", token.generation());
                return LoadOutcome::Superseded;
            }
            fetched = self.service.get_all_metadata() => fetched,
        };

        let results = match fetched {
            Ok(results) => results,
            Err(e) => {
                warn!("Repository metadata fetch failed: {}", e);
                self.store.apply_if(
                    || token.is_current(),
                    StateMutation::SetError(Some(e.clone())),
                );
                return LoadOutcome::Failed(e);
            }
        };

        let (records, report) = build_records(results, Utc::now());
        let tracked = records.len();

        if !self
            .store
            .apply_if(|| token.is_current(), StateMutation::ReplaceRecords(records))
        {
            debug!("load {} superseded before commit", token.generation());
            return LoadOutcome::Superseded;
        }

        if let Some(advisory) = &report.advisory {
            warn!("{} repo(s) failed to load, last error: {}", report.failed, advisory);
            let _ = self.effects.send(Effect::Advisory(advisory.clone()));
        }

        info!(
            "Loaded {} repo(s) ({} public skipped, {} failed)",
            tracked, report.skipped_public, report.failed
        );
        LoadOutcome::Applied(report)
    }
}

/// Transform a metadata batch into the cache map
///
/// Public repositories are dropped, failed entries are left out and recorded
/// with `LastErrorWins`.
pub(crate) fn build_records(
    results: Vec<RepoResult>,
    now: DateTime<Utc>,
) -> (HashMap<RepoId, RepoRecord>, LoadReport) {
    let mut records = HashMap::new();
    let mut errors = LastErrorWins::default();
    let mut report = LoadReport::default();

    for result in results {
        match result.into_outcome() {
            Ok(info) if !info.folder.private => {
                report.skipped_public += 1;
            }
            Ok(info) => {
                let record = RepoRecord::from_info(info, now);
                records.insert(record.id.clone(), record);
            }
            Err(e) => {
                report.failed += 1;
                errors.record(e);
            }
        }
    }

    report.tracked = records.len();
    report.advisory = errors.into_inner();
    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::repo_info;
    use crate::models::FolderType;
    use crate::sync::fake::FakeRepoService;
    use tokio::sync::mpsc;

    fn loader(service: Arc<FakeRepoService>) -> (Loader, SessionStore, mpsc::UnboundedReceiver<Effect>) {
        let store = SessionStore::new();
        let (tx, rx) = mpsc::unbounded_channel();
        (Loader::new(service, store.clone(), tx), store, rx)
    }

    #[test]
    fn test_public_repos_are_dropped() {
        let results = vec![
            RepoResult::ok(repo_info("pub", "website", FolderType::Public, false)),
            // public visibility wins even inside a team folder
            RepoResult::ok(repo_info("team-pub", "docs", FolderType::Team, false)),
            RepoResult::ok(repo_info("priv", "dotfiles", FolderType::Private, true)),
        ];

        let (records, report) = build_records(results, Utc::now());
        assert_eq!(records.len(), 1);
        assert!(records.contains_key(&RepoId::new("priv")));
        assert_eq!(report.skipped_public, 2);
    }

    #[test]
    fn test_last_error_wins() {
        let results = vec![
            RepoResult::err("first"),
            RepoResult::ok(repo_info("a", "alpha", FolderType::Private, true)),
            RepoResult::err("second"),
        ];

        let (records, report) = build_records(results, Utc::now());
        assert_eq!(records.len(), 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.advisory, Some(SyncError::RepoFetch("second".into())));
    }

    #[tokio::test]
    async fn test_load_team_repo_scenario() {
        let service = Arc::new(FakeRepoService::new().with_metadata(vec![
            RepoResult::ok(repo_info("public-1", "site", FolderType::Public, false)),
            RepoResult::ok(repo_info("team-1", "proj", FolderType::Team, true)),
        ]));
        let (loader, store, _effects) = loader(service);

        let outcome = loader.load_all(LoadGenerations::new().begin()).await;
        assert!(matches!(outcome, LoadOutcome::Applied(_)));

        let state = store.snapshot();
        assert_eq!(state.records.len(), 1);
        let record = &state.records[&RepoId::new("team-1")];
        assert_eq!(record.name, "proj");
        assert_eq!(record.team_owner.as_deref(), Some("acme"));
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_item_errors_become_advisory() {
        let service = Arc::new(FakeRepoService::new().with_metadata(vec![
            RepoResult::err("corrupt"),
            RepoResult::ok(repo_info("a", "alpha", FolderType::Private, true)),
        ]));
        let (loader, store, mut effects) = loader(service);

        loader.load_all(LoadGenerations::new().begin()).await;

        assert_eq!(store.snapshot().records.len(), 1);
        assert!(store.snapshot().error.is_none());
        assert_eq!(
            effects.try_recv().unwrap(),
            Effect::Advisory(SyncError::RepoFetch("corrupt".into()))
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_sets_error_and_clears_loading() {
        let service = Arc::new(FakeRepoService::new());
        service.script_metadata(Err(SyncError::Transport("connection refused".into())));
        let (loader, store, _effects) = loader(service);

        let outcome = loader.load_all(LoadGenerations::new().begin()).await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)));

        let state = store.snapshot();
        assert!(!state.loading);
        assert_eq!(
            state.error,
            Some(SyncError::Transport("connection refused".into()))
        );
    }

    #[tokio::test]
    async fn test_error_cleared_when_load_starts() {
        let service = Arc::new(FakeRepoService::new());
        let gate = service.gate_metadata();
        let (loader, store, _effects) = loader(service);
        store.set_error(Some(SyncError::EmptyRepoName));

        let task = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_all(LoadGenerations::new().begin()).await }
        });
        tokio::task::yield_now().await;
        let mid = store.snapshot();
        assert!(mid.error.is_none());
        assert!(mid.loading);

        gate.send(Ok(vec![])).unwrap();
        task.await.unwrap();
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_latest_wins() {
        let service = Arc::new(FakeRepoService::new());
        let gate_a = service.gate_metadata();
        let gate_b = service.gate_metadata();
        let (loader, store, _effects) = loader(service);
        let generations = LoadGenerations::new();

        let token_a = generations.begin();
        let load_a = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_all(token_a).await }
        });
        tokio::task::yield_now().await;

        let token_b = generations.begin();
        let load_b = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_all(token_b).await }
        });
        tokio::task::yield_now().await;

        // B answers first, A answers late with different data
        gate_b
            .send(Ok(vec![RepoResult::ok(repo_info(
                "b",
                "from-b",
                FolderType::Private,
                true,
            ))]))
            .unwrap();
        assert!(matches!(load_b.await.unwrap(), LoadOutcome::Applied(_)));

        let _ = gate_a.send(Ok(vec![RepoResult::ok(repo_info(
            "a",
            "from-a",
            FolderType::Private,
            true,
        ))]));
        assert_eq!(load_a.await.unwrap(), LoadOutcome::Superseded);

        let state = store.snapshot();
        assert_eq!(state.records.len(), 1);
        assert!(state.records.contains_key(&RepoId::new("b")));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_superseded_load_leaves_loading_to_newer_load() {
        let service = Arc::new(FakeRepoService::new());
        let _gate_a = service.gate_metadata();
        let gate_b = service.gate_metadata();
        let (loader, store, _effects) = loader(service);
        let generations = LoadGenerations::new();

        let token_a = generations.begin();
        let load_a = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_all(token_a).await }
        });
        tokio::task::yield_now().await;

        let token_b = generations.begin();
        let load_b = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_all(token_b).await }
        });

        assert_eq!(load_a.await.unwrap(), LoadOutcome::Superseded);
        assert!(store.is_loading());

        gate_b.send(Ok(vec![])).unwrap();
        load_b.await.unwrap();
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_stale_token_writes_nothing() {
        let service = Arc::new(FakeRepoService::new());
        let (loader, store, _effects) = loader(service.clone());
        let generations = LoadGenerations::new();

        let stale = generations.begin();
        let _newer = generations.begin();
        store.set_error(Some(SyncError::Transport("refused".into())));

        assert_eq!(loader.load_all(stale).await, LoadOutcome::Superseded);

        let state = store.snapshot();
        assert!(!state.loading);
        assert_eq!(state.error, Some(SyncError::Transport("refused".into())));
        assert_eq!(service.metadata_calls(), 0);
    }

    #[tokio::test]
    async fn test_aborted_load_clears_loading() {
        let service = Arc::new(FakeRepoService::new());
        let _gate = service.gate_metadata();
        let (loader, store, _effects) = loader(service);

        let task = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_all(LoadGenerations::new().begin()).await }
        });
        tokio::task::yield_now().await;
        assert!(store.is_loading());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!store.is_loading());
    }
}
