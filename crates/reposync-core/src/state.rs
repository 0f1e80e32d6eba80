//! Session state
//!
//! One `SyncState` exists per signed-in session. It is held in a
//! `tokio::sync::watch` channel so the render layer can subscribe to
//! snapshots, and every write goes through a `StateMutation` addressed by a
//! stable `StatePath`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::SyncError;
use crate::models::{RepoId, RepoRecord};

/// Repository cache and status flags for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    /// Tracked repositories; replaced wholesale by the loader
    pub records: HashMap<RepoId, RepoRecord>,
    /// True while a load or a mutating command is in flight
    pub loading: bool,
    /// Last operation error, cleared at the start of every attempt
    pub error: Option<SyncError>,
    /// Repositories flagged as new since the last acknowledgment
    pub new_ids: HashSet<RepoId>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a single mutation
    pub fn apply(&mut self, mutation: StateMutation) {
        match mutation {
            StateMutation::ReplaceRecords(records) => self.records = records,
            StateMutation::SetLoading(loading) => self.loading = loading,
            StateMutation::SetError(error) => self.error = error,
            StateMutation::ReplaceNewIds(ids) => self.new_ids = ids,
        }
    }

    /// Records ordered for display: personal first, then by team, then name
    pub fn sorted_records(&self) -> Vec<&RepoRecord> {
        let mut records: Vec<&RepoRecord> = self.records.values().collect();
        records.sort_by(|a, b| {
            a.team_owner
                .cmp(&b.team_owner)
                .then_with(|| a.name.cmp(&b.name))
        });
        records
    }

    pub fn is_new(&self, id: &RepoId) -> bool {
        self.new_ids.contains(id)
    }
}

/// Address of a field in the session state tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatePath {
    Records,
    Loading,
    Error,
    NewIds,
}

impl StatePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatePath::Records => "repos.records",
            StatePath::Loading => "repos.loading",
            StatePath::Error => "repos.error",
            StatePath::NewIds => "repos.new_ids",
        }
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete write surface of the session state
#[derive(Debug, Clone, PartialEq)]
pub enum StateMutation {
    ReplaceRecords(HashMap<RepoId, RepoRecord>),
    SetLoading(bool),
    SetError(Option<SyncError>),
    ReplaceNewIds(HashSet<RepoId>),
}

impl StateMutation {
    pub fn path(&self) -> StatePath {
        match self {
            StateMutation::ReplaceRecords(_) => StatePath::Records,
            StateMutation::SetLoading(_) => StatePath::Loading,
            StateMutation::SetError(_) => StatePath::Error,
            StateMutation::ReplaceNewIds(_) => StatePath::NewIds,
        }
    }
}

/// Shared handle to the session state
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SyncState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create an empty session
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncState::new());
        Self { tx: Arc::new(tx) }
    }

    /// Apply a mutation and notify subscribers
    pub fn apply(&self, mutation: StateMutation) {
        debug!("state write: {}", mutation.path());
        self.tx.send_modify(|state| state.apply(mutation));
    }

    /// Apply a mutation only if `guard` still holds at write time
    ///
    /// The guard runs while the state is locked, so nothing can slip in
    /// between the check and the write. Returns whether the write happened.
    pub fn apply_if(&self, guard: impl FnOnce() -> bool, mutation: StateMutation) -> bool {
        let path = mutation.path();
        let applied = self.tx.send_if_modified(|state| {
            if !guard() {
                return false;
            }
            state.apply(mutation);
            true
        });
        if applied {
            debug!("state write: {}", path);
        } else {
            debug!("state write skipped: {}", path);
        }
        applied
    }

    pub fn set_loading(&self, loading: bool) {
        self.apply(StateMutation::SetLoading(loading));
    }

    pub fn set_error(&self, error: Option<SyncError>) {
        self.apply(StateMutation::SetError(error));
    }

    /// Clone the current state
    pub fn snapshot(&self) -> SyncState {
        self.tx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().loading
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::repo_info;
    use crate::models::FolderType;
    use chrono::Utc;

    fn record(id: &str, name: &str, folder_type: FolderType) -> RepoRecord {
        RepoRecord::from_info(repo_info(id, name, folder_type, true), Utc::now())
    }

    #[test]
    fn test_state_new_is_empty() {
        let state = SyncState::new();
        assert!(state.records.is_empty());
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert!(state.new_ids.is_empty());
    }

    #[test]
    fn test_replace_records_is_wholesale() {
        let mut state = SyncState::new();
        let mut first = HashMap::new();
        first.insert(RepoId::new("a"), record("a", "alpha", FolderType::Private));
        first.insert(RepoId::new("b"), record("b", "beta", FolderType::Private));
        state.apply(StateMutation::ReplaceRecords(first));

        let mut second = HashMap::new();
        second.insert(RepoId::new("c"), record("c", "gamma", FolderType::Team));
        state.apply(StateMutation::ReplaceRecords(second));

        assert_eq!(state.records.len(), 1);
        assert!(state.records.contains_key(&RepoId::new("c")));
    }

    #[test]
    fn test_sorted_records() {
        let mut state = SyncState::new();
        let mut records = HashMap::new();
        records.insert(RepoId::new("1"), record("1", "zeta", FolderType::Private));
        records.insert(RepoId::new("2"), record("2", "proj", FolderType::Team));
        records.insert(RepoId::new("3"), record("3", "alpha", FolderType::Private));
        state.apply(StateMutation::ReplaceRecords(records));

        let names: Vec<String> = state
            .sorted_records()
            .iter()
            .map(|r| r.qualified_name())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta", "acme/proj"]);
    }

    #[test]
    fn test_mutation_paths() {
        assert_eq!(StateMutation::SetLoading(true).path().as_str(), "repos.loading");
        assert_eq!(StateMutation::SetError(None).path(), StatePath::Error);
        assert_eq!(
            StateMutation::ReplaceNewIds(HashSet::new()).path().to_string(),
            "repos.new_ids"
        );
    }

    #[tokio::test]
    async fn test_store_notifies_subscribers() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.set_loading(true);
        rx.changed().await.unwrap();
        assert!(rx.borrow().loading);

        let mut ids = HashSet::new();
        ids.insert(RepoId::new("x"));
        store.apply(StateMutation::ReplaceNewIds(ids));
        assert!(store.snapshot().is_new(&RepoId::new("x")));
    }

    #[test]
    fn test_apply_if_respects_guard() {
        let store = SessionStore::new();
        assert!(!store.apply_if(|| false, StateMutation::SetLoading(true)));
        assert!(!store.is_loading());

        assert!(store.apply_if(|| true, StateMutation::SetLoading(true)));
        assert!(store.is_loading());
    }
}
