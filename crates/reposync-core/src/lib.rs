//! reposync Core Library
//!
//! Client-side synchronization of repository metadata: a session cache of
//! private repositories kept current against a remote metadata service,
//! create/delete commands, and reloads driven by pushed notifications.
//!
//! # Architecture
//!
//! - **Loader**: the only writer of the repository cache, latest load wins
//! - **Commands**: create/delete with uniform loading/error handling
//! - **Notifications**: pushed batches turn into a single reload request
//! - **Badge**: dismisses the "new repo" badge after the view was visited
//!
//! # Quick Start
//!
//! ```text
//! let service = Arc::new(HttpRepoService::new(&config.server_url, config.request_timeout())?);
//! let (controller, mut effects) = SyncController::spawn(service, config.layout);
//!
//! controller.request_load();
//! controller.run_command(RepoCommand::create_team("proj", "acme.eng", true)?);
//! ```
//!
//! # Modules
//!
//! - `sync`: controller and its components
//! - `state`: session state and its mutation surface
//! - `remote`: service trait and HTTP transport
//! - `models`: wire types and cached records
//! - `config`: application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod nav;
pub mod reltime;
pub mod remote;
pub mod state;
pub mod sync;

pub use config::Config;
pub use error::{SyncError, SyncResult};
pub use models::{RepoId, RepoInfo, RepoRecord, RepoResult, TeamName};
pub use nav::Layout;
pub use remote::{HttpRepoService, RepoService};
pub use state::{SessionStore, StateMutation, StatePath, SyncState};
pub use sync::{ControllerHandle, Effect, RepoCommand, SyncController};
