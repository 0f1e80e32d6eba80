//! Repository sync controller
//!
//! Keeps the session cache in line with the remote metadata service.
//!
//! ## Components
//!
//! - `loader`: single-flight (latest wins) full reload of the cache
//! - `commands`: create/delete orchestration with loading/error bracketing
//! - `notify`: turns pushed notification batches into reload requests
//! - `badge`: clears the "new repo" badge after the repo view was visited
//! - `controller`: event loop wiring the above together
//! - `feed`: websocket listener delivering notification batches
//!
//! ## Usage
//!
//! ```ignore
//! let (handle, mut effects) = SyncController::spawn(service, Layout::Regular);
//! handle.request_load();
//! handle.run_command(RepoCommand::create_personal("dotfiles")?);
//! ```

mod badge;
mod commands;
mod controller;
mod feed;
mod loader;
mod notify;
mod reload;

pub use badge::{BadgeTracker, DismissCategory};
pub use commands::{CommandOrchestrator, RepoCommand};
pub use controller::{
    ControllerEvent, ControllerHandle, ControllerSender, SessionContext, SyncController,
};
pub use feed::{spawn_notification_feed, FeedCommand, FeedHandle, NotificationFrame};
pub use loader::{LastErrorWins, LoadGenerations, LoadOutcome, LoadReport, LoadToken, Loader};
pub use notify::{first_stale_action, InboundMessage, NotificationListener, STALE_ACTIONS};
pub use reload::{reload_channel, ReloadReason, ReloadRequester};

use tokio::sync::mpsc;

use crate::error::SyncError;

/// Fire-and-forget side effects emitted for the outer layers
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the navigation layer to show this route
    Navigate(Vec<String>),
    /// Non-fatal problem to surface globally (e.g. one repo failed to load)
    Advisory(SyncError),
}

/// Sending half of the effect channel
pub type EffectSender = mpsc::UnboundedSender<Effect>;
