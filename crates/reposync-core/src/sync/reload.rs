//! The "reload requested" signal
//!
//! Commands and notifications never load on their own; they post a reason on
//! this channel and the controller starts a (superseding) load.

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Why a reload was requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadReason {
    /// Explicit request from the user or the render layer
    Requested,
    /// A create/delete command finished successfully
    CommandSucceeded(&'static str),
    /// A pushed notification carried a staleness-implying action
    Notification(String),
}

impl fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadReason::Requested => f.write_str("requested"),
            ReloadReason::CommandSucceeded(verb) => write!(f, "{} succeeded", verb),
            ReloadReason::Notification(action) => write!(f, "notification '{}'", action),
        }
    }
}

/// Sending half of the reload signal
#[derive(Debug, Clone)]
pub struct ReloadRequester {
    tx: mpsc::UnboundedSender<ReloadReason>,
}

impl ReloadRequester {
    pub fn request(&self, reason: ReloadReason) {
        debug!("reload requested: {}", reason);
        if self.tx.send(reason).is_err() {
            warn!("reload requested after the controller stopped");
        }
    }
}

/// Create a reload signal pair
pub fn reload_channel() -> (ReloadRequester, mpsc::UnboundedReceiver<ReloadReason>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReloadRequester { tx }, rx)
}
