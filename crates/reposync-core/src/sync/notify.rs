//! Pushed notification handling
//!
//! Each inbound message body is a JSON object with an `action` field. A batch
//! produces at most one reload: the scan stops at the first message whose
//! action means the cache may be stale.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::reload::{ReloadReason, ReloadRequester};

/// Actions that make the local cache stale
pub const STALE_ACTIONS: [&str; 3] = ["create", "update", "delete"];

/// One pushed message, body still unparsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub body: String,
}

impl InboundMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

#[derive(Debug, Deserialize)]
struct NotificationBody {
    action: String,
}

/// Find the first staleness-implying action in a batch
///
/// Messages after the match are not parsed. Bodies that are not valid JSON
/// or lack an `action` are logged and skipped.
pub fn first_stale_action(batch: &[InboundMessage]) -> Option<String> {
    for message in batch {
        let body: NotificationBody = match serde_json::from_str(&message.body) {
            Ok(body) => body,
            Err(e) => {
                warn!("Ignoring malformed notification: {}", e);
                continue;
            }
        };

        if STALE_ACTIONS.contains(&body.action.as_str()) {
            return Some(body.action);
        }
        debug!("notification action '{}' ignored", body.action);
    }
    None
}

/// Turns notification batches into reload requests
#[derive(Debug, Clone)]
pub struct NotificationListener {
    reload: ReloadRequester,
}

impl NotificationListener {
    pub fn new(reload: ReloadRequester) -> Self {
        Self { reload }
    }

    /// Handle one batch; returns whether a reload was requested
    pub fn handle_batch(&self, batch: &[InboundMessage]) -> bool {
        match first_stale_action(batch) {
            Some(action) => {
                self.reload.request(ReloadReason::Notification(action));
                true
            }
            None => false,
        }
    }
}
