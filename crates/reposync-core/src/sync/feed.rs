//! Notification feed
//!
//! Keeps a WebSocket open to the notification service and forwards every
//! text frame (a JSON batch of messages) to the controller. Reconnects with
//! exponential backoff until told to shut down.

use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::controller::ControllerSender;
use super::notify::InboundMessage;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// One pushed frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFrame {
    pub messages: Vec<InboundMessage>,
}

impl NotificationFrame {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Commands sent to the feed task
#[derive(Debug)]
pub enum FeedCommand {
    Shutdown,
}

/// Handle for controlling the feed task
pub struct FeedHandle {
    pub command_tx: mpsc::Sender<FeedCommand>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Ask the feed to stop and wait for it
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(FeedCommand::Shutdown).await;
        let _ = self.task.await;
    }
}

/// How a single connection ended
enum ConnectionEnd {
    Shutdown,
    Closed,
    Failed(String),
}

/// Spawn the background feed for `url`, delivering batches to `sink`
pub fn spawn_notification_feed(url: String, sink: ControllerSender) -> FeedHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let task = tokio::spawn(feed_task(url, sink, command_rx));

    FeedHandle { command_tx, task }
}

async fn feed_task(
    url: String,
    sink: ControllerSender,
    mut command_rx: mpsc::Receiver<FeedCommand>,
) {
    let mut reconnect_delay = INITIAL_RECONNECT_DELAY;

    loop {
        match connect_and_listen(&url, &sink, &mut command_rx).await {
            ConnectionEnd::Shutdown => break,
            ConnectionEnd::Closed => {
                info!("Notification feed closed by server");
                reconnect_delay = INITIAL_RECONNECT_DELAY;
            }
            ConnectionEnd::Failed(e) => {
                warn!("Notification feed error: {}", e);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {
                reconnect_delay = (reconnect_delay * 2).min(MAX_RECONNECT_DELAY);
            }
            cmd = command_rx.recv() => {
                if matches!(cmd, Some(FeedCommand::Shutdown) | None) {
                    break;
                }
            }
        }
    }

    debug!("notification feed stopped");
}

async fn connect_and_listen(
    url: &str,
    sink: &ControllerSender,
    command_rx: &mut mpsc::Receiver<FeedCommand>,
) -> ConnectionEnd {
    let (ws_stream, _) = match connect_async(url).await {
        Ok(conn) => conn,
        Err(e) => return ConnectionEnd::Failed(format!("connect to {} failed: {}", url, e)),
    };
    info!("Notification feed connected to {}", url);

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                if matches!(cmd, Some(FeedCommand::Shutdown) | None) {
                    return ConnectionEnd::Shutdown;
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !forward_frame(&text, sink) {
                            return ConnectionEnd::Shutdown;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return ConnectionEnd::Closed,
                    Some(Err(e)) => return ConnectionEnd::Failed(e.to_string()),
                    // ping/pong/binary
                    _ => {}
                }
            }
        }
    }
}

/// Decode a frame and hand it to the controller
///
/// Returns false once the controller is gone.
fn forward_frame(text: &str, sink: &ControllerSender) -> bool {
    match NotificationFrame::decode(text) {
        Ok(frame) if frame.messages.is_empty() => true,
        Ok(frame) => sink.notifications(frame.messages),
        Err(e) => {
            warn!("Dropping undecodable notification frame: {}", e);
            true
        }
    }
}
