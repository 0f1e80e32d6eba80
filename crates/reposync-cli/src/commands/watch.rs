//! Watch command: a long-running session
//!
//! Runs the full controller, feeds it pushed notifications when a feed URL
//! is configured, and reprints the list whenever a load settles.

use anyhow::Result;
use tracing::{debug, info};

use reposync_core::nav::SETTINGS_TAB;
use reposync_core::sync::spawn_notification_feed;
use reposync_core::{Config, Effect, SyncController, SyncState};

use crate::output::Output;

pub async fn run(config: &Config, output: &Output) -> Result<()> {
    let service = super::connect(config)?;
    let (controller, mut effects) = SyncController::spawn(service, config.layout);

    let feed = match &config.notify_url {
        Some(url) => Some(spawn_notification_feed(url.clone(), controller.sender())),
        None => {
            output.message(
                "notify_url not set; the list will not refresh on its own.\n  \
                 reposync config set notify_url ws://your-server:8766",
            );
            None
        }
    };

    let mut state_rx = controller.subscribe();
    let mut shown: Option<SyncState> = None;

    controller.navigated(config.layout.repo_listing_route());
    controller.request_load();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            Some(effect) = effects.recv() => match effect {
                Effect::Navigate(route) => {
                    controller.navigated(route);
                }
                Effect::Advisory(e) => output.advisory(&e),
            },
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                if should_render(shown.as_ref(), &state) {
                    render(&state, output);
                    shown = Some(state);
                }
            }
        }
    }

    if let Some(feed) = feed {
        feed.shutdown().await;
    }
    // leaving the list view acknowledges the "new repo" badge
    controller.navigated(vec![SETTINGS_TAB.to_string()]);
    controller.shutdown().await;
    debug!("watch finished");
    Ok(())
}

/// Only settled states that differ from what is on screen get printed
fn should_render(shown: Option<&SyncState>, state: &SyncState) -> bool {
    if state.loading {
        return false;
    }
    match shown {
        None => true,
        Some(prev) => {
            prev.records != state.records
                || prev.error != state.error
                || prev.new_ids != state.new_ids
        }
    }
}

fn render(state: &SyncState, output: &Output) {
    match &state.error {
        Some(e) => output.error(e),
        None => output.print_records(state),
    }
}
