//! crates/anglerhub_client/src/connectivity.rs
//!
//! Feeds connectivity changes into the offline queue. The platform side
//! publishes `true`/`false` on a `watch` channel; when the link comes back the
//! queue is given a short settling delay and then synced.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::queue::OfflineQueue;

/// Spawns the watcher. It exits when the sender side is dropped.
pub fn watch_connectivity(
    queue: Arc<OfflineQueue>,
    mut status: watch::Receiver<bool>,
    settle_delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        queue.set_online(*status.borrow_and_update());
        while status.changed().await.is_ok() {
            let online = *status.borrow_and_update();
            let was_online = queue.is_online();
            queue.set_online(online);
            debug!(online, "Connectivity changed");

            if !online || was_online {
                continue;
            }
            if queue.stats().await.total == 0 {
                continue;
            }
            info!("Connection restored, syncing offline data");
            tokio::time::sleep(settle_delay).await;
            // The link may have dropped again while settling.
            if *status.borrow() {
                queue.set_online(true);
                queue.sync_all().await;
            }
        }
    })
}
