// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Online/offline signal and the replay-on-reconnect trigger.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::replay::ReplayCoordinator;

/// Boolean connectivity signal fed by the host.
///
/// Only transitions are published; setting the current value again is a no-op.
/// Offline to online transitions are also counted, so a listener that was busy
/// while the link dropped and came back still sees that a reconnect happened.
pub struct ConnectivityMonitor {
    online: watch::Sender<bool>,
    reconnects: watch::Sender<u64>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (online, _) = watch::channel(initially_online);
        let (reconnects, _) = watch::channel(0);
        Self { online, reconnects }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Update the signal. Returns true on an offline to online transition.
    pub fn set_online(&self, online: bool) -> bool {
        let mut came_online = false;
        self.online.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            came_online = online;
            *current = online;
            true
        });
        if came_online {
            self.reconnects.send_modify(|count| *count += 1);
            info!("connectivity restored");
        } else {
            debug!(online, "connectivity signal updated");
        }
        came_online
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Number of offline to online transitions so far.
    pub fn reconnect_count(&self) -> u64 {
        *self.reconnects.borrow()
    }

    /// Run `coordinator.replay()` after offline to online transitions until
    /// `cancel` fires.
    ///
    /// Transitions that happen while a pass is running are coalesced into one
    /// more pass once it finishes.
    pub fn spawn_replay_on_reconnect(
        &self,
        coordinator: Arc<ReplayCoordinator>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        // A fresh receiver treats the current count as seen.
        let mut rx = self.reconnects.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("replay-on-reconnect loop stopped");
                        break;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let reconnects = *rx.borrow_and_update();
                        debug!(reconnects, "replaying after reconnect");
                        // Outcome and errors are logged by replay().
                        let _ = coordinator.replay().await;
                    }
                }
            }
        })
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use medadhere_config::model::CommitMode;
    use medadhere_core::{Action, ActionKind, QueueStore};
    use medadhere_test_utils::{MemoryQueueStore, MockSyncTarget};
    use serde_json::json;

    use crate::replay::ReplayState;

    #[test]
    fn only_transitions_to_online_are_reported() {
        let monitor = ConnectivityMonitor::new(false);
        assert!(!monitor.is_online());
        assert!(monitor.set_online(true));
        assert!(!monitor.set_online(true));
        assert!(!monitor.set_online(false));
        assert!(monitor.set_online(true));
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn subscribers_see_transitions_only() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.subscribe();
        monitor.set_online(true);
        assert!(!rx.has_changed().unwrap());
        monitor.set_online(false);
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn reconnects_are_counted() {
        let monitor = ConnectivityMonitor::new(true);
        monitor.set_online(false);
        monitor.set_online(true);
        monitor.set_online(true);
        monitor.set_online(false);
        monitor.set_online(true);
        assert_eq!(monitor.reconnect_count(), 2);
    }

    #[tokio::test]
    async fn link_flap_during_pass_triggers_another_pass() {
        let queue = Arc::new(MemoryQueueStore::new());
        queue
            .enqueue(&Action::new(ActionKind::MarkTaken, json!({"id": 1})))
            .await
            .unwrap();
        let target = Arc::new(MockSyncTarget::new());
        target.hold();
        target.fail_on_call(1);
        let coordinator = Arc::new(ReplayCoordinator::new(
            queue.clone(),
            target.clone(),
            CommitMode::AllOrNothing,
            Duration::from_secs(5),
        ));

        let monitor = ConnectivityMonitor::new(false);
        let cancel = CancellationToken::new();
        let handle = monitor.spawn_replay_on_reconnect(coordinator.clone(), cancel.clone());

        monitor.set_online(true);
        target.wait_for_calls(1).await;
        monitor.set_online(false);
        monitor.set_online(true);
        target.release(2);

        let mut states = coordinator.subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|s| *s == ReplayState::Settled),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(target.call_count(), 2);
        assert!(queue.is_empty().await.unwrap());
        cancel.cancel();
        handle.await.unwrap();
    }
}
