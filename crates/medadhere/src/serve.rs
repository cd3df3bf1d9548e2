// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `medadhere serve` command implementation.
//!
//! Runs the sync core as a long-lived process: replays the queue at startup,
//! probes the sync endpoint on an interval to drive the connectivity signal,
//! replays on every reconnect, and optionally reads actions as JSON lines on
//! stdin. Shuts down on SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use medadhere_config::MedAdhereConfig;
use medadhere_core::{ActionKind, MedAdhereError, PluginAdapter, QueueStore};
use medadhere_prometheus::PrometheusAdapter;
use medadhere_reminders::{ReminderFired, ReminderScheduler};
use medadhere_sync::ActionDispatcher;

use crate::shutdown;
use crate::stack::SyncStack;

/// Buffered reminders waiting to be reported.
const REMINDER_CHANNEL_CAPACITY: usize = 64;

/// One line of stdin input.
#[derive(Debug, Deserialize)]
struct ActionLine {
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Runs the `medadhere serve` command until a shutdown signal arrives.
pub async fn run_serve(config: MedAdhereConfig, read_stdin: bool) -> Result<(), MedAdhereError> {
    let metrics = if config.prometheus.enabled {
        Some(PrometheusAdapter::new()?)
    } else {
        None
    };

    let stack = SyncStack::open(&config).await?;
    info!(
        database = %config.storage.database_path,
        endpoint = %stack.target.endpoint_url(),
        "sync core started"
    );

    let cancel = shutdown::install_signal_handler();

    let mut dispatcher = stack.dispatcher();
    let reminders = if config.reminders.enabled {
        let (scheduler, fired) = ReminderScheduler::new(REMINDER_CHANNEL_CAPACITY);
        let scheduler = Arc::new(scheduler);
        dispatcher = dispatcher.with_reminders(scheduler.clone());
        tokio::spawn(report_reminders(fired, cancel.clone()));
        Some(scheduler)
    } else {
        None
    };

    let probe_interval = Duration::from_secs(config.connectivity.probe_interval_secs);
    let probe_timeout = Duration::from_secs(config.connectivity.probe_timeout_secs);

    // The first probe runs before the reconnect loop subscribes, so a device
    // that starts online is drained by the startup replay below, not twice.
    stack.probe(probe_timeout).await;
    let reconnect = stack
        .connectivity
        .spawn_replay_on_reconnect(stack.coordinator.clone(), cancel.clone());

    if config.sync.replay_on_startup {
        if stack.connectivity.is_online() {
            // Outcome and errors are logged by replay().
            let _ = stack.coordinator.replay().await;
        } else {
            info!("sync endpoint unreachable, startup replay deferred until reconnect");
        }
    }

    let stdin_task = read_stdin.then(|| tokio::spawn(read_actions(dispatcher, cancel.clone())));

    let mut ticker = tokio::time::interval(probe_interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let online = stack.probe(probe_timeout).await;
                debug!(online, "connectivity probe");
                if let Ok(depth) = stack.queue.len().await {
                    medadhere_prometheus::set_queue_depth(depth);
                }
            }
        }
    }

    info!("shutting down");
    if let Some(task) = stdin_task {
        task.abort();
    }
    if let Err(e) = reconnect.await {
        warn!(error = %e, "replay-on-reconnect task ended abnormally");
    }
    if let Some(reminders) = &reminders {
        reminders.shutdown();
    }
    if let Some(metrics) = &metrics {
        debug!(metrics = %metrics.render(), "final metrics snapshot");
    }
    stack.queue.shutdown().await?;
    info!("shutdown complete");
    Ok(())
}

/// Submit each JSON line read from stdin as an action.
async fn read_actions(dispatcher: ActionDispatcher, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                error!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let parsed: ActionLine = match serde_json::from_str(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "ignoring malformed action line");
                continue;
            }
        };
        match dispatcher
            .submit(ActionKind::from(parsed.kind), parsed.payload)
            .await
        {
            Ok(outcome) => info!(?outcome, "action submitted"),
            Err(e) => error!(error = %e, "action could not be delivered or saved"),
        }
    }
}

async fn report_reminders(mut fired: mpsc::Receiver<ReminderFired>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            reminder = fired.recv() => match reminder {
                Some(reminder) => info!(
                    medication_id = %reminder.medication_id,
                    fire_at = %reminder.fire_at,
                    body = %reminder.body,
                    "medication reminder"
                ),
                None => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_line_parses_kind_and_payload() {
        let line: ActionLine =
            serde_json::from_str(r#"{"kind":"mark-taken","payload":{"id":3}}"#).unwrap();
        assert_eq!(ActionKind::from(line.kind), ActionKind::MarkTaken);
        assert_eq!(line.payload["id"], 3);
    }

    #[test]
    fn action_line_payload_defaults_to_null() {
        let line: ActionLine = serde_json::from_str(r#"{"kind":"adr-report"}"#).unwrap();
        assert!(line.payload.is_null());
    }
}
