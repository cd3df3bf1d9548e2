// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot commands: `enqueue`, `replay`, and `quarantine`.

use std::time::Duration;

use medadhere_config::MedAdhereConfig;
use medadhere_core::{ActionKind, MedAdhereError, PluginAdapter, QuarantinedBlob, QueueStore};
use medadhere_sync::{ReplayOutcome, SubmitOutcome};

use crate::stack::SyncStack;

/// Longest blob excerpt printed by `medadhere quarantine`.
const PREVIEW_CHARS: usize = 80;

/// Submit one action, delivering it directly if the endpoint is reachable.
pub async fn run_enqueue(
    config: &MedAdhereConfig,
    kind: &str,
    payload: &str,
) -> Result<(), MedAdhereError> {
    let payload: serde_json::Value = serde_json::from_str(payload)?;
    let stack = SyncStack::open(config).await?;
    stack
        .probe(Duration::from_secs(config.connectivity.probe_timeout_secs))
        .await;

    let outcome = stack
        .dispatcher()
        .submit(ActionKind::from(kind), payload)
        .await;
    stack.queue.shutdown().await?;

    match outcome? {
        SubmitOutcome::Delivered { id } => println!("delivered {id}"),
        SubmitOutcome::Queued { id } => println!("queued {id}"),
    }
    Ok(())
}

/// Run a single replay pass and report what it did.
pub async fn run_replay(config: &MedAdhereConfig) -> Result<(), MedAdhereError> {
    let stack = SyncStack::open(config).await?;
    let outcome = stack.coordinator.replay().await;
    stack.queue.shutdown().await?;

    println!("{}", describe_outcome(&outcome?));
    Ok(())
}

/// List quarantined queue blobs, newest last.
pub async fn run_quarantine(config: &MedAdhereConfig, json: bool) -> Result<(), MedAdhereError> {
    let stack = SyncStack::open(config).await?;
    let blobs = stack.queue.quarantined().await;
    stack.queue.shutdown().await?;
    let blobs = blobs?;

    if json {
        println!("{}", serde_json::to_string_pretty(&blobs)?);
        return Ok(());
    }
    if blobs.is_empty() {
        println!("no quarantined queue data");
        return Ok(());
    }
    for blob in &blobs {
        println!("{}", describe_blob(blob));
    }
    Ok(())
}

fn describe_outcome(outcome: &ReplayOutcome) -> String {
    match outcome {
        ReplayOutcome::Empty => "nothing to replay".to_string(),
        ReplayOutcome::Delivered { count, remaining } => {
            format!("delivered {count} action(s), {remaining} still pending")
        }
        ReplayOutcome::Aborted {
            delivered,
            removed,
            failed,
            error,
        } => format!(
            "replay stopped at {failed} after {delivered} delivered ({removed} removed): {error}"
        ),
        ReplayOutcome::AlreadyDraining => "a replay is already running".to_string(),
        ReplayOutcome::Quarantined { quarantine_id } => match quarantine_id {
            Some(id) => format!("queue data was unreadable and moved to quarantine #{id}"),
            None => "queue data was unreadable".to_string(),
        },
    }
}

fn describe_blob(blob: &QuarantinedBlob) -> String {
    let preview: String = blob.raw.chars().take(PREVIEW_CHARS).collect();
    let ellipsis = if blob.raw.chars().count() > PREVIEW_CHARS {
        "..."
    } else {
        ""
    };
    format!(
        "#{} {} key={} reason={}\n    {preview}{ellipsis}",
        blob.id, blob.quarantined_at, blob.key, blob.reason
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use medadhere_core::ActionId;

    #[test]
    fn aborted_outcome_names_failed_action() {
        let failed = ActionId::new();
        let text = describe_outcome(&ReplayOutcome::Aborted {
            delivered: 1,
            removed: 0,
            failed,
            error: "HTTP 503".to_string(),
        });
        assert!(text.contains(&failed.to_string()));
        assert!(text.contains("HTTP 503"));
    }

    #[test]
    fn long_blobs_are_truncated() {
        let blob = QuarantinedBlob {
            id: 2,
            key: "offline_queue".to_string(),
            raw: "x".repeat(200),
            reason: "expected value".to_string(),
            quarantined_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let text = describe_blob(&blob);
        assert!(text.starts_with("#2 "));
        assert!(text.ends_with(&format!("{}...", "x".repeat(PREVIEW_CHARS))));
    }
}
