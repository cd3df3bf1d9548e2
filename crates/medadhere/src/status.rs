// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `medadhere status` command implementation.
//!
//! Reports the queue depth, queue health, quarantine count, and whether the
//! sync endpoint is reachable.

use std::io::IsTerminal;
use std::time::Duration;

use serde::Serialize;

use medadhere_config::MedAdhereConfig;
use medadhere_core::{HealthStatus, MedAdhereError, PluginAdapter, QueueStore};

use crate::stack::SyncStack;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub endpoint: String,
    pub online: bool,
    pub queue_health: String,
    /// `None` when the persisted queue cannot be read.
    pub pending: Option<usize>,
    pub quarantined: usize,
}

fn describe_health(health: &HealthStatus) -> String {
    match health {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Degraded(reason) => format!("degraded: {reason}"),
        HealthStatus::Unhealthy(reason) => format!("unhealthy: {reason}"),
    }
}

/// Run the `medadhere status` command.
pub async fn run_status(
    config: &MedAdhereConfig,
    json: bool,
    plain: bool,
) -> Result<(), MedAdhereError> {
    let stack = SyncStack::open(config).await?;
    let online = stack
        .probe(Duration::from_secs(config.connectivity.probe_timeout_secs))
        .await;
    let health = stack.queue.health_check().await?;

    let status = StatusResponse {
        endpoint: stack.target.endpoint_url().to_string(),
        online,
        queue_health: describe_health(&health),
        pending: stack.queue.len().await.ok(),
        quarantined: stack.queue.quarantined().await?.len(),
    };
    stack.queue.shutdown().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&status, matches!(health, HealthStatus::Healthy), use_color);
    }
    Ok(())
}

fn print_status(status: &StatusResponse, healthy: bool, use_color: bool) {
    println!();
    println!("  medadhere status");
    println!("  {}", "-".repeat(35));

    let pending = status
        .pending
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if use_color {
        use colored::Colorize;
        let link = if status.online {
            format!("{} {}", "✓".green(), "online".green())
        } else {
            format!("{} {}", "✗".red(), "offline".red())
        };
        let queue = if healthy {
            status.queue_health.green()
        } else {
            status.queue_health.yellow()
        };
        println!("    Endpoint:    {} ({link})", status.endpoint);
        println!("    Queue:       {queue}");
        println!("    Pending:     {pending}");
        println!("    Quarantined: {}", status.quarantined);
    } else {
        let link = if status.online { "[OK] online" } else { "[FAIL] offline" };
        println!("    Endpoint:    {} ({link})", status.endpoint);
        println!("    Queue:       {}", status.queue_health);
        println!("    Pending:     {pending}");
        println!("    Quarantined: {}", status.quarantined);
    }

    if status.quarantined > 0 {
        println!();
        println!("  Inspect with: medadhere quarantine");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_health_keeps_reason() {
        let health = HealthStatus::Degraded("queue unreadable".into());
        assert_eq!(describe_health(&health), "degraded: queue unreadable");
    }

    #[test]
    fn status_response_serializes_unknown_depth_as_null() {
        let resp = StatusResponse {
            endpoint: "http://127.0.0.1:8080/api/sync".to_string(),
            online: false,
            queue_health: "degraded: bad json".to_string(),
            pending: None,
            quarantined: 1,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"online\":false"));
        assert!(json.contains("\"pending\":null"));
    }
}
