// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is
//! a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

use medadhere_core::{ActionKind, MedAdhereError};

/// Register all MedAdhere metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "medadhere_actions_enqueued_total",
        "Actions appended to the offline queue"
    );
    describe_counter!(
        "medadhere_actions_delivered_total",
        "Actions accepted by the sync target"
    );
    describe_counter!(
        "medadhere_delivery_failures_total",
        "Delivery attempts that failed or timed out"
    );
    describe_counter!(
        "medadhere_replay_passes_total",
        "Replay passes by outcome"
    );
    describe_gauge!("medadhere_queue_depth", "Actions currently pending");
    describe_histogram!(
        "medadhere_delivery_latency_seconds",
        "Latency of a single delivery attempt in seconds"
    );
}

/// Metric label for an action kind. Unrecognized tags share one label.
pub fn kind_label(kind: &ActionKind) -> &'static str {
    match kind {
        ActionKind::MedicationAdd => "medication-add",
        ActionKind::MarkTaken => "mark-taken",
        ActionKind::MedicationDelete => "medication-delete",
        ActionKind::AdrReport => "adr-report",
        ActionKind::Other(_) => "other",
    }
}

/// Metric label for a failed delivery: `timeout` or `error`.
pub fn failure_label(error: &MedAdhereError) -> &'static str {
    match error {
        MedAdhereError::Timeout { .. } => "timeout",
        _ => "error",
    }
}

/// Record an action appended to the queue.
pub fn record_enqueued(kind: &ActionKind) {
    metrics::counter!("medadhere_actions_enqueued_total", "kind" => kind_label(kind)).increment(1);
}

/// Record an action accepted by the sync target.
pub fn record_delivered(kind: &ActionKind) {
    metrics::counter!("medadhere_actions_delivered_total", "kind" => kind_label(kind))
        .increment(1);
}

/// Record a failed delivery attempt.
pub fn record_delivery_failure(error: &MedAdhereError) {
    metrics::counter!("medadhere_delivery_failures_total", "reason" => failure_label(error))
        .increment(1);
}

/// Record the outcome of one replay pass.
pub fn record_replay(outcome: &'static str) {
    metrics::counter!("medadhere_replay_passes_total", "outcome" => outcome).increment(1);
}

/// Set the number of pending actions.
pub fn set_queue_depth(depth: usize) {
    metrics::gauge!("medadhere_queue_depth").set(depth as f64);
}

/// Record delivery latency.
pub fn record_delivery_latency(seconds: f64) {
    metrics::histogram!("medadhere_delivery_latency_seconds").record(seconds);
}
