// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily medication reminders.
//!
//! [`ReminderScheduler`] owns one cancelable timer per medication id. A timer
//! fires at the next local occurrence of its `HH:MM` time and then every 24
//! hours until cancelled. Fired reminders are published as [`ReminderFired`]
//! on the receiver returned by [`ReminderScheduler::new`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A reminder that reached its fire time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderFired {
    pub medication_id: String,
    pub fire_at: NaiveTime,
    pub body: String,
}

/// What to schedule for one medication, extracted from an action payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationReminder {
    pub medication_id: String,
    pub fire_at: NaiveTime,
    pub body: String,
}

impl MedicationReminder {
    /// Build a reminder from a medication record `{id, name, dosage, time}`.
    ///
    /// Returns `None` when the id or time is missing or the time is not a
    /// valid `HH:MM`.
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let medication_id = medication_id(payload)?;
        let fire_at = parse_time(payload.get("time")?.as_str()?)?;

        let name = payload.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let dosage = payload.get("dosage").and_then(|v| v.as_str()).unwrap_or("");
        let body = if dosage.is_empty() {
            name.to_string()
        } else {
            format!("{name} ({dosage})")
        };

        Some(Self {
            medication_id,
            fire_at,
            body,
        })
    }
}

/// Extract a medication id from a payload. Numeric and string ids are both accepted.
pub fn medication_id(payload: &serde_json::Value) -> Option<String> {
    match payload.get("id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse `HH:MM` (trailing `:SS` ignored).
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let mut parts = raw.trim().split(':');
    let hour = parts.next()?.trim().parse::<u32>().ok()?;
    let minute = parts.next()?.trim().parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Time from `now` until the next occurrence of `at`.
///
/// A time equal to `now` counts as already passed and resolves to tomorrow.
pub fn delay_until_next(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let mut target = now.date().and_time(at);
    if target <= now {
        target += TimeDelta::days(1);
    }
    (target - now).to_std().unwrap_or_default()
}

/// Owned registry of per-medication reminder timers.
pub struct ReminderScheduler {
    timers: Mutex<HashMap<String, CancellationToken>>,
    fired_tx: mpsc::Sender<ReminderFired>,
    root: CancellationToken,
}

impl ReminderScheduler {
    /// Create a scheduler and the receiver its timers publish to.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ReminderFired>) {
        let (fired_tx, fired_rx) = mpsc::channel(capacity.max(1));
        let scheduler = Self {
            timers: Mutex::new(HashMap::new()),
            fired_tx,
            root: CancellationToken::new(),
        };
        (scheduler, fired_rx)
    }

    /// Schedule a daily reminder, replacing any existing timer for the same id.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, reminder: MedicationReminder) {
        let token = self.root.child_token();
        if let Some(previous) = self
            .lock_timers()
            .insert(reminder.medication_id.clone(), token.clone())
        {
            previous.cancel();
            debug!(medication_id = %reminder.medication_id, "replaced existing reminder");
        }

        let delay = delay_until_next(Local::now().naive_local(), reminder.fire_at);
        info!(
            medication_id = %reminder.medication_id,
            fire_at = %reminder.fire_at,
            in_secs = delay.as_secs(),
            "reminder scheduled"
        );
        tokio::spawn(run_timer(reminder, delay, token, self.fired_tx.clone()));
    }

    /// Cancel the reminder for `medication_id`. Returns false if none was scheduled.
    pub fn cancel(&self, medication_id: &str) -> bool {
        match self.lock_timers().remove(medication_id) {
            Some(token) => {
                token.cancel();
                debug!(medication_id, "reminder cancelled");
                true
            }
            None => false,
        }
    }

    /// Returns true if a timer is registered for `medication_id`.
    pub fn is_scheduled(&self, medication_id: &str) -> bool {
        self.lock_timers().contains_key(medication_id)
    }

    /// Number of registered timers.
    pub fn len(&self) -> usize {
        self.lock_timers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every timer.
    pub fn shutdown(&self) {
        self.root.cancel();
        self.lock_timers().clear();
    }

    fn lock_timers(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
        // The map holds no invariants a panicking holder could break.
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn run_timer(
    reminder: MedicationReminder,
    first_delay: Duration,
    token: CancellationToken,
    fired_tx: mpsc::Sender<ReminderFired>,
) {
    let mut delay = first_delay;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {
                let fired = ReminderFired {
                    medication_id: reminder.medication_id.clone(),
                    fire_at: reminder.fire_at,
                    body: reminder.body.clone(),
                };
                if fired_tx.send(fired).await.is_err() {
                    warn!(medication_id = %reminder.medication_id, "reminder receiver dropped");
                    break;
                }
                delay = DAY;
            }
        }
    }
}
