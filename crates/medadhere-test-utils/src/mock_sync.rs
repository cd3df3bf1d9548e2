// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable sync target for deterministic replay tests.
//!
//! `MockSyncTarget` records every delivery attempt. Individual calls (counted
//! from 1 across the mock's lifetime) can be scripted to fail or to hang, and
//! deliveries can be held until the test releases them.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Semaphore, watch};

use medadhere_core::{
    Action, AdapterType, HealthStatus, MedAdhereError, PluginAdapter, SyncTarget,
};

#[derive(Default)]
struct Script {
    attempted: Vec<Action>,
    delivered: Vec<Action>,
    failing: HashSet<usize>,
    hanging: HashSet<usize>,
    offline: bool,
}

/// A sync target whose behaviour is scripted per call.
pub struct MockSyncTarget {
    script: Mutex<Script>,
    calls: watch::Sender<usize>,
    held: AtomicBool,
    releases: Semaphore,
}

impl MockSyncTarget {
    /// A target that accepts every action.
    pub fn new() -> Self {
        let (calls, _) = watch::channel(0);
        Self {
            script: Mutex::new(Script::default()),
            calls,
            held: AtomicBool::new(false),
            releases: Semaphore::new(0),
        }
    }

    /// Make the `call`-th delivery attempt fail.
    pub fn fail_on_call(&self, call: usize) {
        self.script().failing.insert(call);
    }

    /// Make the `call`-th delivery attempt never complete.
    pub fn hang_on_call(&self, call: usize) {
        self.script().hanging.insert(call);
    }

    /// Fail every attempt while `offline` is true.
    pub fn set_offline(&self, offline: bool) {
        self.script().offline = offline;
    }

    /// Hold each delivery until [`release`](Self::release) lets it through.
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let `n` held deliveries complete.
    pub fn release(&self, n: usize) {
        self.releases.add_permits(n);
    }

    /// Wait until at least `n` delivery attempts have started.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.calls.subscribe();
        let _ = rx.wait_for(|calls| *calls >= n).await;
    }

    /// Number of delivery attempts so far.
    pub fn call_count(&self) -> usize {
        self.script().attempted.len()
    }

    /// Every action passed to `deliver`, in call order.
    pub fn attempted(&self) -> Vec<Action> {
        self.script().attempted.clone()
    }

    /// Actions that were accepted, in call order.
    pub fn delivered(&self) -> Vec<Action> {
        self.script().delivered.clone()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockSyncTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockSyncTarget {
    fn name(&self) -> &str {
        "mock-sync"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SyncTarget
    }

    async fn health_check(&self) -> Result<HealthStatus, MedAdhereError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MedAdhereError> {
        Ok(())
    }
}

#[async_trait]
impl SyncTarget for MockSyncTarget {
    async fn deliver(&self, action: &Action) -> Result<(), MedAdhereError> {
        let (call, hangs, fails) = {
            let mut script = self.script();
            script.attempted.push(action.clone());
            let call = script.attempted.len();
            (
                call,
                script.hanging.contains(&call),
                script.offline || script.failing.contains(&call),
            )
        };
        self.calls.send_replace(call);

        if hangs {
            std::future::pending::<()>().await;
        }

        if self.held.load(Ordering::SeqCst) {
            let permit = self
                .releases
                .acquire()
                .await
                .map_err(|e| MedAdhereError::Internal(format!("mock gate closed: {e}")))?;
            permit.forget();
        }

        if fails {
            return Err(MedAdhereError::Delivery {
                message: format!("mock failure on call {call}"),
                status: Some(503),
                source: None,
            });
        }

        self.script().delivered.push(action.clone());
        Ok(())
    }
}
