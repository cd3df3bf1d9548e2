// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery side of the MedAdhere offline sync core.
//!
//! - [`HttpSyncTarget`]: POSTs one action per request to the sync endpoint.
//! - [`ReplayCoordinator`]: drains the queue in order, stopping at the first failure.
//! - [`ConnectivityMonitor`]: online/offline signal that triggers replay on reconnect.
//! - [`ActionDispatcher`]: delivers directly when possible, queues otherwise.

pub mod connectivity;
pub mod dispatcher;
pub mod http;
pub mod replay;

pub use connectivity::ConnectivityMonitor;
pub use dispatcher::{ActionDispatcher, SubmitOutcome};
pub use http::{HttpSyncTarget, IDEMPOTENCY_KEY};
pub use replay::{ReplayCoordinator, ReplayOutcome, ReplayState};
