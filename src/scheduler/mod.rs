// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

pub mod liquidity_scanner;
pub mod safety_scanner;

use std::future::Future;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

/// Drive a scan pass on a fixed period until shutdown. The in-flight pass
/// always completes; cancellation is only observed between passes.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    interval: Duration,
    shutdown: CancellationToken,
    mut pass: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tracing::info!(target: "scheduler", job = name, interval_secs = interval.as_secs(), "Periodic job started");
    loop {
        pass().await;
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(target: "scheduler", job = name, "Periodic job stopped");
                return;
            }
            _ = sleep(interval) => {}
        }
    }
}
