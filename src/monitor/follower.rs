// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

//! Monotonic head tracker. Walks `last+1..=head` in order, fetches each
//! block with its transactions and receipts, and fans everything into the
//! plugin registry. A failed block fetch leaves the cursor in place so the
//! next tick retries it; bootstrap skips history and starts at the current
//! head. The WS variant only changes where ticks come from.

use crate::common::error::AppError;
use crate::monitor::plugin::PluginRegistry;
use crate::network::provider::WsProvider;
use crate::network::rpc::RpcClient;
use alloy::providers::Provider;
use futures::StreamExt;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

const SUBSCRIBE_RETRY_SECS: u64 = 2;

pub struct BlockFollower {
    rpc: Arc<RpcClient>,
    registry: Arc<PluginRegistry>,
    poll_interval: Duration,
    shutdown: CancellationToken,
    last_block: u64,
}

impl BlockFollower {
    pub fn new(
        rpc: Arc<RpcClient>,
        registry: Arc<PluginRegistry>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            rpc,
            registry,
            poll_interval,
            shutdown,
            last_block: 0,
        }
    }

    /// Polling mode: one tick per interval.
    pub async fn run(mut self) -> Result<(), AppError> {
        tracing::info!(
            target: "blocks",
            interval_secs = self.poll_interval.as_secs(),
            tx_plugins = self.registry.tx_plugin_count(),
            log_routes = self.registry.log_route_count(),
            "Block follower started (polling)"
        );
        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!(target: "blocks", "Shutdown requested; stopping block follower");
                return Ok(());
            }
            self.tick().await;
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(target: "blocks", "Shutdown requested; stopping block follower");
                    return Ok(());
                }
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    /// Push mode: consume newHeads and catch up to each announced head.
    /// Dispatch semantics are identical to polling.
    pub async fn run_push(mut self, ws: WsProvider) -> Result<(), AppError> {
        tracing::info!(target: "blocks", "Block follower started (newHeads subscription)");
        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!(target: "blocks", "Shutdown requested; stopping block follower");
                return Ok(());
            }

            match ws.subscribe_blocks().await {
                Ok(sub) => {
                    let mut stream = sub.into_stream();
                    tracing::info!(target: "blocks", "Subscribed to newHeads");
                    loop {
                        tokio::select! {
                            _ = self.shutdown.cancelled() => {
                                tracing::info!(target: "blocks", "Shutdown requested; exiting newHeads stream");
                                return Ok(());
                            }
                            maybe_header = stream.next() => {
                                match maybe_header {
                                    Some(header) => {
                                        let head = header.inner.number;
                                        if self.last_block == 0 {
                                            self.last_block = head;
                                            tracing::info!(target: "blocks", head, "Bootstrap: starting at current head");
                                            continue;
                                        }
                                        self.catch_up(head).await;
                                    }
                                    None => break,
                                }
                            }
                        }
                    }
                    tracing::warn!(target: "blocks", "newHeads subscription ended; resubscribing");
                }
                Err(e) => {
                    tracing::warn!(target: "blocks", error = %e, "Subscription failed; polling once as fallback");
                    self.tick().await;
                }
            }
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(target: "blocks", "Shutdown requested during follower backoff");
                    return Ok(());
                }
                _ = sleep(Duration::from_secs(SUBSCRIBE_RETRY_SECS)) => {}
            }
        }
    }

    async fn tick(&mut self) {
        let head = match self.rpc.latest_block_number().await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(target: "blocks", error = %e, "Failed to fetch head; retrying next tick");
                return;
            }
        };
        if self.last_block == 0 {
            self.last_block = head;
            tracing::info!(target: "blocks", head, "Bootstrap: starting at current head");
            return;
        }
        if head <= self.last_block {
            return;
        }
        self.catch_up(head).await;
    }

    /// Process `last+1..=target` in order, stopping at the first failure so
    /// the cursor never advances past an unprocessed block.
    async fn catch_up(&mut self, target: u64) {
        for number in self.last_block + 1..=target {
            if self.shutdown.is_cancelled() {
                return;
            }
            match self.process_block(number).await {
                Ok(tx_count) => {
                    tracing::debug!(target: "blocks", number, tx_count, "Block processed");
                    self.last_block = number;
                }
                Err(e) => {
                    tracing::warn!(
                        target: "blocks",
                        number,
                        error = %e,
                        "Block processing failed; will retry next tick"
                    );
                    return;
                }
            }
        }
    }

    async fn process_block(&self, number: u64) -> Result<usize, AppError> {
        let block = self.rpc.block_by_number(number).await?;
        let timestamp = block.timestamp_u64();
        let fetch_receipts = self.registry.needs_receipts();

        // Canonical index order; the sandwich heuristic depends on it.
        for tx in &block.transactions {
            self.registry.dispatch_tx(tx).await;

            if !fetch_receipts {
                continue;
            }
            let Some(tx_hash) = tx.hash_b256() else {
                tracing::warn!(target: "blocks", hash = %tx.hash, "Unparseable tx hash; skipping receipt");
                continue;
            };
            let receipt = self.rpc.receipt(tx_hash).await?;
            self.registry
                .dispatch_tx_and_receipt(tx, &receipt, timestamp)
                .await;
            for log in &receipt.logs {
                self.registry.dispatch_log(log).await;
            }
        }
        Ok(block.transactions.len())
    }
}
