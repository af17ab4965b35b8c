// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Plugin surfaces the block follower fans events into. Three shapes: plain
//! transactions, transaction+receipt pairs, and contract logs. Log plugins
//! declare the `(contract, topic0)` pairs they care about and dispatch is a
//! map lookup on that key.
//!
//! Callbacks run inline on the follower task: keep them to one store write
//! and one short HTTP send, and push anything slower onto a detached worker.

use crate::network::rpc::{RpcLog, RpcReceipt, RpcTransaction};
use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait TxPlugin: Send + Sync {
    async fn accept_tx(&self, tx: &RpcTransaction);
}

#[async_trait]
pub trait TxReceiptPlugin: Send + Sync {
    async fn accept_tx_and_receipt(
        &self,
        tx: &RpcTransaction,
        receipt: &RpcReceipt,
        block_timestamp: u64,
    );
}

#[async_trait]
pub trait LogPlugin: Send + Sync {
    fn from_contract(&self) -> Address;
    fn interested_topics(&self) -> Vec<B256>;
    async fn accept_log(&self, log: &RpcLog);
}

/// Built once during wiring, read-only after dispatch starts.
#[derive(Default)]
pub struct PluginRegistry {
    tx_plugins: Vec<Arc<dyn TxPlugin>>,
    tx_receipt_plugins: Vec<Arc<dyn TxReceiptPlugin>>,
    log_plugins: HashMap<(Address, B256), Vec<Arc<dyn LogPlugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tx_plugin(&mut self, plugin: Arc<dyn TxPlugin>) {
        self.tx_plugins.push(plugin);
    }

    pub fn register_tx_receipt_plugin(&mut self, plugin: Arc<dyn TxReceiptPlugin>) {
        self.tx_receipt_plugins.push(plugin);
    }

    pub fn register_log_plugin(&mut self, plugin: Arc<dyn LogPlugin>) {
        let contract = plugin.from_contract();
        for topic in plugin.interested_topics() {
            self.log_plugins
                .entry((contract, topic))
                .or_default()
                .push(plugin.clone());
        }
    }

    /// Receipts are only fetched when someone will consume them.
    pub fn needs_receipts(&self) -> bool {
        !self.tx_receipt_plugins.is_empty() || !self.log_plugins.is_empty()
    }

    pub fn tx_plugin_count(&self) -> usize {
        self.tx_plugins.len()
    }

    pub fn log_route_count(&self) -> usize {
        self.log_plugins.len()
    }

    pub async fn dispatch_tx(&self, tx: &RpcTransaction) {
        for plugin in &self.tx_plugins {
            plugin.accept_tx(tx).await;
        }
    }

    pub async fn dispatch_tx_and_receipt(
        &self,
        tx: &RpcTransaction,
        receipt: &RpcReceipt,
        block_timestamp: u64,
    ) {
        for plugin in &self.tx_receipt_plugins {
            plugin.accept_tx_and_receipt(tx, receipt, block_timestamp).await;
        }
    }

    pub async fn dispatch_log(&self, log: &RpcLog) {
        let (Some(address), Some(topic0)) = (log.address_parsed(), log.topic0()) else {
            return;
        };
        if let Some(plugins) = self.log_plugins.get(&(address, topic0)) {
            for plugin in plugins {
                plugin.accept_log(log).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLogPlugin {
        contract: Address,
        topic: B256,
        hits: AtomicUsize,
    }

    #[async_trait]
    impl LogPlugin for CountingLogPlugin {
        fn from_contract(&self) -> Address {
            self.contract
        }
        fn interested_topics(&self) -> Vec<B256> {
            vec![self.topic]
        }
        async fn accept_log(&self, _log: &RpcLog) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn log_for(contract: Address, topic: B256) -> RpcLog {
        serde_json::from_value(serde_json::json!({
            "address": format!("{contract:#x}"),
            "topics": [format!("{topic:#x}")],
            "data": "0x",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn log_dispatch_routes_by_contract_and_topic() {
        let contract = Address::from([1u8; 20]);
        let topic = B256::from([2u8; 32]);
        let plugin = Arc::new(CountingLogPlugin {
            contract,
            topic,
            hits: AtomicUsize::new(0),
        });

        let mut registry = PluginRegistry::new();
        registry.register_log_plugin(plugin.clone());
        assert!(registry.needs_receipts());

        registry.dispatch_log(&log_for(contract, topic)).await;
        // Wrong contract and wrong topic both miss.
        registry
            .dispatch_log(&log_for(Address::from([9u8; 20]), topic))
            .await;
        registry
            .dispatch_log(&log_for(contract, B256::from([9u8; 32])))
            .await;

        assert_eq!(plugin.hits.load(Ordering::Relaxed), 1);
    }
}
