// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Contract deployment tracking. The receipt's contractAddress field is the
//! authoritative signal; `to == None` is only the cheap pre-filter. A
//! delayed ERC-20 metadata probe runs on a bounded pool so a burst of
//! deployments cannot fan out into unbounded task spawns.

use crate::analyzer::token_info::TokenMetadataSource;
use crate::common::parsing::{canonical_address, canonical_hash};
use crate::data::db::Database;
use crate::data::schema::NewContractDeployment;
use crate::monitor::plugin::TxReceiptPlugin;
use crate::network::rpc::{RpcReceipt, RpcTransaction};
use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::DateTime;
use dashmap::DashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{Duration, sleep};

/// Grace period before probing a fresh contract; constructors often finish
/// initialization (minting, ownership moves) in follow-up transactions.
const TOKEN_PROBE_DELAY_SECS: u64 = 30;

pub struct ContractDeploymentPlugin {
    db: Database,
    token_reader: Option<Arc<dyn TokenMetadataSource>>,
    inflight_probes: Arc<DashSet<Address>>,
    probe_permits: Arc<Semaphore>,
}

impl ContractDeploymentPlugin {
    pub fn new(
        db: Database,
        token_reader: Option<Arc<dyn TokenMetadataSource>>,
        probe_worker_limit: usize,
    ) -> Self {
        Self {
            db,
            token_reader,
            inflight_probes: Arc::new(DashSet::new()),
            probe_permits: Arc::new(Semaphore::new(probe_worker_limit.max(1))),
        }
    }

    /// Detached, bounded classification probe. Saturated permits drop the
    /// probe rather than queue it; the deployment row already exists and a
    /// missing classification is recoverable offline.
    fn schedule_token_probe(&self, contract: Address) {
        let Some(reader) = self.token_reader.clone() else {
            return;
        };
        if !self.inflight_probes.insert(contract) {
            return;
        }
        let permit = match self.probe_permits.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                self.inflight_probes.remove(&contract);
                tracing::debug!(target: "deployments", contract = %format!("{contract:#x}"), "Probe pool saturated; skipping classification");
                return;
            }
        };
        let db = self.db.clone();
        let inflight = self.inflight_probes.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(TOKEN_PROBE_DELAY_SECS)).await;
            let address = canonical_address(contract);
            match reader.read_token_info(contract).await {
                Ok(info) if info.is_valid => {
                    tracing::info!(
                        target: "deployments",
                        contract = %address,
                        symbol = %info.symbol,
                        "Deployment classified as ERC-20"
                    );
                    if let Err(e) = db.mark_deployment_token(&address, true, "ERC20").await {
                        tracing::error!(target: "deployments", error = %e, "Failed to record token classification");
                    }
                }
                Ok(_) => {
                    tracing::debug!(target: "deployments", contract = %address, "Deployment is not an ERC-20");
                }
                Err(e) => {
                    tracing::warn!(target: "deployments", contract = %address, error = %e, "Token probe failed");
                }
            }
            inflight.remove(&contract);
            drop(permit);
        });
    }
}

#[async_trait]
impl TxReceiptPlugin for ContractDeploymentPlugin {
    async fn accept_tx_and_receipt(
        &self,
        tx: &RpcTransaction,
        receipt: &RpcReceipt,
        block_timestamp: u64,
    ) {
        if !tx.is_create() {
            return;
        }
        if !receipt.succeeded() {
            tracing::debug!(
                target: "deployments",
                tx_hash = %tx.hash,
                "Deployment transaction reverted; skipping"
            );
            return;
        }
        let Some(contract) = receipt.contract_address_parsed() else {
            tracing::debug!(
                target: "deployments",
                tx_hash = %tx.hash,
                "Create transaction without contractAddress in receipt; skipping"
            );
            return;
        };

        let Some(tx_hash) = tx.hash_b256() else {
            return;
        };
        let deployed_at = DateTime::from_timestamp(block_timestamp as i64, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or_else(crate::common::time::now_naive);

        let deployment = NewContractDeployment {
            contract_address: canonical_address(contract),
            deployer_address: tx.from.clone().unwrap_or_default().to_lowercase(),
            tx_hash: canonical_hash(tx_hash),
            block_number: tx.block_number_u64() as i64,
            deployed_at,
        };
        match self.db.insert_deployment(&deployment).await {
            Ok(true) => {
                tracing::info!(
                    target: "deployments",
                    contract = %deployment.contract_address,
                    deployer = %deployment.deployer_address,
                    block = deployment.block_number,
                    "Contract deployment recorded"
                );
                self.schedule_token_probe(contract);
            }
            Ok(false) => {
                tracing::debug!(target: "deployments", contract = %deployment.contract_address, "Deployment already recorded");
            }
            Err(e) => {
                tracing::error!(target: "deployments", error = %e, "Failed to record deployment");
            }
        }
    }
}
