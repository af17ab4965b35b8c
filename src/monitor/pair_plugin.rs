// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Uniswap V2 PairCreated intake. Every ETH-quoted pair seeds one token
//! pipeline row in PENDING_LIQUIDITY; the scanners take it from there.
//! Reserves are usually still zero at this point and the token's name and
//! symbol are unknown until the liquidity scanner fills them in.

use crate::abi::{address_from_topic, address_from_word};
use crate::common::constants::{PAIR_CREATED_TOPIC, UNISWAP_V2_FACTORY, WETH_MAINNET};
use crate::common::parsing::{canonical_address, canonical_hash};
use crate::common::time::now_naive;
use crate::data::db::Database;
use crate::data::schema::NewTokenAnalysis;
use crate::monitor::plugin::LogPlugin;
use crate::network::rpc::RpcLog;
use alloy::primitives::{Address, B256};
use async_trait::async_trait;

pub struct PairCreatedPlugin {
    db: Database,
    factory: Address,
    weth: Address,
}

impl PairCreatedPlugin {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            factory: UNISWAP_V2_FACTORY,
            weth: WETH_MAINNET,
        }
    }

}

#[async_trait]
impl LogPlugin for PairCreatedPlugin {
    fn from_contract(&self) -> Address {
        self.factory
    }

    fn interested_topics(&self) -> Vec<B256> {
        vec![PAIR_CREATED_TOPIC]
    }

    async fn accept_log(&self, log: &RpcLog) {
        if log.removed {
            return;
        }
        // PairCreated(address indexed token0, address indexed token1, address pair, uint)
        let (Some(topic1), Some(topic2)) = (log.topic(1), log.topic(2)) else {
            return;
        };
        let token0 = address_from_topic(topic1);
        let token1 = address_from_topic(topic2);

        let data = log.data_bytes();
        let Some(pair) = address_from_word(&data) else {
            tracing::warn!(target: "pairs", "PairCreated log with short data; skipping");
            return;
        };

        // Only ETH-quoted pairs enter the pipeline.
        let new_token = if token0 == self.weth {
            token1
        } else if token1 == self.weth {
            token0
        } else {
            return;
        };

        let token_address = canonical_address(new_token);
        match self.db.token_by_address(&token_address).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                tracing::error!(target: "pairs", error = %e, "Token lookup failed; skipping event");
                return;
            }
        }

        let row = NewTokenAnalysis {
            token_address: token_address.clone(),
            pair_address: canonical_address(pair),
            pair_created_at: now_naive(),
        };
        match self.db.insert_token_analysis(&row).await {
            Ok(true) => {
                tracing::info!(
                    target: "pairs",
                    token = %token_address,
                    pair = %row.pair_address,
                    tx_hash = %log.tx_hash_b256().map(canonical_hash).unwrap_or_default(),
                    block = log.block_number_u64(),
                    "New ETH-quoted pair; token queued for liquidity watch"
                );
            }
            // Concurrent insert for the same token; first writer wins.
            Ok(false) => {
                tracing::debug!(target: "pairs", token = %token_address, "Token already queued");
            }
            Err(e) => {
                tracing::error!(target: "pairs", error = %e, "Failed to queue token");
            }
        }
    }
}
