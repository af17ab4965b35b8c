// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Watched-address transfer detection. Two event shapes share one gate
//! chain: dedup on tx hash, strictly-greater threshold, MEV veto, then
//! alert + audit rows.

use crate::abi::address_from_topic;
use crate::app::config::WatchedTokenEntry;
use crate::common::constants::TRANSFER_TOPIC;
use crate::common::error::AppError;
use crate::common::parsing::{
    canonical_address, canonical_hash, format_units, parse_address_hex, token_display_precision,
    wei_to_eth,
};
use crate::data::schema::Direction;
use crate::monitor::mev::MevOracle;
use crate::monitor::plugin::{LogPlugin, TxPlugin};
use crate::monitor::watchlist::WatchedAddresses;
use crate::network::rpc::{RpcLog, RpcTransaction};
use crate::notify::{NotificationService, TransferAlert};
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::sync::Arc;

/// An ERC-20 contract under watch, thresholds pre-scaled to base units.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    pub threshold_units: U256,
}

impl TokenConfig {
    pub fn from_entry(entry: &WatchedTokenEntry) -> Result<Self, AppError> {
        let address = parse_address_hex(&entry.address).ok_or_else(|| {
            AppError::Config(format!("Invalid watched token address: {}", entry.address))
        })?;
        let scale = U256::from(10u64).pow(U256::from(entry.decimals as u64));
        Ok(Self {
            address,
            symbol: entry.symbol.clone(),
            decimals: entry.decimals,
            threshold_units: U256::from(entry.threshold) * scale,
        })
    }
}

/// Shared gate chain behind both transfer plugin shapes.
pub struct TransferMonitor {
    watchlist: Arc<WatchedAddresses>,
    notifications: Arc<NotificationService>,
    mev_oracle: Option<Arc<dyn MevOracle>>,
    eth_threshold_wei: U256,
}

impl TransferMonitor {
    pub fn new(
        watchlist: Arc<WatchedAddresses>,
        notifications: Arc<NotificationService>,
        mev_oracle: Option<Arc<dyn MevOracle>>,
        eth_threshold_whole: u64,
    ) -> Self {
        let eth_threshold_wei =
            U256::from(eth_threshold_whole) * U256::from(10u64).pow(U256::from(18u64));
        Self {
            watchlist,
            notifications,
            mev_oracle,
            eth_threshold_wei,
        }
    }

    /// Direction and label relative to the watched endpoint. `None` when
    /// neither side is on the watch list.
    fn classify(&self, from: Option<Address>, to: Option<Address>) -> Option<(Direction, String)> {
        if let Some(from) = from
            && self.watchlist.is_monitored(from)
        {
            return Some((Direction::Out, self.watchlist.label(from)));
        }
        if let Some(to) = to
            && self.watchlist.is_monitored(to)
        {
            return Some((Direction::In, self.watchlist.label(to)));
        }
        None
    }

    async fn already_processed(&self, tx_hash: &str) -> bool {
        match self.notifications.is_processed(tx_hash).await {
            Ok(seen) => seen,
            Err(e) => {
                tracing::error!(target: "transfers", error = %e, "Dedup lookup failed; dropping event");
                true
            }
        }
    }

    /// MEV gate. Detector errors never block an alert.
    async fn vetoed_as_mev(&self, tx_hash: B256) -> bool {
        let Some(oracle) = &self.mev_oracle else {
            return false;
        };
        match oracle.assess(tx_hash).await {
            Ok(verdict) if verdict.is_mev => {
                tracing::info!(
                    target: "transfers",
                    tx_hash = %format!("{tx_hash:#x}"),
                    mev_type = verdict.mev_type.as_str(),
                    confidence = verdict.confidence,
                    "MEV verdict vetoed transfer alert"
                );
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(target: "transfers", error = %e, "MEV assessment failed; letting alert through");
                false
            }
        }
    }

    async fn emit(&self, alert: TransferAlert) {
        match self.notifications.notify_transfer(&alert).await {
            Ok(true) => {
                tracing::info!(
                    target: "transfers",
                    currency = %alert.currency,
                    direction = alert.direction.as_str(),
                    amount = %alert.amount,
                    tx_hash = %alert.tx_hash,
                    label = %alert.label,
                    "Transfer alert recorded"
                );
            }
            Ok(false) => {
                tracing::debug!(target: "transfers", tx_hash = %alert.tx_hash, "Lost insert race; alert already recorded");
            }
            Err(e) => {
                tracing::error!(target: "transfers", error = %e, "Failed to record transfer alert");
            }
        }
    }
}

/// Native-coin transfers, one per transaction.
pub struct NativeTransferPlugin {
    monitor: Arc<TransferMonitor>,
}

impl NativeTransferPlugin {
    pub fn new(monitor: Arc<TransferMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl TxPlugin for NativeTransferPlugin {
    async fn accept_tx(&self, tx: &RpcTransaction) {
        if tx.removed {
            return;
        }
        let m = &self.monitor;
        let Some((direction, label)) = m.classify(tx.from_address(), tx.to_address()) else {
            return;
        };
        let Some(hash) = tx.hash_b256() else {
            return;
        };
        let tx_hash = canonical_hash(hash);
        if m.already_processed(&tx_hash).await {
            return;
        }
        let value = tx.value_wei();
        if value <= m.eth_threshold_wei {
            return;
        }
        if m.vetoed_as_mev(hash).await {
            return;
        }

        m.emit(TransferAlert {
            label,
            direction,
            from: tx.from.clone().unwrap_or_default().to_lowercase(),
            to: tx.to.clone().unwrap_or_default().to_lowercase(),
            amount: wei_to_eth(value),
            currency: "ETH".to_string(),
            tx_hash,
            block_number: tx.block_number_u64() as i64,
        })
        .await;
    }
}

/// ERC-20 Transfer logs for one configured token contract.
pub struct Erc20TransferPlugin {
    monitor: Arc<TransferMonitor>,
    token: TokenConfig,
}

impl Erc20TransferPlugin {
    pub fn new(monitor: Arc<TransferMonitor>, token: TokenConfig) -> Self {
        Self { monitor, token }
    }
}

#[async_trait]
impl LogPlugin for Erc20TransferPlugin {
    fn from_contract(&self) -> Address {
        self.token.address
    }

    fn interested_topics(&self) -> Vec<B256> {
        vec![TRANSFER_TOPIC]
    }

    async fn accept_log(&self, log: &RpcLog) {
        if log.removed {
            return;
        }
        // Transfer(address indexed from, address indexed to, uint256 value)
        let (Some(from_topic), Some(to_topic)) = (log.topic(1), log.topic(2)) else {
            return;
        };
        let from = address_from_topic(from_topic);
        let to = address_from_topic(to_topic);

        let m = &self.monitor;
        let Some((direction, label)) = m.classify(Some(from), Some(to)) else {
            return;
        };
        let Some(hash) = log.tx_hash_b256() else {
            return;
        };
        let tx_hash = canonical_hash(hash);
        if m.already_processed(&tx_hash).await {
            return;
        }

        let data = log.data_bytes();
        let value = match crate::abi::decode_uint256(&data) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "transfers", error = %e, "Malformed Transfer data; skipping");
                return;
            }
        };
        if value <= self.token.threshold_units {
            return;
        }
        if m.vetoed_as_mev(hash).await {
            return;
        }

        let precision = token_display_precision(self.token.decimals);
        m.emit(TransferAlert {
            label,
            direction,
            from: canonical_address(from),
            to: canonical_address(to),
            amount: format_units(value, self.token.decimals, precision),
            currency: self.token.symbol.clone(),
            tx_hash,
            block_number: log.block_number_u64() as i64,
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_thresholds_scale_to_base_units() {
        let token = TokenConfig::from_entry(&WatchedTokenEntry {
            address: "0xdac17f958d2ee523a2206206994597c13d831ec7".into(),
            symbol: "USDT".into(),
            decimals: 6,
            threshold: 500_000,
        })
        .unwrap();
        assert_eq!(token.threshold_units, U256::from(500_000_000_000u64));
    }
}
