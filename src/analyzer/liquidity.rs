// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Pair reserve probing and USD valuation. Pool depth is quoted double-sided:
//! the WETH reserve priced with a flat ETH/USD constant, times two, on the
//! constant-product assumption that both sides hold equal value.

use crate::abi::{SEL_GET_RESERVES, SEL_TOKEN0, decode_address, decode_reserves};
use crate::common::constants::WETH_MAINNET;
use crate::common::error::AppError;
use crate::network::rpc::RpcClient;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquiditySnapshot {
    pub liquidity_usd: f64,
    pub eth_reserve: f64,
}

#[async_trait]
pub trait PairLiquiditySource: Send + Sync {
    async fn probe_pair(&self, pair: Address) -> Result<LiquiditySnapshot, AppError>;
}

pub struct LiquidityProbe {
    rpc: Arc<RpcClient>,
    weth: Address,
    eth_price_usd: f64,
}

impl LiquidityProbe {
    pub fn new(rpc: Arc<RpcClient>, eth_price_usd: f64) -> Self {
        Self {
            rpc,
            weth: WETH_MAINNET,
            eth_price_usd,
        }
    }
}

#[async_trait]
impl PairLiquiditySource for LiquidityProbe {
    async fn probe_pair(&self, pair: Address) -> Result<LiquiditySnapshot, AppError> {
        let reserves_raw = self.rpc.call(pair, &SEL_GET_RESERVES).await?;
        let reserves = decode_reserves(&reserves_raw)?;

        let token0_raw = self.rpc.call(pair, &SEL_TOKEN0).await?;
        let token0 = decode_address(&token0_raw)?;

        // The pair was admitted because one side is WETH; if token0 isn't,
        // token1 must be.
        let weth_reserve = if token0 == self.weth {
            reserves.reserve0
        } else {
            reserves.reserve1
        };

        let eth_reserve = u256_to_f64(weth_reserve) / 1e18;
        Ok(LiquiditySnapshot {
            liquidity_usd: eth_reserve * self.eth_price_usd * 2.0,
            eth_reserve,
        })
    }
}

/// Reserves are uint112 on the wire, so the u128 conversion is lossless.
fn u256_to_f64(value: U256) -> f64 {
    value.try_into().map(|v: u128| v as f64).unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_conversion_handles_reserve_scale() {
        let five_eth = U256::from(5_000_000_000_000_000_000u64);
        assert_eq!(u256_to_f64(five_eth), 5e18);
        // 5 ETH at $2500, both sides: $25k
        assert_eq!(u256_to_f64(five_eth) / 1e18 * 2500.0 * 2.0, 25_000.0);
    }
}
