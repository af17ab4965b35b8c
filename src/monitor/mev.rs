// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Heuristic MEV screening. The detector is a consulted oracle: its only
//! job is to veto alerts on obvious bot activity, not to be sound. Checks
//! run in a fixed order; every positive check contributes evidence, the
//! highest confidence wins and ties keep the earlier verdict.

use crate::common::constants::{
    BOT_ADDRESS_ZERO_PREFIX_LEN, FAILED_TX_GAS_FLOOR, HIGH_GAS_THRESHOLD_WEI, KNOWN_MEV_BOTS,
    SANDWICH_TRANSFER_LOG_FLOOR, TRANSFER_TOPIC,
};
use crate::common::error::AppError;
use crate::common::parsing::wei_to_gwei;
use crate::network::rpc::{RpcBlock, RpcClient, RpcReceipt, RpcTransaction};
use alloy::primitives::B256;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MevType {
    None,
    KnownBot,
    PatternMatch,
    HighGas,
    Sandwich,
    FrontRun,
}

impl MevType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MevType::None => "none",
            MevType::KnownBot => "known_bot",
            MevType::PatternMatch => "pattern_match",
            MevType::HighGas => "high_gas",
            MevType::Sandwich => "sandwich",
            MevType::FrontRun => "front_run",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MevVerdict {
    pub is_mev: bool,
    pub mev_type: MevType,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

impl MevVerdict {
    fn clean() -> Self {
        Self {
            is_mev: false,
            mev_type: MevType::None,
            confidence: 0.0,
            evidence: Vec::new(),
        }
    }

    /// Record a positive check. Type changes only when this check's
    /// confidence beats everything seen so far (or it is the first hit);
    /// passing `None` contributes confidence without touching the type.
    fn apply(&mut self, mev_type: Option<MevType>, confidence: f64, note: String) {
        self.evidence.push(note);
        let first = !self.is_mev;
        self.is_mev = true;
        if confidence > self.confidence {
            self.confidence = confidence;
            if let Some(t) = mev_type {
                self.mev_type = t;
            }
        } else if first && let Some(t) = mev_type {
            self.mev_type = t;
        }
    }
}

/// Verdict oracle consulted by the transfer gate. Trait-shaped so tests can
/// substitute a canned implementation.
#[async_trait]
pub trait MevOracle: Send + Sync {
    async fn assess(&self, tx_hash: B256) -> Result<MevVerdict, AppError>;
}

pub struct MevDetector {
    rpc: Arc<RpcClient>,
}

impl MevDetector {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl MevOracle for MevDetector {
    async fn assess(&self, tx_hash: B256) -> Result<MevVerdict, AppError> {
        let receipt = self.rpc.receipt(tx_hash).await?;
        let block_number = receipt
            .block_number
            .as_deref()
            .and_then(crate::common::parsing::parse_u64_hex)
            .ok_or_else(|| AppError::Decode("receipt missing block number".into()))?;
        let block = self.rpc.block_by_number(block_number).await?;

        let tx = receipt
            .index_u64()
            .and_then(|idx| block.transactions.get(idx as usize))
            .filter(|tx| tx.hash_b256() == Some(tx_hash))
            .or_else(|| {
                block
                    .transactions
                    .iter()
                    .find(|tx| tx.hash_b256() == Some(tx_hash))
            })
            .ok_or_else(|| AppError::NotFound(format!("tx {tx_hash:#x} in block {block_number}")))?;

        Ok(evaluate(tx, &receipt, &block))
    }
}

/// Run the full heuristic battery over one mined transaction.
pub fn evaluate(tx: &RpcTransaction, receipt: &RpcReceipt, block: &RpcBlock) -> MevVerdict {
    let mut verdict = MevVerdict::clean();
    check_known_bots(tx, &mut verdict);
    check_address_pattern(tx, &mut verdict);
    check_high_gas_price(tx, receipt, &mut verdict);
    check_sandwich_adjacency(tx, receipt, block, &mut verdict);
    check_front_run_gas(tx, block, &mut verdict);
    check_internal_transfer_fanout(receipt, &mut verdict);
    check_failed_but_executed(receipt, &mut verdict);
    verdict
}

fn check_known_bots(tx: &RpcTransaction, verdict: &mut MevVerdict) {
    if let Some(from) = tx.from_address()
        && let Some(name) = KNOWN_MEV_BOTS.get(&from)
    {
        verdict.apply(
            Some(MevType::KnownBot),
            0.95,
            format!("sender is known MEV operator: {name}"),
        );
        return;
    }
    if let Some(to) = tx.to_address()
        && let Some(name) = KNOWN_MEV_BOTS.get(&to)
    {
        verdict.apply(
            Some(MevType::KnownBot),
            0.9,
            format!("recipient is known MEV operator: {name}"),
        );
    }
}

fn check_address_pattern(tx: &RpcTransaction, verdict: &mut MevVerdict) {
    let Some(from) = tx.from_address() else {
        return;
    };
    let hex = format!("{from:x}");
    if hex
        .bytes()
        .take(BOT_ADDRESS_ZERO_PREFIX_LEN)
        .all(|b| b == b'0')
    {
        verdict.apply(
            Some(MevType::PatternMatch),
            0.75,
            "sender address has a bot-style all-zero prefix".to_string(),
        );
    }
}

fn check_high_gas_price(tx: &RpcTransaction, receipt: &RpcReceipt, verdict: &mut MevVerdict) {
    let Some(gas_price) = receipt.effective_gas_price_wei().or_else(|| tx.gas_price_wei()) else {
        return;
    };
    if gas_price > HIGH_GAS_THRESHOLD_WEI {
        verdict.apply(
            Some(MevType::HighGas),
            0.6,
            format!("abnormal gas price: {:.2} gwei", wei_to_gwei(gas_price)),
        );
    }
}

fn check_sandwich_adjacency(
    tx: &RpcTransaction,
    receipt: &RpcReceipt,
    block: &RpcBlock,
    verdict: &mut MevVerdict,
) {
    let Some(idx) = receipt.index_u64().map(|i| i as usize) else {
        return;
    };
    if idx == 0 || idx + 1 >= block.transactions.len() {
        return;
    }
    let prev = &block.transactions[idx - 1];
    let next = &block.transactions[idx + 1];

    let (Some(prev_from), Some(next_from)) = (prev.from_address(), next.from_address()) else {
        return;
    };
    let (Some(prev_to), Some(tx_to), Some(next_to)) =
        (prev.to_address(), tx.to_address(), next.to_address())
    else {
        return;
    };
    if prev_from == next_from && prev_to == tx_to && next_to == tx_to {
        verdict.apply(
            Some(MevType::Sandwich),
            0.8,
            format!("bracketed by two transactions from {prev_from:#x} against the same contract"),
        );
    }
}

fn check_front_run_gas(tx: &RpcTransaction, block: &RpcBlock, verdict: &mut MevVerdict) {
    let Some(tx_gas) = tx.gas_price_wei() else {
        return;
    };
    let mut total: u128 = 0;
    let mut count: u128 = 0;
    for block_tx in &block.transactions {
        if let Some(price) = block_tx.gas_price_wei() {
            total += price;
            count += 1;
        }
    }
    if count == 0 {
        return;
    }
    let mean = total / count;
    if mean > 0 && tx_gas >= mean * 2 {
        verdict.apply(
            Some(MevType::FrontRun),
            0.7,
            "gas price is at least twice the block average".to_string(),
        );
    }
}

fn check_internal_transfer_fanout(receipt: &RpcReceipt, verdict: &mut MevVerdict) {
    let transfer_count = receipt
        .logs
        .iter()
        .filter(|log| log.topic0() == Some(TRANSFER_TOPIC))
        .count();
    if transfer_count >= SANDWICH_TRANSFER_LOG_FLOOR {
        let mev_type = if verdict.is_mev {
            None
        } else {
            Some(MevType::Sandwich)
        };
        verdict.apply(
            mev_type,
            0.7,
            format!("{transfer_count} Transfer events in one receipt"),
        );
    }
}

fn check_failed_but_executed(receipt: &RpcReceipt, verdict: &mut MevVerdict) {
    if !receipt.succeeded() && receipt.gas_used_u64() > FAILED_TX_GAS_FLOOR {
        verdict.apply(
            None,
            0.65,
            format!(
                "transaction reverted after burning {} gas",
                receipt.gas_used_u64()
            ),
        );
    }
}
