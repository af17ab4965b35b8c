// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Liquidity scan: probe reserves for PENDING_LIQUIDITY tokens, value the
//! pool in USD and either promote to ANALYZING, keep waiting, or write the
//! token off once the pending window has elapsed. Probe failures leave the
//! row untouched for the next pass.

use crate::analyzer::liquidity::PairLiquiditySource;
use crate::analyzer::token_info::TokenMetadataSource;
use crate::common::constants::{LIQUIDITY_SCAN_BATCH, PENDING_LIQUIDITY_WINDOW_SECS};
use crate::common::parsing::{canonical_address, parse_address_hex};
use crate::common::time::now_naive;
use crate::data::db::Database;
use crate::data::schema::{TokenAnalysisRow, TokenStatus};
use std::sync::Arc;

pub struct LiquidityScanner {
    db: Database,
    liquidity: Arc<dyn PairLiquiditySource>,
    token_reader: Arc<dyn TokenMetadataSource>,
    min_liquidity_usd: f64,
}

impl LiquidityScanner {
    pub fn new(
        db: Database,
        liquidity: Arc<dyn PairLiquiditySource>,
        token_reader: Arc<dyn TokenMetadataSource>,
        min_liquidity_usd: f64,
    ) -> Self {
        Self {
            db,
            liquidity,
            token_reader,
            min_liquidity_usd,
        }
    }

    pub async fn run_once(&self) {
        let tokens = match self.db.pending_liquidity_tokens(LIQUIDITY_SCAN_BATCH).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(target: "liquidity", error = %e, "Failed to load pending tokens");
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }
        tracing::info!(target: "liquidity", pending = tokens.len(), "Scanning pair liquidity");

        for token in tokens {
            self.scan_token(token).await;
        }
    }

    /// Probe one row and apply the resulting transition.
    pub async fn scan_token(&self, mut row: TokenAnalysisRow) {
        let Some(pair) = parse_address_hex(&row.pair_address) else {
            tracing::warn!(target: "liquidity", token = %row.token_address, "Invalid pair address on row");
            return;
        };

        let snapshot = match self.liquidity.probe_pair(pair).await {
            Ok(s) => s,
            Err(e) => {
                // Transport and malformed-return failures alike: leave the
                // row for the next tick.
                tracing::warn!(
                    target: "liquidity",
                    token = %row.token_address,
                    error = %e,
                    "Reserve probe failed"
                );
                return;
            }
        };

        let now = now_naive();
        row.last_check_at = Some(now);
        row.liquidity_usd = snapshot.liquidity_usd;

        if snapshot.liquidity_usd < self.min_liquidity_usd {
            let age = now - row.pair_created_at;
            if age.num_seconds() > PENDING_LIQUIDITY_WINDOW_SECS {
                if row.advance_status(TokenStatus::Rejected) {
                    row.push_risk_flag("timeout_no_liquidity");
                    tracing::info!(
                        target: "liquidity",
                        token = %row.token_address,
                        symbol = %row.symbol,
                        "No liquidity within the window; token written off"
                    );
                }
            } else if snapshot.liquidity_usd > 100.0 {
                tracing::debug!(
                    target: "liquidity",
                    token = %row.token_address,
                    usd = snapshot.liquidity_usd,
                    "Liquidity present but below threshold"
                );
            }
            if let Err(e) = self.db.update_token_analysis(&row).await {
                tracing::error!(target: "liquidity", error = %e, "Failed to update token row");
            }
            return;
        }

        // Threshold met (inclusive): promote.
        row.has_liquidity = true;
        row.liquidity_added_at = Some(now);
        // Rough estimate assuming fully circulating supply.
        row.initial_market_cap = snapshot.liquidity_usd;

        if let Some(token_addr) = parse_address_hex(&row.token_address) {
            match self.token_reader.read_token_info(token_addr).await {
                Ok(info) if info.is_valid => {
                    row.name = info.name;
                    row.symbol = info.symbol;
                    row.decimals = info.decimals as i64;
                    row.total_supply = info
                        .total_supply
                        .map(|s| s.to_string())
                        .unwrap_or_default();
                    if let Some(owner) = info.owner {
                        row.owner_address = canonical_address(owner);
                        row.is_ownership_renounced = false;
                    }
                }
                Ok(_) | Err(_) => {
                    // Metadata can lag liquidity; promote anyway and let the
                    // safety pass retry the reads indirectly.
                    tracing::warn!(
                        target: "liquidity",
                        token = %row.token_address,
                        "Token metadata read failed or incomplete"
                    );
                }
            }
        }

        row.advance_status(TokenStatus::Analyzing);
        tracing::info!(
            target: "liquidity",
            token = %row.token_address,
            symbol = %row.symbol,
            liquidity_usd = snapshot.liquidity_usd,
            eth_reserve = snapshot.eth_reserve,
            "Liquidity threshold met; token promoted for safety analysis"
        );

        if let Err(e) = self.db.update_token_analysis(&row).await {
            tracing::error!(target: "liquidity", error = %e, "Failed to update token row");
        }
    }
}
