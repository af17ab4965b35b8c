// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Pure risk scoring: additive penalties clamped to 100, a deterministic
//! level from fixed thresholds, and textual flags for the audit trail.
//! Same input record, same output, always.

use crate::common::constants::{
    GEM_MARKET_CAP_CEILING_USD, HIGH_TAX_THRESHOLD_PCT, LOW_RISK_SCORE_THRESHOLD,
    MIN_LIQUIDITY_USD, RISK_SCORE_CONCENTRATED_HOLDING, RISK_SCORE_HIGH_TAX,
    RISK_SCORE_HONEYPOT, RISK_SCORE_NOT_RENOUNCED, RISK_SCORE_NO_LIQUIDITY,
    RISK_SCORE_UNVERIFIED, TOP10_HOLDING_THRESHOLD_PCT,
};
use crate::data::schema::{RiskLevel, TokenAnalysisRow};

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub flags: Vec<String>,
}

pub fn score_token(row: &TokenAnalysisRow) -> RiskAssessment {
    let mut score = 0.0;
    let mut flags = Vec::new();

    if !row.is_verified {
        score += RISK_SCORE_UNVERIFIED;
        flags.push("contract_unverified".to_string());
    }

    if row.is_honeypot {
        score += RISK_SCORE_HONEYPOT;
        flags.push(format!("honeypot:{}", row.honeypot_reason));
    }

    if row.buy_tax > HIGH_TAX_THRESHOLD_PCT {
        score += RISK_SCORE_HIGH_TAX;
        flags.push("high_buy_tax".to_string());
    }
    if row.sell_tax > HIGH_TAX_THRESHOLD_PCT {
        score += RISK_SCORE_HIGH_TAX;
        flags.push("high_sell_tax".to_string());
    }

    if row.top10_holding_pct > TOP10_HOLDING_THRESHOLD_PCT {
        score += RISK_SCORE_CONCENTRATED_HOLDING;
        flags.push("concentrated_holding".to_string());
    }

    if !row.has_liquidity {
        score += RISK_SCORE_NO_LIQUIDITY;
        flags.push("no_liquidity".to_string());
    } else if row.liquidity_usd < MIN_LIQUIDITY_USD {
        score += RISK_SCORE_NO_LIQUIDITY / 2.0;
        flags.push("low_liquidity".to_string());
    }

    if !row.is_ownership_renounced && !row.owner_address.is_empty() {
        score += RISK_SCORE_NOT_RENOUNCED;
        flags.push("ownership_not_renounced".to_string());
    }

    let score = score.min(100.0);
    RiskAssessment {
        score,
        level: level_of(score),
        flags,
    }
}

pub fn level_of(score: f64) -> RiskLevel {
    if score < 20.0 {
        RiskLevel::Low
    } else if score < 40.0 {
        RiskLevel::Medium
    } else if score < 70.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

pub fn is_low_risk(row: &TokenAnalysisRow) -> bool {
    row.risk_score < LOW_RISK_SCORE_THRESHOLD
}

pub fn is_potential_gem(row: &TokenAnalysisRow) -> bool {
    is_low_risk(row)
        && row.initial_market_cap > 0.0
        && row.initial_market_cap < GEM_MARKET_CAP_CEILING_USD
        && row.has_liquidity
        && row.liquidity_usd >= MIN_LIQUIDITY_USD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{SafetyStatus, TokenStatus};

    fn healthy_row() -> TokenAnalysisRow {
        TokenAnalysisRow {
            id: 1,
            token_address: "0xaa".into(),
            pair_address: "0xbb".into(),
            name: "Token".into(),
            symbol: "TKN".into(),
            decimals: 18,
            total_supply: "1000000".into(),
            has_liquidity: true,
            liquidity_usd: 20_000.0,
            initial_market_cap: 20_000.0,
            is_verified: true,
            is_honeypot: false,
            honeypot_reason: String::new(),
            buy_tax: 1.0,
            sell_tax: 1.0,
            holder_count: 100,
            top10_holding_pct: 10.0,
            owner_address: String::new(),
            is_ownership_renounced: true,
            risk_score: 0.0,
            risk_level: RiskLevel::Low,
            risk_flags: "[]".into(),
            status: TokenStatus::Analyzing,
            safety_status: SafetyStatus::Pending,
            pair_created_at: chrono::Utc::now().naive_utc(),
            liquidity_added_at: None,
            last_check_at: None,
            analyzed_at: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn healthy_token_scores_zero() {
        let assessment = score_token(&healthy_row());
        assert_eq!(assessment.score, 0.0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.flags.is_empty());
    }

    #[test]
    fn penalties_accumulate_and_clamp() {
        let mut row = healthy_row();
        row.is_verified = false; // +30
        row.is_honeypot = true; // +50
        row.honeypot_reason = "cannot sell".into();
        row.buy_tax = 15.0; // +20
        row.sell_tax = 15.0; // +20
        row.has_liquidity = false; // +40
        let assessment = score_token(&row);
        assert_eq!(assessment.score, 100.0);
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert!(assessment.flags.contains(&"honeypot:cannot sell".to_string()));
        assert!(assessment.flags.contains(&"no_liquidity".to_string()));
    }

    #[test]
    fn level_boundaries_are_exact() {
        assert_eq!(level_of(0.0), RiskLevel::Low);
        assert_eq!(level_of(19.99), RiskLevel::Low);
        assert_eq!(level_of(20.0), RiskLevel::Medium);
        assert_eq!(level_of(39.99), RiskLevel::Medium);
        assert_eq!(level_of(40.0), RiskLevel::High);
        assert_eq!(level_of(69.99), RiskLevel::High);
        assert_eq!(level_of(70.0), RiskLevel::Critical);
        assert_eq!(level_of(100.0), RiskLevel::Critical);
    }

    #[test]
    fn low_liquidity_is_half_penalty() {
        let mut row = healthy_row();
        row.liquidity_usd = 4_999.0;
        let assessment = score_token(&row);
        assert_eq!(assessment.score, 20.0);
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert_eq!(assessment.flags, vec!["low_liquidity"]);
    }

    #[test]
    fn unrenounced_ownership_needs_a_known_owner() {
        let mut row = healthy_row();
        row.is_ownership_renounced = false;
        // no owner address recorded: no penalty
        assert_eq!(score_token(&row).score, 0.0);

        row.owner_address = "0x1234".into();
        assert_eq!(score_token(&row).score, RISK_SCORE_NOT_RENOUNCED);
    }

    #[test]
    fn scoring_is_deterministic() {
        let row = {
            let mut r = healthy_row();
            r.is_verified = false;
            r.sell_tax = 12.0;
            r
        };
        let a = score_token(&row);
        let b = score_token(&row);
        assert_eq!(a, b);
    }

    #[test]
    fn gem_predicate_requires_liquidity_and_small_cap() {
        let mut row = healthy_row();
        row.risk_score = 10.0;
        assert!(is_potential_gem(&row));

        row.initial_market_cap = 150_000.0;
        assert!(!is_potential_gem(&row));

        row.initial_market_cap = 20_000.0;
        row.liquidity_usd = 4_000.0;
        assert!(!is_potential_gem(&row));

        row.liquidity_usd = 20_000.0;
        row.risk_score = 30.0; // not low risk anymore
        assert!(!is_potential_gem(&row));
    }
}
