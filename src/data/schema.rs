// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of a token picked up from a PairCreated event. Transitions only
/// move forward: PENDING_LIQUIDITY -> ANALYZING -> {MONITORING, REJECTED},
/// with MONITORING allowed to re-enter itself while a retry is pending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    PendingLiquidity,
    Analyzing,
    Monitoring,
    Rejected,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::PendingLiquidity => "PENDING_LIQUIDITY",
            TokenStatus::Analyzing => "ANALYZING",
            TokenStatus::Monitoring => "MONITORING",
            TokenStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING_LIQUIDITY" => Some(TokenStatus::PendingLiquidity),
            "ANALYZING" => Some(TokenStatus::Analyzing),
            "MONITORING" => Some(TokenStatus::Monitoring),
            "REJECTED" => Some(TokenStatus::Rejected),
            _ => None,
        }
    }

    /// Whether `next` is reachable from `self` in the status DAG.
    pub fn may_transition(self, next: TokenStatus) -> bool {
        use TokenStatus::*;
        matches!(
            (self, next),
            (PendingLiquidity, Analyzing)
                | (PendingLiquidity, Rejected)
                | (Analyzing, Monitoring)
                | (Analyzing, Rejected)
                | (Monitoring, Monitoring)
                | (Monitoring, Rejected)
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyStatus {
    Pending,
    RetryNeeded,
    Completed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl RiskLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            "unknown" => Some(RiskLevel::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
            RiskLevel::Unknown => "unknown",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Audit row for a transfer that cleared every gate. One row per tx hash,
/// enforced by the unique index.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TransferRecordRow {
    pub id: i64,
    pub monitor_label: String,
    pub direction: Direction,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub currency: String,
    pub tx_hash: String,
    pub block_number: i64,
    pub notified: bool,
    pub notify_status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTransferRecord {
    pub monitor_label: String,
    pub direction: Direction,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub currency: String,
    pub tx_hash: String,
    pub block_number: i64,
    pub notified: bool,
    pub notify_status: String,
}

/// One row per outbound-alert attempt. The unique tx_hash index is the
/// cross-plugin dedup oracle.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationEntryRow {
    pub id: i64,
    pub kind: String,
    pub direction: Option<Direction>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub tx_hash: Option<String>,
    pub block_number: Option<i64>,
    pub mev_type: Option<String>,
    pub confidence: Option<f64>,
    pub content: Option<String>,
    pub status: String,
    pub error_msg: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewNotificationEntry {
    pub kind: String,
    pub direction: Option<Direction>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub tx_hash: Option<String>,
    pub block_number: Option<i64>,
    pub mev_type: Option<String>,
    pub confidence: Option<f64>,
    pub content: Option<String>,
    pub status: String,
    pub error_msg: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContractDeploymentRow {
    pub id: i64,
    pub contract_address: String,
    pub deployer_address: String,
    pub tx_hash: String,
    pub block_number: i64,
    pub deployed_at: NaiveDateTime,
    pub is_token: bool,
    pub contract_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewContractDeployment {
    pub contract_address: String,
    pub deployer_address: String,
    pub tx_hash: String,
    pub block_number: i64,
    pub deployed_at: NaiveDateTime,
}

/// The token pipeline's state-machine record. Loaded by the scanners,
/// mutated in place and written back through `Database::update_token_analysis`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TokenAnalysisRow {
    pub id: i64,
    pub token_address: String,
    pub pair_address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: i64,
    pub total_supply: String,
    pub has_liquidity: bool,
    pub liquidity_usd: f64,
    pub initial_market_cap: f64,
    pub is_verified: bool,
    pub is_honeypot: bool,
    pub honeypot_reason: String,
    pub buy_tax: f64,
    pub sell_tax: f64,
    pub holder_count: i64,
    pub top10_holding_pct: f64,
    pub owner_address: String,
    pub is_ownership_renounced: bool,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_flags: String,
    pub status: TokenStatus,
    pub safety_status: SafetyStatus,
    pub pair_created_at: NaiveDateTime,
    pub liquidity_added_at: Option<NaiveDateTime>,
    pub last_check_at: Option<NaiveDateTime>,
    pub analyzed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl TokenAnalysisRow {
    pub fn risk_flags_vec(&self) -> Vec<String> {
        serde_json::from_str(&self.risk_flags).unwrap_or_default()
    }

    pub fn set_risk_flags(&mut self, flags: &[String]) {
        self.risk_flags = serde_json::to_string(flags).unwrap_or_else(|_| "[]".into());
    }

    pub fn push_risk_flag(&mut self, flag: &str) {
        let mut flags = self.risk_flags_vec();
        if !flags.iter().any(|f| f == flag) {
            flags.push(flag.to_string());
        }
        self.set_risk_flags(&flags);
    }

    /// Advance the lifecycle if the DAG permits it. Illegal moves are
    /// rejected so a replayed scan can never walk a row backwards.
    pub fn advance_status(&mut self, next: TokenStatus) -> bool {
        if self.status == next && next != TokenStatus::Monitoring {
            return true;
        }
        if self.status.may_transition(next) {
            self.status = next;
            return true;
        }
        tracing::warn!(
            token = %self.token_address,
            from = self.status.as_str(),
            to = next.as_str(),
            "Rejected illegal token status transition"
        );
        false
    }
}

#[derive(Debug, Clone)]
pub struct NewTokenAnalysis {
    pub token_address: String,
    pub pair_address: String,
    pub pair_created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_dag_is_forward_only() {
        use TokenStatus::*;
        assert!(PendingLiquidity.may_transition(Analyzing));
        assert!(Analyzing.may_transition(Monitoring));
        assert!(Analyzing.may_transition(Rejected));
        assert!(Monitoring.may_transition(Monitoring));
        assert!(Monitoring.may_transition(Rejected));

        assert!(!Analyzing.may_transition(PendingLiquidity));
        assert!(!Monitoring.may_transition(Analyzing));
        assert!(!Rejected.may_transition(Monitoring));
        assert!(!Rejected.may_transition(Rejected));
    }

    #[test]
    fn risk_flags_round_trip_and_dedup() {
        let mut row = sample_row();
        row.push_risk_flag("timeout_no_liquidity");
        row.push_risk_flag("timeout_no_liquidity");
        assert_eq!(row.risk_flags_vec(), vec!["timeout_no_liquidity"]);
    }

    fn sample_row() -> TokenAnalysisRow {
        TokenAnalysisRow {
            id: 1,
            token_address: "0x00".into(),
            pair_address: "0x01".into(),
            name: String::new(),
            symbol: String::new(),
            decimals: 18,
            total_supply: String::new(),
            has_liquidity: false,
            liquidity_usd: 0.0,
            initial_market_cap: 0.0,
            is_verified: false,
            is_honeypot: false,
            honeypot_reason: String::new(),
            buy_tax: 0.0,
            sell_tax: 0.0,
            holder_count: 0,
            top10_holding_pct: 0.0,
            owner_address: String::new(),
            is_ownership_renounced: false,
            risk_score: 50.0,
            risk_level: RiskLevel::Unknown,
            risk_flags: "[]".into(),
            status: TokenStatus::PendingLiquidity,
            safety_status: SafetyStatus::Pending,
            pair_created_at: chrono::Utc::now().naive_utc(),
            liquidity_added_at: None,
            last_check_at: None,
            analyzed_at: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}
