// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Safety scan: run the external risk probe over ANALYZING tokens (and
//! MONITORING tokens still waiting on a retry), score the result and settle
//! each row into MONITORING or REJECTED. "Not indexed yet" parks the row in
//! MONITORING with a retry marker instead of guessing either way.

use crate::analyzer::honeypot::SafetyProbe;
use crate::analyzer::risk;
use crate::common::constants::SAFETY_SCAN_BATCH;
use crate::common::error::AppError;
use crate::common::parsing::parse_address_hex;
use crate::common::time::now_naive;
use crate::data::db::Database;
use crate::data::schema::{RiskLevel, SafetyStatus, TokenAnalysisRow, TokenStatus};
use crate::notify::NotificationService;
use std::sync::Arc;

pub struct SafetyScanner {
    db: Database,
    probe: Arc<dyn SafetyProbe>,
    notifications: Arc<NotificationService>,
}

impl SafetyScanner {
    pub fn new(
        db: Database,
        probe: Arc<dyn SafetyProbe>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db,
            probe,
            notifications,
        }
    }

    pub async fn run_once(&self) {
        let tokens = match self.db.tokens_for_safety_check(SAFETY_SCAN_BATCH).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(target: "safety", error = %e, "Failed to load tokens for safety check");
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }
        tracing::info!(target: "safety", count = tokens.len(), "Running safety analysis");

        for token in tokens {
            self.scan_token(token).await;
        }
    }

    /// Probe one row and apply the resulting transition.
    pub async fn scan_token(&self, mut row: TokenAnalysisRow) {
        let Some(token) = parse_address_hex(&row.token_address) else {
            tracing::warn!(target: "safety", token = %row.token_address, "Invalid token address on row");
            return;
        };
        let old_status = row.status;
        let old_safety_status = row.safety_status;

        let should_notify = match self.probe.check_token(token).await {
            Err(AppError::NotFound(reason)) => {
                // Too new for the risk APIs: park in MONITORING, flag for
                // retry, and explicitly refuse to call it safe or honeypot.
                row.advance_status(TokenStatus::Monitoring);
                row.safety_status = SafetyStatus::RetryNeeded;
                row.risk_level = RiskLevel::Unknown;
                row.honeypot_reason = reason;
                tracing::info!(
                    target: "safety",
                    token = %row.token_address,
                    symbol = %row.symbol,
                    "Risk data not available yet; monitoring with retry"
                );
                old_status == TokenStatus::Analyzing
            }
            Err(e) => {
                // Transport-class failure: leave the row untouched entirely.
                tracing::warn!(
                    target: "safety",
                    token = %row.token_address,
                    error = %e,
                    "Safety probe failed; will retry"
                );
                return;
            }
            Ok(report) => {
                row.is_honeypot = report.is_honeypot;
                row.honeypot_reason = report.reason;
                row.buy_tax = report.buy_tax;
                row.sell_tax = report.sell_tax;

                let assessment = risk::score_token(&row);
                row.risk_score = assessment.score;
                row.risk_level = assessment.level;
                row.set_risk_flags(&assessment.flags);

                if row.is_honeypot || row.risk_level == RiskLevel::Critical {
                    row.advance_status(TokenStatus::Rejected);
                    row.safety_status = SafetyStatus::Completed;
                    tracing::info!(
                        target: "safety",
                        token = %row.token_address,
                        symbol = %row.symbol,
                        reason = %row.honeypot_reason,
                        "High-risk or honeypot token rejected"
                    );
                    false
                } else {
                    row.advance_status(TokenStatus::Monitoring);
                    row.safety_status = SafetyStatus::Completed;
                    if old_status == TokenStatus::Monitoring
                        && old_safety_status == SafetyStatus::RetryNeeded
                    {
                        tracing::info!(
                            target: "safety",
                            token = %row.token_address,
                            symbol = %row.symbol,
                            "Retry succeeded; token cleared"
                        );
                    } else {
                        tracing::info!(
                            target: "safety",
                            token = %row.token_address,
                            symbol = %row.symbol,
                            score = row.risk_score,
                            "Token passed safety screening"
                        );
                    }
                    // Announce only on the first ANALYZING -> MONITORING hop.
                    old_status == TokenStatus::Analyzing
                }
            }
        };

        row.analyzed_at = Some(now_naive());
        if let Err(e) = self.db.update_token_analysis(&row).await {
            tracing::error!(target: "safety", error = %e, "Failed to update token analysis");
            return;
        }

        if should_notify
            && let Err(e) = self.notifications.notify_token_listed(&row).await
        {
            tracing::error!(target: "safety", error = %e, "Failed to send new-token alert");
        }
    }
}
