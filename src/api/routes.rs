// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::api::ApiState;
use crate::api::error::ApiError;
use crate::api::response::{parse_limit, wrap};
use crate::data::schema::{RiskLevel, TokenStatus};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize, Default)]
pub struct TransferQuery {
    hash: Option<String>,
    address: Option<String>,
    start: Option<String>,
    end: Option<String>,
    limit: Option<String>,
}

/// GET /api/transfer-records
/// Filters, first match wins: hash, address, start+end date range, recent.
pub async fn transfer_records(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<TransferQuery>,
) -> Result<Response, ApiError> {
    let limit = parse_limit(params.limit.as_deref());

    if let Some(hash) = trimmed(&params.hash) {
        let record = state
            .db
            .transfer_by_tx_hash(&hash.to_lowercase())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("transfer {hash}")))?;
        return Ok(wrap(record).into_response());
    }
    if let Some(address) = trimmed(&params.address) {
        let records = state.db.transfers_by_address(address, limit).await?;
        return Ok(wrap(records).into_response());
    }
    if let (Some(start), Some(end)) = (trimmed(&params.start), trimmed(&params.end)) {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        let records = state
            .db
            .transfers_by_date_range(
                start.and_hms_opt(0, 0, 0).unwrap_or_default(),
                end.and_hms_opt(23, 59, 59).unwrap_or_default(),
                limit,
            )
            .await?;
        return Ok(wrap(records).into_response());
    }

    let records = state.db.recent_transfers(limit).await?;
    Ok(wrap(records).into_response())
}

#[derive(Deserialize, Default)]
pub struct NotificationQuery {
    hash: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    limit: Option<String>,
}

/// GET /api/notifications
pub async fn notifications(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<NotificationQuery>,
) -> Result<Response, ApiError> {
    let limit = parse_limit(params.limit.as_deref());

    if let Some(hash) = trimmed(&params.hash) {
        let entry = state
            .db
            .notification_by_tx_hash(&hash.to_lowercase())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("notification {hash}")))?;
        return Ok(wrap(entry).into_response());
    }
    if let Some(kind) = trimmed(&params.kind) {
        let entries = state.db.notifications_by_kind(kind, limit).await?;
        return Ok(wrap(entries).into_response());
    }

    let entries = state.db.recent_notifications(limit).await?;
    Ok(wrap(entries).into_response())
}

#[derive(Deserialize, Default)]
pub struct TokensQuery {
    address: Option<String>,
    status: Option<String>,
    risk_level: Option<String>,
    max_risk_score: Option<String>,
    pending_liquidity: Option<String>,
    date: Option<String>,
    limit: Option<String>,
}

/// GET /api/tokens
pub async fn tokens(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<TokensQuery>,
) -> Result<Response, ApiError> {
    let limit = parse_limit(params.limit.as_deref());

    if let Some(address) = trimmed(&params.address) {
        let token = state
            .db
            .token_by_address(&address.to_lowercase())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("token {address}")))?;
        return Ok(wrap(token).into_response());
    }
    if let Some(date) = trimmed(&params.date) {
        let stats = state.db.daily_token_stats(parse_date(date)?).await?;
        return Ok(wrap(stats).into_response());
    }
    if matches!(trimmed(&params.pending_liquidity), Some("1") | Some("true")) {
        let rows = state.db.pending_liquidity_tokens(limit).await?;
        return Ok(wrap(rows).into_response());
    }
    if let Some(raw) = trimmed(&params.max_risk_score) {
        let score: f64 = raw
            .parse()
            .map_err(|_| ApiError::InvalidParameter("invalid max_risk_score".into()))?;
        let rows = state.db.low_risk_tokens(score, limit).await?;
        return Ok(wrap(rows).into_response());
    }
    if let Some(raw) = trimmed(&params.status) {
        let status = TokenStatus::parse(raw)
            .ok_or_else(|| ApiError::InvalidParameter(format!("invalid status: {raw}")))?;
        let rows = state.db.tokens_by_status(status, limit).await?;
        return Ok(wrap(rows).into_response());
    }
    if let Some(raw) = trimmed(&params.risk_level) {
        let level = RiskLevel::parse(raw)
            .ok_or_else(|| ApiError::InvalidParameter(format!("invalid risk_level: {raw}")))?;
        let rows = state.db.tokens_by_risk_level(level, limit).await?;
        return Ok(wrap(rows).into_response());
    }

    let rows = state.db.recent_token_analyses(limit).await?;
    Ok(wrap(rows).into_response())
}

#[derive(Deserialize, Default)]
pub struct DeploymentsQuery {
    address: Option<String>,
    limit: Option<String>,
}

/// GET /api/deployments
pub async fn deployments(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<DeploymentsQuery>,
) -> Result<Response, ApiError> {
    let limit = parse_limit(params.limit.as_deref());

    if let Some(address) = trimmed(&params.address) {
        let deployment = state
            .db
            .deployment_by_address(&address.to_lowercase())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("deployment {address}")))?;
        return Ok(wrap(deployment).into_response());
    }

    let rows = state.db.recent_deployments(limit).await?;
    Ok(wrap(rows).into_response())
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::InvalidParameter("invalid date, use YYYY-MM-DD".into()))
}
