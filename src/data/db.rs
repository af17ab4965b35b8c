// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! SQLite-backed store. All pipeline mutation funnels through here; the
//! unique indexes arbitrate contending inserts, so a duplicate-key insert is
//! reported as `Ok(false)` and treated as idempotent success by callers.

use crate::common::constants::PENDING_LIQUIDITY_WINDOW_SECS;
use crate::common::error::AppError;
use crate::common::time::now_naive;
use crate::data::schema::{
    ContractDeploymentRow, NewContractDeployment, NewNotificationEntry, NewTokenAnalysis,
    NewTransferRecord, NotificationEntryRow, RiskLevel, TokenAnalysisRow, TokenStatus,
    TransferRecordRow,
};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqlitePoolOptions, SqliteQueryResult};
use sqlx::{Pool, Row, Sqlite};

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

fn insert_outcome(res: Result<SqliteQueryResult, sqlx::Error>) -> Result<bool, AppError> {
    match res {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, AppError> {
        // An in-memory database exists per connection; pooling more than one
        // would hand each task its own empty store.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect(database_url)
            .await
            .map_err(|e| AppError::Initialization(format!("DB connect failed: {}", e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Initialization(format!("DB migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    // ------------------------------------------------------------------
    // Transfer records
    // ------------------------------------------------------------------

    pub async fn insert_transfer_record(
        &self,
        record: &NewTransferRecord,
    ) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"
            INSERT INTO transfer_records
                (monitor_label, direction, from_address, to_address, amount,
                 currency, tx_hash, block_number, notified, notify_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.monitor_label)
        .bind(record.direction)
        .bind(&record.from_address)
        .bind(&record.to_address)
        .bind(&record.amount)
        .bind(&record.currency)
        .bind(&record.tx_hash)
        .bind(record.block_number)
        .bind(record.notified)
        .bind(&record.notify_status)
        .execute(&self.pool)
        .await;
        insert_outcome(res)
    }

    pub async fn transfer_by_tx_hash(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransferRecordRow>, AppError> {
        let row = sqlx::query_as::<_, TransferRecordRow>(
            "SELECT * FROM transfer_records WHERE tx_hash = ?",
        )
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn recent_transfers(&self, limit: i64) -> Result<Vec<TransferRecordRow>, AppError> {
        let rows = sqlx::query_as::<_, TransferRecordRow>(
            "SELECT * FROM transfer_records ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn transfers_by_address(
        &self,
        address: &str,
        limit: i64,
    ) -> Result<Vec<TransferRecordRow>, AppError> {
        let addr = address.to_lowercase();
        let rows = sqlx::query_as::<_, TransferRecordRow>(
            r#"
            SELECT * FROM transfer_records
            WHERE from_address = ? OR to_address = ?
            ORDER BY created_at DESC LIMIT ?
            "#,
        )
        .bind(&addr)
        .bind(&addr)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn transfers_by_date_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        limit: i64,
    ) -> Result<Vec<TransferRecordRow>, AppError> {
        let rows = sqlx::query_as::<_, TransferRecordRow>(
            r#"
            SELECT * FROM transfer_records
            WHERE created_at BETWEEN ? AND ?
            ORDER BY created_at DESC LIMIT ?
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Notification audit log
    // ------------------------------------------------------------------

    pub async fn insert_notification(
        &self,
        entry: &NewNotificationEntry,
    ) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"
            INSERT INTO notification_entries
                (kind, direction, from_address, to_address, amount, currency,
                 tx_hash, block_number, mev_type, confidence, content, status, error_msg)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.kind)
        .bind(entry.direction)
        .bind(&entry.from_address)
        .bind(&entry.to_address)
        .bind(&entry.amount)
        .bind(&entry.currency)
        .bind(&entry.tx_hash)
        .bind(entry.block_number)
        .bind(&entry.mev_type)
        .bind(entry.confidence)
        .bind(&entry.content)
        .bind(&entry.status)
        .bind(&entry.error_msg)
        .execute(&self.pool)
        .await;
        insert_outcome(res)
    }

    /// Dedup oracle: has any plugin already produced an alert for this tx?
    pub async fn notification_exists(&self, tx_hash: &str) -> Result<bool, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notification_entries WHERE tx_hash = ?")
                .bind(tx_hash)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    pub async fn notification_by_tx_hash(
        &self,
        tx_hash: &str,
    ) -> Result<Option<NotificationEntryRow>, AppError> {
        let row = sqlx::query_as::<_, NotificationEntryRow>(
            "SELECT * FROM notification_entries WHERE tx_hash = ?",
        )
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn recent_notifications(
        &self,
        limit: i64,
    ) -> Result<Vec<NotificationEntryRow>, AppError> {
        let rows = sqlx::query_as::<_, NotificationEntryRow>(
            "SELECT * FROM notification_entries ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn notifications_by_kind(
        &self,
        kind: &str,
        limit: i64,
    ) -> Result<Vec<NotificationEntryRow>, AppError> {
        let rows = sqlx::query_as::<_, NotificationEntryRow>(
            "SELECT * FROM notification_entries WHERE kind = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(kind)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Contract deployments
    // ------------------------------------------------------------------

    pub async fn insert_deployment(
        &self,
        deployment: &NewContractDeployment,
    ) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"
            INSERT INTO contract_deployments
                (contract_address, deployer_address, tx_hash, block_number, deployed_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&deployment.contract_address)
        .bind(&deployment.deployer_address)
        .bind(&deployment.tx_hash)
        .bind(deployment.block_number)
        .bind(deployment.deployed_at)
        .execute(&self.pool)
        .await;
        insert_outcome(res)
    }

    pub async fn deployment_by_address(
        &self,
        contract_address: &str,
    ) -> Result<Option<ContractDeploymentRow>, AppError> {
        let row = sqlx::query_as::<_, ContractDeploymentRow>(
            "SELECT * FROM contract_deployments WHERE contract_address = ?",
        )
        .bind(contract_address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn recent_deployments(
        &self,
        limit: i64,
    ) -> Result<Vec<ContractDeploymentRow>, AppError> {
        let rows = sqlx::query_as::<_, ContractDeploymentRow>(
            "SELECT * FROM contract_deployments ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Late classification once the delayed metadata probe has run.
    pub async fn mark_deployment_token(
        &self,
        contract_address: &str,
        is_token: bool,
        contract_type: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE contract_deployments SET is_token = ?, contract_type = ? WHERE contract_address = ?",
        )
        .bind(is_token)
        .bind(contract_type)
        .bind(contract_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Token analyses
    // ------------------------------------------------------------------

    /// Seed a fresh pipeline row. Defaults (PENDING_LIQUIDITY, risk 50,
    /// level unknown) come from the schema.
    pub async fn insert_token_analysis(
        &self,
        token: &NewTokenAnalysis,
    ) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"
            INSERT INTO token_analyses (token_address, pair_address, pair_created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&token.token_address)
        .bind(&token.pair_address)
        .bind(token.pair_created_at)
        .execute(&self.pool)
        .await;
        insert_outcome(res)
    }

    pub async fn token_by_address(
        &self,
        token_address: &str,
    ) -> Result<Option<TokenAnalysisRow>, AppError> {
        let row = sqlx::query_as::<_, TokenAnalysisRow>(
            "SELECT * FROM token_analyses WHERE token_address = ?",
        )
        .bind(token_address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_token_analysis(&self, row: &TokenAnalysisRow) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE token_analyses SET
                name = ?, symbol = ?, decimals = ?, total_supply = ?,
                has_liquidity = ?, liquidity_usd = ?, initial_market_cap = ?,
                is_verified = ?, is_honeypot = ?, honeypot_reason = ?,
                buy_tax = ?, sell_tax = ?, holder_count = ?, top10_holding_pct = ?,
                owner_address = ?, is_ownership_renounced = ?,
                risk_score = ?, risk_level = ?, risk_flags = ?,
                status = ?, safety_status = ?,
                liquidity_added_at = ?, last_check_at = ?, analyzed_at = ?
            WHERE token_address = ?
            "#,
        )
        .bind(&row.name)
        .bind(&row.symbol)
        .bind(row.decimals)
        .bind(&row.total_supply)
        .bind(row.has_liquidity)
        .bind(row.liquidity_usd)
        .bind(row.initial_market_cap)
        .bind(row.is_verified)
        .bind(row.is_honeypot)
        .bind(&row.honeypot_reason)
        .bind(row.buy_tax)
        .bind(row.sell_tax)
        .bind(row.holder_count)
        .bind(row.top10_holding_pct)
        .bind(&row.owner_address)
        .bind(row.is_ownership_renounced)
        .bind(row.risk_score)
        .bind(row.risk_level)
        .bind(&row.risk_flags)
        .bind(row.status)
        .bind(row.safety_status)
        .bind(row.liquidity_added_at)
        .bind(row.last_check_at)
        .bind(row.analyzed_at)
        .bind(&row.token_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Liquidity-scan work set: young PENDING_LIQUIDITY rows, oldest first.
    /// Rows older than the pending window fall out of rotation.
    pub async fn pending_liquidity_tokens(
        &self,
        limit: i64,
    ) -> Result<Vec<TokenAnalysisRow>, AppError> {
        let cutoff = now_naive() - chrono::Duration::seconds(PENDING_LIQUIDITY_WINDOW_SECS);
        let rows = sqlx::query_as::<_, TokenAnalysisRow>(
            r#"
            SELECT * FROM token_analyses
            WHERE status = 'PENDING_LIQUIDITY' AND pair_created_at > ?
            ORDER BY pair_created_at ASC LIMIT ?
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Safety-scan work set: rows awaiting their first probe plus rows the
    /// probe could not classify yet.
    pub async fn tokens_for_safety_check(
        &self,
        limit: i64,
    ) -> Result<Vec<TokenAnalysisRow>, AppError> {
        let rows = sqlx::query_as::<_, TokenAnalysisRow>(
            r#"
            SELECT * FROM token_analyses
            WHERE status = 'ANALYZING'
               OR (status = 'MONITORING' AND safety_status = 'RETRY_NEEDED')
            ORDER BY pair_created_at ASC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn tokens_by_status(
        &self,
        status: TokenStatus,
        limit: i64,
    ) -> Result<Vec<TokenAnalysisRow>, AppError> {
        let rows = sqlx::query_as::<_, TokenAnalysisRow>(
            "SELECT * FROM token_analyses WHERE status = ? ORDER BY pair_created_at DESC LIMIT ?",
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn tokens_by_risk_level(
        &self,
        risk_level: RiskLevel,
        limit: i64,
    ) -> Result<Vec<TokenAnalysisRow>, AppError> {
        let rows = sqlx::query_as::<_, TokenAnalysisRow>(
            "SELECT * FROM token_analyses WHERE risk_level = ? ORDER BY analyzed_at DESC LIMIT ?",
        )
        .bind(risk_level)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn low_risk_tokens(
        &self,
        max_risk_score: f64,
        limit: i64,
    ) -> Result<Vec<TokenAnalysisRow>, AppError> {
        let rows = sqlx::query_as::<_, TokenAnalysisRow>(
            "SELECT * FROM token_analyses WHERE risk_score <= ? ORDER BY analyzed_at DESC LIMIT ?",
        )
        .bind(max_risk_score)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn recent_token_analyses(
        &self,
        limit: i64,
    ) -> Result<Vec<TokenAnalysisRow>, AppError> {
        let rows = sqlx::query_as::<_, TokenAnalysisRow>(
            "SELECT * FROM token_analyses ORDER BY analyzed_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn daily_token_stats(&self, date: NaiveDate) -> Result<serde_json::Value, AppError> {
        let start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let end = start + chrono::Duration::days(1);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM token_analyses WHERE analyzed_at BETWEEN ? AND ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT risk_level, COUNT(*) as count FROM token_analyses
            WHERE analyzed_at BETWEEN ? AND ?
            GROUP BY risk_level
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        let mut distribution = serde_json::Map::new();
        for row in rows {
            let level: String = row.get("risk_level");
            let count: i64 = row.get("count");
            distribution.insert(level, serde_json::json!(count));
        }

        let honeypot_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM token_analyses WHERE analyzed_at BETWEEN ? AND ? AND is_honeypot = TRUE",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(serde_json::json!({
            "date": date.to_string(),
            "total": total,
            "risk_distribution": distribution,
            "honeypot_count": honeypot_count,
        }))
    }
}
