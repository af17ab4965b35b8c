// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Outbound alerting. One small provider trait, two webhook providers, and
//! the audit service that records every delivery attempt. Delivery failures
//! never abort the pipeline; they land in the audit log as `failed`.

use crate::common::error::AppError;
use crate::data::db::Database;
use crate::data::schema::{Direction, NewNotificationEntry, NewTransferRecord, TokenAnalysisRow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const NOTIFIER_TIMEOUT_SECS: u64 = 10;
const PUSHPLUS_URL: &str = "http://www.pushplus.plus/send";

#[async_trait]
pub trait Notifier: Send + Sync {
    fn provider(&self) -> &'static str;
    async fn send(&self, title: &str, content: &str) -> Result<(), AppError>;
}

/// PushPlus: bearer-token-in-body HTTP POST, markdown template.
pub struct PushPlusNotifier {
    token: String,
    client: Client,
}

#[derive(Deserialize)]
struct PushPlusResponse {
    code: i64,
    #[serde(default)]
    msg: String,
}

impl PushPlusNotifier {
    pub fn new(token: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(NOTIFIER_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Initialization(format!("PushPlus client init failed: {e}")))?;
        Ok(Self {
            token: token.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Notifier for PushPlusNotifier {
    fn provider(&self) -> &'static str {
        "pushplus"
    }

    async fn send(&self, title: &str, content: &str) -> Result<(), AppError> {
        let payload = json!({
            "token": self.token,
            "title": title,
            "content": content,
            "template": "markdown",
        });
        let resp = self
            .client
            .post(PUSHPLUS_URL)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notify(format!("PushPlus request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::ApiCall {
                provider: "pushplus".into(),
                status: resp.status().as_u16(),
            });
        }
        let body: PushPlusResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("PushPlus response decode failed: {e}")))?;
        if body.code != 200 {
            return Err(AppError::Notify(format!(
                "PushPlus rejected message: code={} msg={}",
                body.code, body.msg
            )));
        }
        Ok(())
    }
}

/// ServerChan: key-in-URL HTTP POST, `code == 0` means accepted.
pub struct ServerChanNotifier {
    send_key: String,
    client: Client,
}

#[derive(Deserialize)]
struct ServerChanResponse {
    code: i64,
    #[serde(default)]
    message: String,
}

impl ServerChanNotifier {
    pub fn new(send_key: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(NOTIFIER_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Initialization(format!("ServerChan client init failed: {e}")))?;
        Ok(Self {
            send_key: send_key.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Notifier for ServerChanNotifier {
    fn provider(&self) -> &'static str {
        "serverchan"
    }

    async fn send(&self, title: &str, content: &str) -> Result<(), AppError> {
        let url = format!("https://sctapi.ftqq.com/{}.send", self.send_key);
        let payload = json!({ "title": title, "desp": content });
        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notify(format!("ServerChan request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::ApiCall {
                provider: "serverchan".into(),
                status: resp.status().as_u16(),
            });
        }
        let body: ServerChanResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("ServerChan response decode failed: {e}")))?;
        if body.code != 0 {
            return Err(AppError::Notify(format!(
                "ServerChan rejected message: code={} message={}",
                body.code, body.message
            )));
        }
        Ok(())
    }
}

/// A transfer that cleared thresholds and gates and should be announced.
#[derive(Debug, Clone)]
pub struct TransferAlert {
    pub label: String,
    pub direction: Direction,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub currency: String,
    pub tx_hash: String,
    pub block_number: i64,
}

impl TransferAlert {
    pub fn kind(&self) -> String {
        format!("{}_TRANSFER", self.currency)
    }

    fn title(&self) -> String {
        let arrow = match self.direction {
            Direction::In => "inbound",
            Direction::Out => "outbound",
        };
        format!("{} {} transfer: {} {}", self.label, arrow, self.amount, self.currency)
    }

    fn content(&self) -> String {
        format!(
            "## Transfer details\n\n\
             **Watched address**: {}  \n\
             **Currency**: {}  \n\
             **Amount**: {} {}  \n\
             **Direction**: {}  \n\
             **From**: {}  \n\
             **To**: {}  \n\
             **Block**: {}  \n\
             **Tx**: [view on Etherscan](https://etherscan.io/tx/{})",
            self.label,
            self.currency,
            self.amount,
            self.currency,
            self.direction.as_str(),
            self.from,
            self.to,
            self.block_number,
            self.tx_hash,
        )
    }
}

/// Sends alerts and records every attempt. The notification audit log's
/// unique tx_hash index doubles as the cross-plugin dedup oracle.
pub struct NotificationService {
    db: Database,
    notifier: Option<Arc<dyn Notifier>>,
}

impl NotificationService {
    pub fn new(db: Database, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self { db, notifier }
    }

    pub async fn is_processed(&self, tx_hash: &str) -> Result<bool, AppError> {
        self.db.notification_exists(tx_hash).await
    }

    /// Deliver a transfer alert and write both audit rows. Returns whether
    /// this call actually produced new rows (false = another plugin won the
    /// race on the tx hash).
    pub async fn notify_transfer(&self, alert: &TransferAlert) -> Result<bool, AppError> {
        let (status, error_msg) = self.deliver(&alert.title(), &alert.content()).await;

        let record = NewTransferRecord {
            monitor_label: alert.label.clone(),
            direction: alert.direction,
            from_address: alert.from.clone(),
            to_address: alert.to.clone(),
            amount: alert.amount.clone(),
            currency: alert.currency.clone(),
            tx_hash: alert.tx_hash.clone(),
            block_number: alert.block_number,
            notified: true,
            notify_status: status.clone(),
        };
        let inserted = self.db.insert_transfer_record(&record).await?;

        let entry = NewNotificationEntry {
            kind: alert.kind(),
            direction: Some(alert.direction),
            from_address: Some(alert.from.clone()),
            to_address: Some(alert.to.clone()),
            amount: Some(alert.amount.clone()),
            currency: Some(alert.currency.clone()),
            tx_hash: Some(alert.tx_hash.clone()),
            block_number: Some(alert.block_number),
            content: Some(alert.content()),
            status,
            error_msg,
            ..Default::default()
        };
        let recorded = self.db.insert_notification(&entry).await?;

        Ok(inserted && recorded)
    }

    /// Announce a token that just passed (or deferred) its first screening.
    pub async fn notify_token_listed(&self, token: &TokenAnalysisRow) -> Result<(), AppError> {
        let title = format!("New token listed: {}", display_symbol(token));
        let mut content = format!(
            "### New token passed initial screening\n\n\
             **Name**: {}  \n\
             **Contract**: `{}`  \n\
             **Liquidity**: ${:.0}\n",
            token.name, token.token_address, token.liquidity_usd,
        );
        if token.safety_status == crate::data::schema::SafetyStatus::RetryNeeded {
            content.push_str(
                "\n**Risk unknown** (not yet indexed by the risk APIs).\n\
                 Scanning continues; treat with caution.\n",
            );
        } else {
            content.push_str(&format!(
                "**Risk score**: {:.1} ({})\n",
                token.risk_score,
                token.risk_level.as_str()
            ));
            if crate::analyzer::risk::is_potential_gem(token) {
                content.push_str("\n**Low risk with a small initial cap** - worth a look.\n");
            } else if token.risk_level == crate::data::schema::RiskLevel::Low {
                content.push_str("\n**Low risk**.\n");
            }
        }
        content.push_str(&format!(
            "\n[Etherscan](https://etherscan.io/address/{}) | \
             [Uniswap](https://app.uniswap.org/#/swap?outputCurrency={})",
            token.token_address, token.token_address,
        ));

        let (status, error_msg) = self.deliver(&title, &content).await;
        let entry = NewNotificationEntry {
            kind: "NEW_TOKEN".to_string(),
            content: Some(content),
            status,
            error_msg,
            ..Default::default()
        };
        // No tx hash on token alerts; nothing to dedup against.
        self.db.insert_notification(&entry).await?;
        Ok(())
    }

    async fn deliver(&self, title: &str, content: &str) -> (String, Option<String>) {
        match &self.notifier {
            Some(notifier) => match notifier.send(title, content).await {
                Ok(()) => ("success".to_string(), None),
                Err(e) => {
                    tracing::error!(
                        target: "notify",
                        provider = notifier.provider(),
                        error = %e,
                        "Notification delivery failed"
                    );
                    ("failed".to_string(), Some(e.to_string()))
                }
            },
            // No provider configured: audit-only mode.
            None => ("success".to_string(), None),
        }
    }
}

fn display_symbol(token: &TokenAnalysisRow) -> &str {
    if token.symbol.is_empty() {
        &token.token_address
    } else {
        &token.symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serverchan_rejection_body_is_a_failure() {
        // HTTP 200 with a non-zero code still means the message was refused.
        let body: ServerChanResponse =
            serde_json::from_str(r#"{"code": 40001, "message": "bad sendkey"}"#).unwrap();
        assert_ne!(body.code, 0);
        assert_eq!(body.message, "bad sendkey");

        let ok: ServerChanResponse =
            serde_json::from_str(r#"{"code": 0, "data": {"pushid": "1"}}"#).unwrap();
        assert_eq!(ok.code, 0);
    }

    #[test]
    fn pushplus_rejection_body_is_a_failure() {
        let body: PushPlusResponse =
            serde_json::from_str(r#"{"code": 903, "msg": "invalid token"}"#).unwrap();
        assert_ne!(body.code, 200);
        assert_eq!(body.msg, "invalid token");
    }
}
