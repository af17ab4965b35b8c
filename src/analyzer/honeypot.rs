// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

//! External honeypot / risk probes. GoPlus (keyed) is the primary source;
//! the public honeypot.is endpoint is the fallback. "This token is not
//! indexed yet" is a first-class outcome (`AppError::NotFound`), distinct
//! from both transport failure and a clean bill of health.

use crate::common::constants::{GOPLUS_API_URL, HONEYPOT_IS_API_URL};
use crate::common::error::AppError;
use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const PROBE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafetyReport {
    pub is_honeypot: bool,
    pub reason: String,
    pub buy_tax: f64,
    pub sell_tax: f64,
    pub can_buy: bool,
    pub can_sell: bool,
}

#[async_trait]
pub trait SafetyProbe: Send + Sync {
    /// `Err(AppError::NotFound)` means "no data yet, retry later"; any other
    /// error is transport-class and leaves row state untouched.
    async fn check_token(&self, token: Address) -> Result<SafetyReport, AppError>;
}

pub struct HoneypotDetector {
    client: Client,
    goplus_api_key: Option<String>,
}

#[derive(Deserialize)]
struct GoPlusResponse {
    code: i64,
    #[serde(default)]
    result: HashMap<String, GoPlusToken>,
}

#[derive(Deserialize, Default)]
struct GoPlusToken {
    #[serde(default)]
    is_honeypot: String,
    #[serde(default)]
    buy_tax: String,
    #[serde(default)]
    sell_tax: String,
    #[serde(default)]
    cannot_buy: String,
    #[serde(default)]
    cannot_sell_all: String,
    #[serde(default)]
    honeypot_with_same_creator: String,
}

#[derive(Deserialize)]
struct HoneypotIsResponse {
    #[serde(rename = "isHoneypot", default)]
    is_honeypot: bool,
    #[serde(default)]
    summary: HoneypotIsSummary,
    #[serde(rename = "simulationResult", default)]
    simulation: HoneypotIsSimulation,
}

#[derive(Deserialize, Default)]
struct HoneypotIsSummary {
    #[serde(default)]
    risk: String,
}

#[derive(Deserialize, Default)]
struct HoneypotIsSimulation {
    #[serde(rename = "buyTax", default)]
    buy_tax: f64,
    #[serde(rename = "sellTax", default)]
    sell_tax: f64,
}

impl HoneypotDetector {
    pub fn new(goplus_api_key: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Initialization(format!("Probe client init failed: {e}")))?;
        Ok(Self {
            client,
            goplus_api_key: goplus_api_key.filter(|k| !k.is_empty()),
        })
    }

    async fn check_goplus(&self, token: Address, api_key: &str) -> Result<SafetyReport, AppError> {
        let addr = format!("{token:#x}");
        let url = format!("{GOPLUS_API_URL}?contract_addresses={addr}");
        let resp = self
            .client
            .get(&url)
            .header("Authorization", api_key)
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("GoPlus request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::ApiCall {
                provider: "goplus".into(),
                status: resp.status().as_u16(),
            });
        }
        let body: GoPlusResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("GoPlus response decode failed: {e}")))?;
        if body.code != 1 {
            return Err(AppError::ApiCall {
                provider: "goplus".into(),
                status: body.code as u16,
            });
        }
        let Some(data) = body.result.get(&addr) else {
            return Err(AppError::NotFound(format!("token {addr} not in GoPlus result")));
        };

        let is_honeypot = data.is_honeypot == "1" || data.cannot_sell_all == "1";
        let mut reason = String::new();
        if is_honeypot {
            reason = if data.is_honeypot == "1" {
                "flagged as honeypot by GoPlus".to_string()
            } else {
                "cannot sell all tokens".to_string()
            };
            if data.honeypot_with_same_creator == "1" {
                reason.push_str("; creator has deployed other honeypots");
            }
        }

        Ok(SafetyReport {
            is_honeypot,
            reason,
            // GoPlus reports tax as a 0..1 fraction; store percentages.
            buy_tax: data.buy_tax.parse::<f64>().unwrap_or(0.0) * 100.0,
            sell_tax: data.sell_tax.parse::<f64>().unwrap_or(0.0) * 100.0,
            can_buy: data.cannot_buy != "1",
            can_sell: data.cannot_sell_all != "1",
        })
    }

    async fn check_honeypot_is(&self, token: Address) -> Result<SafetyReport, AppError> {
        let addr = format!("{token:#x}");
        let url = format!("{HONEYPOT_IS_API_URL}?address={addr}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("honeypot.is request failed: {e}")))?;
        if resp.status() == StatusCode::NOT_FOUND {
            // The API simply hasn't simulated this token yet.
            return Err(AppError::NotFound(format!(
                "honeypot.is has no data for {addr} (too new)"
            )));
        }
        if !resp.status().is_success() {
            return Err(AppError::ApiCall {
                provider: "honeypot.is".into(),
                status: resp.status().as_u16(),
            });
        }
        let body: HoneypotIsResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("honeypot.is response decode failed: {e}")))?;

        tracing::debug!(
            target: "safety",
            token = %addr,
            summary_risk = %body.summary.risk,
            "honeypot.is simulation result"
        );
        Ok(SafetyReport {
            is_honeypot: body.is_honeypot,
            reason: if body.is_honeypot {
                "flagged as honeypot by honeypot.is".to_string()
            } else {
                String::new()
            },
            buy_tax: body.simulation.buy_tax,
            sell_tax: body.simulation.sell_tax,
            can_buy: true,
            can_sell: !body.is_honeypot,
        })
    }
}

#[async_trait]
impl SafetyProbe for HoneypotDetector {
    async fn check_token(&self, token: Address) -> Result<SafetyReport, AppError> {
        if let Some(key) = self.goplus_api_key.clone() {
            match self.check_goplus(token, &key).await {
                Ok(report) => return Ok(report),
                Err(e) => {
                    tracing::debug!(target: "safety", error = %e, "GoPlus probe failed; trying honeypot.is");
                }
            }
        }
        self.check_honeypot_is(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goplus_fields_parse_with_percent_scaling() {
        let body: GoPlusResponse = serde_json::from_str(
            r#"{
                "code": 1,
                "result": {
                    "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa": {
                        "is_honeypot": "0",
                        "cannot_sell_all": "1",
                        "cannot_buy": "0",
                        "buy_tax": "0.05",
                        "sell_tax": "0.99",
                        "honeypot_with_same_creator": "1"
                    }
                }
            }"#,
        )
        .unwrap();
        let data = &body.result["0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"];
        assert_eq!(data.cannot_sell_all, "1");
        assert_eq!(data.buy_tax.parse::<f64>().unwrap() * 100.0, 5.0);
        // cannot_sell_all alone marks a honeypot
        assert!(data.is_honeypot == "1" || data.cannot_sell_all == "1");
    }

    #[test]
    fn honeypot_is_fields_deserialize() {
        let body: HoneypotIsResponse = serde_json::from_str(
            r#"{
                "isHoneypot": true,
                "summary": {"risk": "high"},
                "simulationResult": {"buyTax": 2.5, "sellTax": 70.1}
            }"#,
        )
        .unwrap();
        assert!(body.is_honeypot);
        assert_eq!(body.summary.risk, "high");
        assert_eq!(body.simulation.sell_tax, 70.1);
    }
}
