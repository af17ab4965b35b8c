// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::constants;
use crate::common::error::AppError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// A single watched wallet. The address is the identity; the label is
/// informational and falls back to the hex form when empty.
#[derive(Debug, Deserialize, Clone)]
pub struct WatchedAddressEntry {
    pub address: String,
    #[serde(default)]
    pub label: String,
}

/// An ERC-20 contract whose Transfer logs are monitored. `threshold` is in
/// whole tokens; alerts fire strictly above it.
#[derive(Debug, Deserialize, Clone)]
pub struct WatchedTokenEntry {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub threshold: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_debug")]
    pub debug: bool,

    // RPC credentials; URL resolution below.
    #[serde(default)]
    pub infura_key: Option<String>,
    #[serde(default)]
    pub alchemy_key: Option<String>,
    #[serde(default)]
    pub rpc_url: Option<String>,

    #[serde(default)]
    pub http_proxy: Option<String>,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,

    // Alerting thresholds (whole units, strictly-greater comparison).
    #[serde(default = "default_eth_threshold")]
    pub eth_threshold: u64,

    #[serde(default = "default_watched_addresses")]
    pub watched_addresses: Vec<WatchedAddressEntry>,
    #[serde(default = "default_watched_tokens")]
    pub watched_tokens: Vec<WatchedTokenEntry>,

    #[serde(default = "default_true")]
    pub mev_filter_enabled: bool,
    #[serde(default = "default_true")]
    pub pair_watch_enabled: bool,
    #[serde(default = "default_true")]
    pub deployment_watch_enabled: bool,

    // Token pipeline.
    #[serde(default = "default_eth_price")]
    pub eth_price_usd: f64,
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity_usd: f64,
    #[serde(default = "default_liquidity_interval")]
    pub liquidity_scan_interval_secs: u64,
    #[serde(default = "default_safety_interval")]
    pub safety_scan_interval_secs: u64,

    // Notifier providers.
    #[serde(default)]
    pub pushplus_token: Option<String>,
    #[serde(default)]
    pub serverchan_key: Option<String>,

    // External risk probe.
    #[serde(default)]
    pub goplus_api_key: Option<String>,

    // Read-only query API.
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_true")]
    pub api_enabled: bool,

    /// Bound on concurrent detached analysis tasks.
    #[serde(default = "default_analysis_workers")]
    pub analysis_worker_limit: usize,
}

fn default_debug() -> bool {
    false
}
fn default_true() -> bool {
    true
}
fn default_db_path() -> String {
    constants::DEFAULT_DB_PATH.to_string()
}
fn default_poll_interval() -> u64 {
    constants::DEFAULT_POLL_INTERVAL_SECS
}
fn default_rpc_timeout() -> u64 {
    constants::DEFAULT_RPC_TIMEOUT_SECS
}
fn default_eth_threshold() -> u64 {
    constants::DEFAULT_ETH_THRESHOLD
}
fn default_eth_price() -> f64 {
    constants::DEFAULT_ETH_PRICE_USD
}
fn default_min_liquidity() -> f64 {
    constants::MIN_LIQUIDITY_USD
}
fn default_liquidity_interval() -> u64 {
    constants::LIQUIDITY_SCAN_INTERVAL_SECS
}
fn default_safety_interval() -> u64 {
    constants::SAFETY_SCAN_INTERVAL_SECS
}
fn default_server_host() -> String {
    "127.0.0.1".to_string()
}
fn default_server_port() -> u16 {
    8080
}
fn default_analysis_workers() -> usize {
    8
}

fn default_watched_addresses() -> Vec<WatchedAddressEntry> {
    vec![
        WatchedAddressEntry {
            address: crate::common::parsing::canonical_address(constants::OKX_HOT_WALLET),
            label: "OKX".to_string(),
        },
        WatchedAddressEntry {
            address: crate::common::parsing::canonical_address(constants::BINANCE_HOT_WALLET),
            label: "Binance".to_string(),
        },
    ]
}

fn default_watched_tokens() -> Vec<WatchedTokenEntry> {
    vec![WatchedTokenEntry {
        address: crate::common::parsing::canonical_address(constants::USDT_MAINNET),
        symbol: "USDT".to_string(),
        decimals: 6,
        threshold: constants::DEFAULT_USDT_THRESHOLD,
    }]
}

impl Settings {
    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    /// Layering: optional config file, then environment variables. A missing
    /// default file is fine; an explicitly named one must exist.
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        let mut builder = Config::builder();
        match path {
            Some(explicit) => {
                if !Path::new(explicit).exists() {
                    return Err(AppError::Config(format!("Config file not found: {explicit}")));
                }
                builder = builder.add_source(File::with_name(explicit));
            }
            None => {
                builder = builder.add_source(File::with_name("config").required(false));
            }
        }
        let cfg = builder
            .add_source(Environment::default())
            .build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// HTTP endpoint resolution: Infura if keyed, then Alchemy, then an
    /// explicit URL, then the first public fallback.
    pub fn http_rpc_url(&self) -> String {
        if let Some(key) = self.infura_key.as_deref().filter(|k| !k.is_empty()) {
            return format!("https://mainnet.infura.io/v3/{key}");
        }
        if let Some(key) = self.alchemy_key.as_deref().filter(|k| !k.is_empty()) {
            return format!("https://eth-mainnet.g.alchemy.com/v2/{key}");
        }
        if let Some(url) = self.rpc_url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }
        tracing::warn!(
            target: "config",
            "No INFURA_KEY/ALCHEMY_KEY configured; falling back to public endpoint {}",
            constants::PUBLIC_RPC_ENDPOINTS[0]
        );
        constants::PUBLIC_RPC_ENDPOINTS[0].to_string()
    }

    /// WS endpoint for push-mode head tracking. Only Infura is wired for WS;
    /// without it the follower polls.
    pub fn ws_rpc_url(&self) -> Option<String> {
        self.infura_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(|key| format!("wss://mainnet.infura.io/ws/v3/{key}"))
    }

    pub fn sqlite_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_settings() -> Settings {
        // Deserialize from an empty map so all serde defaults apply.
        serde_json::from_value(serde_json::json!({})).expect("defaults deserialize")
    }

    #[test]
    fn defaults_cover_spec_constants() {
        let s = bare_settings();
        assert_eq!(s.poll_interval_secs, 20);
        assert_eq!(s.eth_threshold, 10);
        assert_eq!(s.eth_price_usd, 2500.0);
        assert_eq!(s.min_liquidity_usd, 5000.0);
        assert_eq!(s.watched_tokens[0].symbol, "USDT");
        assert_eq!(s.watched_tokens[0].threshold, 500_000);
        assert!(s.mev_filter_enabled);
    }

    #[test]
    fn rpc_url_prefers_infura_then_alchemy() {
        let mut s = bare_settings();
        s.infura_key = Some("abc".into());
        s.alchemy_key = Some("def".into());
        assert_eq!(s.http_rpc_url(), "https://mainnet.infura.io/v3/abc");
        assert!(s.ws_rpc_url().unwrap().starts_with("wss://mainnet.infura.io"));

        s.infura_key = None;
        assert_eq!(s.http_rpc_url(), "https://eth-mainnet.g.alchemy.com/v2/def");
        assert!(s.ws_rpc_url().is_none());
    }

    #[test]
    fn rpc_url_falls_back_to_public_endpoint() {
        let s = bare_settings();
        assert_eq!(s.http_rpc_url(), "https://eth.llamarpc.com");
    }
}
