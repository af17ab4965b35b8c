// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use alloy::primitives::{Address, B256, address, b256};
use lazy_static::lazy_static;
use std::collections::HashMap;

// =============================================================================
// MAINNET CONTRACTS
// =============================================================================

pub const WETH_MAINNET: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const UNISWAP_V2_FACTORY: Address = address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
pub const USDT_MAINNET: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");

// Well-known exchange hot wallets used as the default watch list.
pub const OKX_HOT_WALLET: Address = address!("6ea08ca8f313d860808ef7431fc72c6fbcf4a72d");
pub const BINANCE_HOT_WALLET: Address = address!("f91773ceef22691a825b47a3f14fd68c1d876adf");

// =============================================================================
// EVENT TOPICS
// =============================================================================

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

/// keccak256("PairCreated(address,address,address,uint256)")
pub const PAIR_CREATED_TOPIC: B256 =
    b256!("0d3648bd0f6ba80134a33ba9275ac585d9d315f0ad8355cddefde31afa28d0e9");

// =============================================================================
// POLLING & THRESHOLD DEFAULTS
// =============================================================================

// Mainnet averages ~12s per block; 20s keeps the request rate friendly on
// public endpoints.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_ETH_THRESHOLD: u64 = 10;
pub const DEFAULT_USDT_THRESHOLD: u64 = 500_000;

pub const LIQUIDITY_SCAN_INTERVAL_SECS: u64 = 30;
pub const SAFETY_SCAN_INTERVAL_SECS: u64 = 60;
pub const LIQUIDITY_SCAN_BATCH: i64 = 20;
pub const SAFETY_SCAN_BATCH: i64 = 10;

/// How long a pair may sit without liquidity before it is written off.
pub const PENDING_LIQUIDITY_WINDOW_SECS: i64 = 2 * 60 * 60;

// =============================================================================
// RISK SCORING
// =============================================================================

pub const RISK_SCORE_UNVERIFIED: f64 = 30.0;
pub const RISK_SCORE_HONEYPOT: f64 = 50.0;
pub const RISK_SCORE_HIGH_TAX: f64 = 20.0;
pub const RISK_SCORE_CONCENTRATED_HOLDING: f64 = 25.0;
pub const RISK_SCORE_NO_LIQUIDITY: f64 = 40.0;
pub const RISK_SCORE_NOT_RENOUNCED: f64 = 15.0;

pub const HIGH_TAX_THRESHOLD_PCT: f64 = 10.0;
pub const TOP10_HOLDING_THRESHOLD_PCT: f64 = 50.0;

pub const LOW_RISK_SCORE_THRESHOLD: f64 = 30.0;
pub const GEM_MARKET_CAP_CEILING_USD: f64 = 100_000.0;
pub const MIN_LIQUIDITY_USD: f64 = 5_000.0;

/// Flat ETH/USD valuation constant. Deliberately not a live oracle so the
/// liquidity maths stays deterministic; override via settings.
pub const DEFAULT_ETH_PRICE_USD: f64 = 2_500.0;

// =============================================================================
// EXTERNAL PROBES
// =============================================================================

pub const HONEYPOT_IS_API_URL: &str = "https://api.honeypot.is/v2/IsHoneypot";
pub const GOPLUS_API_URL: &str = "https://api.gopluslabs.io/api/v1/token_security/1";

// =============================================================================
// MEV DETECTION
// =============================================================================

pub const HIGH_GAS_THRESHOLD_WEI: u128 = 500_000_000_000; // 500 gwei
pub const FAILED_TX_GAS_FLOOR: u64 = 100_000;
pub const SANDWICH_TRANSFER_LOG_FLOOR: usize = 3;
/// Leading zero nibbles that make a sender look like a vanity bot address.
pub const BOT_ADDRESS_ZERO_PREFIX_LEN: usize = 8;

lazy_static! {
    /// Curated address -> name table of known MEV operators.
    pub static ref KNOWN_MEV_BOTS: HashMap<Address, &'static str> = {
        let mut m = HashMap::new();
        m.insert(address!("a69babef1ca67a37ffaf7a485dfff3382056e78c"), "Flashbots");
        m.insert(address!("00000000000007736e2f9af06b8f5f3b6d0e8f13"), "MEV Bot");
        m.insert(address!("000000000000084e91743124a982076c59f10084"), "Sandwich Bot");
        m.insert(address!("d2269f890854a8c5f03e8ea091e3d5a2e0e0f890"), "MEV Bot");
        m.insert(address!("6b75d8af000000e20b7a7ddf000ba900b4009a80"), "MEV Bot");
        m.insert(address!("51c72848c68a965f66fa7a88855f9f7784502a7f"), "jaredfromsubway.eth");
        m.insert(address!("00000000003b3cc22af3ae1eac0440bcee416b40"), "MEV Bot");
        m
    };
}

// =============================================================================
// RPC ENDPOINTS
// =============================================================================

/// Public fallbacks, in priority order. Used only when no Infura/Alchemy key
/// is configured; these endpoints are known to truncate large responses
/// under load, which is why receipt fetches carry a bounded retry.
pub const PUBLIC_RPC_ENDPOINTS: &[&str] = &[
    "https://eth.llamarpc.com",
    "https://rpc.ankr.com/eth",
    "https://ethereum.publicnode.com",
    "https://1rpc.io/eth",
];

pub const DEFAULT_DB_PATH: &str = "./chainsentry.db";
