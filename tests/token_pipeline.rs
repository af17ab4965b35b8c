// SPDX-License-Identifier: MIT
// Token lifecycle tests: PairCreated seeding, liquidity promotion and
// timeout, safety transitions, and the forward-only status DAG. Chain and
// probe access go through stub trait impls; the store is in-memory SQLite.

use alloy::primitives::Address;
use async_trait::async_trait;
use chainsentry::analyzer::honeypot::{SafetyProbe, SafetyReport};
use chainsentry::analyzer::liquidity::{LiquiditySnapshot, PairLiquiditySource};
use chainsentry::analyzer::token_info::{TokenInfo, TokenMetadataSource};
use chainsentry::common::error::AppError;
use chainsentry::data::db::Database;
use chainsentry::data::schema::{
    NewTokenAnalysis, RiskLevel, SafetyStatus, TokenAnalysisRow, TokenStatus,
};
use chainsentry::monitor::pair_plugin::PairCreatedPlugin;
use chainsentry::monitor::plugin::LogPlugin;
use chainsentry::network::rpc::RpcLog;
use chainsentry::notify::NotificationService;
use chainsentry::scheduler::liquidity_scanner::LiquidityScanner;
use chainsentry::scheduler::safety_scanner::SafetyScanner;
use std::sync::Arc;
use std::sync::Mutex;

const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
const NEW_TOKEN: &str = "0x00000000000000000000000000000000000000cc";
const PAIR: &str = "0x00000000000000000000000000000000000000dd";
const PAIR_CREATED_TOPIC: &str =
    "0x0d3648bd0f6ba80134a33ba9275ac585d9d315f0ad8355cddefde31afa28d0e9";

async fn memory_db() -> Database {
    Database::new("sqlite::memory:").await.expect("in-memory db")
}

fn topic_for(address: &str) -> String {
    format!("0x{:0>64}", address.trim_start_matches("0x"))
}

fn pair_created_log(token0: &str, token1: &str, pair: &str) -> RpcLog {
    // data = pair address word + pair-index word
    let data = format!(
        "0x{:0>64}{:0>64}",
        pair.trim_start_matches("0x"),
        "2a"
    );
    serde_json::from_value(serde_json::json!({
        "address": "0x5c69bee701ef814a2b6a3edd4b1652cb9cc5aa6f",
        "topics": [PAIR_CREATED_TOPIC, topic_for(token0), topic_for(token1)],
        "data": data,
        "removed": false,
        "transactionHash": format!("0x{:064x}", 99),
        "blockNumber": "0x20",
    }))
    .expect("valid log json")
}

struct StaticLiquidity {
    result: Result<LiquiditySnapshot, String>,
}

#[async_trait]
impl PairLiquiditySource for StaticLiquidity {
    async fn probe_pair(&self, _pair: Address) -> Result<LiquiditySnapshot, AppError> {
        self.result.clone().map_err(AppError::Connection)
    }
}

fn liquidity_of(usd: f64, eth: f64) -> Arc<StaticLiquidity> {
    Arc::new(StaticLiquidity {
        result: Ok(LiquiditySnapshot {
            liquidity_usd: usd,
            eth_reserve: eth,
        }),
    })
}

struct StaticMetadata {
    valid: bool,
}

#[async_trait]
impl TokenMetadataSource for StaticMetadata {
    async fn read_token_info(&self, _token: Address) -> Result<TokenInfo, AppError> {
        if !self.valid {
            return Err(AppError::Connection("metadata unavailable".into()));
        }
        Ok(TokenInfo {
            name: "Pepe Classic".to_string(),
            symbol: "PEPC".to_string(),
            decimals: 18,
            total_supply: Some(alloy::primitives::U256::from(1_000_000u64)),
            owner: None,
            is_valid: true,
        })
    }
}

#[derive(Clone)]
enum ProbeMode {
    Clean,
    Honeypot,
    NotFound,
    Transport,
}

struct ScriptedProbe {
    mode: Mutex<ProbeMode>,
}

impl ScriptedProbe {
    fn new(mode: ProbeMode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
        })
    }

    fn set(&self, mode: ProbeMode) {
        *self.mode.lock().unwrap() = mode;
    }
}

#[async_trait]
impl SafetyProbe for ScriptedProbe {
    async fn check_token(&self, _token: Address) -> Result<SafetyReport, AppError> {
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            ProbeMode::Clean => Ok(SafetyReport {
                is_honeypot: false,
                reason: String::new(),
                buy_tax: 1.0,
                sell_tax: 1.0,
                can_buy: true,
                can_sell: true,
            }),
            ProbeMode::Honeypot => Ok(SafetyReport {
                is_honeypot: true,
                reason: "cannot sell all tokens".to_string(),
                buy_tax: 0.0,
                sell_tax: 100.0,
                can_buy: true,
                can_sell: false,
            }),
            ProbeMode::NotFound => Err(AppError::NotFound("no data yet (too new)".into())),
            ProbeMode::Transport => Err(AppError::Connection("probe timed out".into())),
        }
    }
}

/// Seed a pipeline row the way the pair plugin would, but with a
/// controllable age.
async fn seed_token(db: &Database, minutes_old: i64) -> TokenAnalysisRow {
    let created = db
        .insert_token_analysis(&NewTokenAnalysis {
            token_address: NEW_TOKEN.to_string(),
            pair_address: PAIR.to_string(),
            pair_created_at: chrono::Utc::now().naive_utc()
                - chrono::Duration::minutes(minutes_old),
        })
        .await
        .expect("seed insert");
    assert!(created);
    db.token_by_address(NEW_TOKEN).await.unwrap().unwrap()
}

async fn liquidity_scanner(db: &Database, usd: f64, eth: f64) -> LiquidityScanner {
    LiquidityScanner::new(
        db.clone(),
        liquidity_of(usd, eth),
        Arc::new(StaticMetadata { valid: true }),
        5_000.0,
    )
}

fn safety_scanner(db: &Database, probe: Arc<ScriptedProbe>) -> SafetyScanner {
    let notifications = Arc::new(NotificationService::new(db.clone(), None));
    SafetyScanner::new(db.clone(), probe, notifications)
}

/// Scenario: factory log with token0 = WETH seeds exactly one row in
/// PENDING_LIQUIDITY with the nominal defaults.
#[tokio::test]
async fn pair_created_seeds_pending_row() {
    let db = memory_db().await;
    let plugin = PairCreatedPlugin::new(db.clone());

    plugin
        .accept_log(&pair_created_log(WETH, NEW_TOKEN, PAIR))
        .await;

    let row = db
        .token_by_address(NEW_TOKEN)
        .await
        .unwrap()
        .expect("row seeded");
    assert_eq!(row.status, TokenStatus::PendingLiquidity);
    assert_eq!(row.safety_status, SafetyStatus::Pending);
    assert!(!row.has_liquidity);
    assert_eq!(row.risk_score, 50.0);
    assert_eq!(row.risk_level, RiskLevel::Unknown);
    assert_eq!(row.pair_address, PAIR);

    // Replay: still exactly one row.
    plugin
        .accept_log(&pair_created_log(WETH, NEW_TOKEN, PAIR))
        .await;
    assert_eq!(db.tokens_by_status(TokenStatus::PendingLiquidity, 10).await.unwrap().len(), 1);
}

/// Pairs quoted in anything but WETH are ignored.
#[tokio::test]
async fn non_weth_pairs_are_dropped() {
    let db = memory_db().await;
    let plugin = PairCreatedPlugin::new(db.clone());

    plugin
        .accept_log(&pair_created_log(
            "0x00000000000000000000000000000000000000ee",
            NEW_TOKEN,
            PAIR,
        ))
        .await;

    assert!(db.token_by_address(NEW_TOKEN).await.unwrap().is_none());
}

/// WETH can be either side of the pair; the other side is the new token.
#[tokio::test]
async fn weth_as_token1_still_seeds_other_side() {
    let db = memory_db().await;
    let plugin = PairCreatedPlugin::new(db.clone());

    plugin
        .accept_log(&pair_created_log(NEW_TOKEN, WETH, PAIR))
        .await;

    assert!(db.token_by_address(NEW_TOKEN).await.unwrap().is_some());
}

/// Scenario: 5 WETH in reserves at $2500 values the pool at $25k and
/// promotes the row to ANALYZING with metadata filled in.
#[tokio::test]
async fn liquidity_scan_promotes_funded_pair() {
    let db = memory_db().await;
    seed_token(&db, 5).await;

    let scanner = liquidity_scanner(&db, 25_000.0, 5.0).await;
    scanner.run_once().await;

    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::Analyzing);
    assert!(row.has_liquidity);
    assert_eq!(row.liquidity_usd, 25_000.0);
    assert_eq!(row.initial_market_cap, 25_000.0);
    assert_eq!(row.symbol, "PEPC");
    assert_eq!(row.name, "Pepe Classic");
    assert!(row.liquidity_added_at.is_some());
    assert!(row.last_check_at.is_some());
}

/// Exactly the minimum liquidity promotes; strictly less keeps waiting.
#[tokio::test]
async fn liquidity_threshold_is_inclusive() {
    let db = memory_db().await;
    seed_token(&db, 5).await;

    let scanner = liquidity_scanner(&db, 4_999.99, 1.0).await;
    scanner.run_once().await;
    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::PendingLiquidity);
    assert!(!row.has_liquidity);
    assert_eq!(row.liquidity_usd, 4_999.99);

    let scanner = liquidity_scanner(&db, 5_000.0, 1.0).await;
    scanner.run_once().await;
    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::Analyzing);
    assert!(row.has_liquidity);
}

/// Scenario: a pair that never attracts liquidity inside the window is
/// written off with the timeout flag.
#[tokio::test]
async fn liquidity_timeout_rejects_stale_pair() {
    let db = memory_db().await;
    let row = seed_token(&db, 3 * 60).await;

    let scanner = liquidity_scanner(&db, 0.0, 0.0).await;
    scanner.scan_token(row).await;

    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::Rejected);
    assert!(row.risk_flags_vec().contains(&"timeout_no_liquidity".to_string()));
}

/// Probe failures leave the row exactly as it was.
#[tokio::test]
async fn liquidity_probe_failure_leaves_row_untouched() {
    let db = memory_db().await;
    seed_token(&db, 5).await;

    let scanner = LiquidityScanner::new(
        db.clone(),
        Arc::new(StaticLiquidity {
            result: Err("rpc timeout".to_string()),
        }),
        Arc::new(StaticMetadata { valid: true }),
        5_000.0,
    );
    scanner.run_once().await;

    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::PendingLiquidity);
    assert!(row.last_check_at.is_none());
    assert_eq!(row.liquidity_usd, 0.0);
}

async fn promoted_token(db: &Database) -> TokenAnalysisRow {
    seed_token(db, 5).await;
    let scanner = liquidity_scanner(db, 25_000.0, 5.0).await;
    scanner.run_once().await;
    db.token_by_address(NEW_TOKEN).await.unwrap().unwrap()
}

/// Clean probe verdict: ANALYZING -> MONITORING, COMPLETED, risk scored,
/// one new-token notification.
#[tokio::test]
async fn safety_scan_clears_clean_token() {
    let db = memory_db().await;
    promoted_token(&db).await;

    let scanner = safety_scanner(&db, ScriptedProbe::new(ProbeMode::Clean));
    scanner.run_once().await;

    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::Monitoring);
    assert_eq!(row.safety_status, SafetyStatus::Completed);
    assert!(!row.is_honeypot);
    assert!(row.analyzed_at.is_some());
    // unverified (+30): medium band, level derived from score
    assert_eq!(row.risk_score, 30.0);
    assert_eq!(row.risk_level, RiskLevel::Medium);

    let notifications = db.notifications_by_kind("NEW_TOKEN", 10).await.unwrap();
    assert_eq!(notifications.len(), 1);
}

/// Honeypot verdict forces REJECTED; no announcement goes out.
#[tokio::test]
async fn safety_scan_rejects_honeypot() {
    let db = memory_db().await;
    promoted_token(&db).await;

    let scanner = safety_scanner(&db, ScriptedProbe::new(ProbeMode::Honeypot));
    scanner.run_once().await;

    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::Rejected);
    assert_eq!(row.safety_status, SafetyStatus::Completed);
    assert!(row.is_honeypot);
    assert!(row.risk_flags_vec().iter().any(|f| f.starts_with("honeypot:")));

    assert!(db.notifications_by_kind("NEW_TOKEN", 10).await.unwrap().is_empty());
}

/// "Not indexed yet" parks the row in MONITORING with a retry marker and
/// an unknown risk level; the first transition still announces.
#[tokio::test]
async fn safety_scan_marks_unindexed_token_for_retry() {
    let db = memory_db().await;
    promoted_token(&db).await;

    let probe = ScriptedProbe::new(ProbeMode::NotFound);
    let scanner = safety_scanner(&db, probe.clone());
    scanner.run_once().await;

    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::Monitoring);
    assert_eq!(row.safety_status, SafetyStatus::RetryNeeded);
    assert_eq!(row.risk_level, RiskLevel::Unknown);
    assert!(!row.is_honeypot);
    assert_eq!(db.notifications_by_kind("NEW_TOKEN", 10).await.unwrap().len(), 1);

    // The retry pass later clears it without a second announcement.
    probe.set(ProbeMode::Clean);
    scanner.run_once().await;
    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::Monitoring);
    assert_eq!(row.safety_status, SafetyStatus::Completed);
    assert_eq!(db.notifications_by_kind("NEW_TOKEN", 10).await.unwrap().len(), 1);
}

/// Transport failure leaves the row untouched for the next pass.
#[tokio::test]
async fn safety_scan_transport_error_is_retried_later() {
    let db = memory_db().await;
    promoted_token(&db).await;

    let scanner = safety_scanner(&db, ScriptedProbe::new(ProbeMode::Transport));
    scanner.run_once().await;

    let row = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(row.status, TokenStatus::Analyzing);
    assert_eq!(row.safety_status, SafetyStatus::Pending);
    assert!(row.analyzed_at.is_none());
}

/// A settled MONITORING/COMPLETED row drops out of the safety work set,
/// so re-running the scanner is a no-op.
#[tokio::test]
async fn settled_rows_leave_the_work_set() {
    let db = memory_db().await;
    promoted_token(&db).await;

    let scanner = safety_scanner(&db, ScriptedProbe::new(ProbeMode::Clean));
    scanner.run_once().await;
    let before = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();

    scanner.run_once().await;
    let after = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();

    assert_eq!(before.status, after.status);
    assert_eq!(before.analyzed_at, after.analyzed_at);
    assert_eq!(db.notifications_by_kind("NEW_TOKEN", 10).await.unwrap().len(), 1);

    // And the liquidity scanner no longer sees it either.
    let liquidity = liquidity_scanner(&db, 25_000.0, 5.0).await;
    liquidity.run_once().await;
    let unchanged = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(unchanged.status, TokenStatus::Monitoring);
}

/// Observed status sequences always follow the DAG; a rejected row can
/// never be resurrected by a replayed scan.
#[tokio::test]
async fn rejected_rows_stay_rejected() {
    let db = memory_db().await;
    let row = promoted_token(&db).await;

    let scanner = safety_scanner(&db, ScriptedProbe::new(ProbeMode::Honeypot));
    scanner.run_once().await;

    // The snapshot taken before rejection is stale; the store row has
    // moved on and the DAG offers no path out of REJECTED.
    assert_eq!(row.status, TokenStatus::Analyzing);
    let fresh = db.token_by_address(NEW_TOKEN).await.unwrap().unwrap();
    assert_eq!(fresh.status, TokenStatus::Rejected);
    assert!(!fresh.status.may_transition(TokenStatus::Monitoring));
    assert!(!fresh.status.may_transition(TokenStatus::Analyzing));
}
