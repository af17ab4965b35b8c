// SPDX-License-Identifier: MIT
// Store-backed tests for the transfer gate chain: watched-address matching,
// thresholds, MEV veto, and the one-notification-per-tx-hash guarantee.
// Everything runs against an in-memory SQLite pool; the MEV oracle is a
// canned stub so no network is involved.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use chainsentry::app::config::{WatchedAddressEntry, WatchedTokenEntry};
use chainsentry::common::error::AppError;
use chainsentry::data::db::Database;
use chainsentry::data::schema::Direction;
use chainsentry::monitor::mev::{MevOracle, MevType, MevVerdict};
use chainsentry::monitor::plugin::{LogPlugin, TxPlugin};
use chainsentry::monitor::transfer_plugin::{
    Erc20TransferPlugin, NativeTransferPlugin, TokenConfig, TransferMonitor,
};
use chainsentry::monitor::watchlist::WatchedAddresses;
use chainsentry::network::rpc::{RpcLog, RpcTransaction};
use chainsentry::notify::NotificationService;
use std::sync::Arc;

const OKX: &str = "0x6ea08ca8f313d860808ef7431fc72c6fbcf4a72d";
const RECIPIENT: &str = "0x00000000000000000000000000000000000000aa";
const USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
const TRANSFER_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

struct StaticOracle {
    verdict: MevVerdict,
}

#[async_trait]
impl MevOracle for StaticOracle {
    async fn assess(&self, _tx_hash: B256) -> Result<MevVerdict, AppError> {
        Ok(self.verdict.clone())
    }
}

fn mev_veto() -> Arc<StaticOracle> {
    Arc::new(StaticOracle {
        verdict: MevVerdict {
            is_mev: true,
            mev_type: MevType::Sandwich,
            confidence: 0.8,
            evidence: vec!["bracketed by two transactions from the same sender".into()],
        },
    })
}

fn mev_clean() -> Arc<StaticOracle> {
    Arc::new(StaticOracle {
        verdict: MevVerdict {
            is_mev: false,
            mev_type: MevType::None,
            confidence: 0.0,
            evidence: vec![],
        },
    })
}

async fn memory_db() -> Database {
    Database::new("sqlite::memory:").await.expect("in-memory db")
}

fn watchlist() -> Arc<WatchedAddresses> {
    Arc::new(
        WatchedAddresses::from_entries(&[WatchedAddressEntry {
            address: OKX.to_string(),
            label: "OKX".to_string(),
        }])
        .expect("valid watch list"),
    )
}

fn monitor_with(
    db: &Database,
    oracle: Option<Arc<dyn MevOracle>>,
    eth_threshold: u64,
) -> Arc<TransferMonitor> {
    let notifications = Arc::new(NotificationService::new(db.clone(), None));
    Arc::new(TransferMonitor::new(
        watchlist(),
        notifications,
        oracle,
        eth_threshold,
    ))
}

fn usdt_config() -> TokenConfig {
    TokenConfig::from_entry(&WatchedTokenEntry {
        address: USDT.to_string(),
        symbol: "USDT".to_string(),
        decimals: 6,
        threshold: 500_000,
    })
    .expect("valid token entry")
}

fn topic_for(address: &str) -> String {
    format!("0x{:0>64}", address.trim_start_matches("0x"))
}

fn usdt_transfer_log(from: &str, to: &str, base_units: u128, tx_hash_byte: u8) -> RpcLog {
    serde_json::from_value(serde_json::json!({
        "address": USDT,
        "topics": [TRANSFER_TOPIC, topic_for(from), topic_for(to)],
        "data": format!("0x{base_units:064x}"),
        "removed": false,
        "transactionHash": format!("0x{tx_hash_byte:064x}"),
        "blockNumber": "0x10",
    }))
    .expect("valid log json")
}

fn native_tx(from: &str, to: &str, value_wei: u128, tx_hash_byte: u8) -> RpcTransaction {
    serde_json::from_value(serde_json::json!({
        "hash": format!("0x{tx_hash_byte:064x}"),
        "from": from,
        "to": to,
        "value": format!("0x{value_wei:x}"),
        "gasPrice": "0x3b9aca00",
        "input": "0x",
        "transactionIndex": "0x1",
        "blockNumber": "0x10",
    }))
    .expect("valid tx json")
}

/// Scenario: watched sender moves 600k USDT with a 500k threshold.
#[tokio::test]
async fn usdt_transfer_above_threshold_is_recorded_and_audited() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, None, 10);
    let plugin = Erc20TransferPlugin::new(monitor, usdt_config());

    let log = usdt_transfer_log(OKX, RECIPIENT, 600_000_000_000, 1);
    plugin.accept_log(&log).await;

    let record = db
        .transfer_by_tx_hash(&format!("0x{:064x}", 1))
        .await
        .unwrap()
        .expect("transfer record written");
    assert_eq!(record.direction, Direction::Out);
    assert_eq!(record.amount, "600000.000000");
    assert_eq!(record.currency, "USDT");
    assert_eq!(record.monitor_label, "OKX");
    assert_eq!(record.block_number, 0x10);
    assert!(record.notified);
    assert_eq!(record.notify_status, "success");

    let entry = db
        .notification_by_tx_hash(&format!("0x{:064x}", 1))
        .await
        .unwrap()
        .expect("notification entry written");
    assert_eq!(entry.kind, "USDT_TRANSFER");
    assert_eq!(entry.status, "success");
}

/// Scenario: native transfer below the ETH threshold writes nothing.
#[tokio::test]
async fn native_transfer_below_threshold_writes_no_rows() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, None, 10);
    let plugin = NativeTransferPlugin::new(monitor);

    let tx = native_tx(RECIPIENT, OKX, 5_000_000_000_000_000_000, 2);
    plugin.accept_tx(&tx).await;

    assert!(db.recent_transfers(10).await.unwrap().is_empty());
    assert!(db.recent_notifications(10).await.unwrap().is_empty());
}

/// A transfer of exactly the threshold is NOT notified; alerts require
/// strictly greater.
#[tokio::test]
async fn exact_threshold_value_is_not_notified() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, None, 10);
    let plugin = Erc20TransferPlugin::new(monitor, usdt_config());

    let log = usdt_transfer_log(OKX, RECIPIENT, 500_000_000_000, 3);
    plugin.accept_log(&log).await;

    assert!(db.recent_transfers(10).await.unwrap().is_empty());

    // One base unit more clears the gate.
    let log = usdt_transfer_log(OKX, RECIPIENT, 500_000_000_001, 4);
    plugin.accept_log(&log).await;
    assert_eq!(db.recent_transfers(10).await.unwrap().len(), 1);
}

/// Scenario: the MEV oracle vetoes a large transfer; no rows appear.
#[tokio::test]
async fn mev_veto_suppresses_alert_and_rows() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, Some(mev_veto()), 10);
    let plugin = NativeTransferPlugin::new(monitor);

    let tx = native_tx(OKX, RECIPIENT, 50_000_000_000_000_000_000, 5);
    plugin.accept_tx(&tx).await;

    assert!(db.recent_transfers(10).await.unwrap().is_empty());
    assert!(db.recent_notifications(10).await.unwrap().is_empty());
}

/// A clean oracle verdict lets the same transfer through.
#[tokio::test]
async fn clean_mev_verdict_allows_alert() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, Some(mev_clean()), 10);
    let plugin = NativeTransferPlugin::new(monitor);

    let tx = native_tx(OKX, RECIPIENT, 50_000_000_000_000_000_000, 6);
    plugin.accept_tx(&tx).await;

    let record = db
        .transfer_by_tx_hash(&format!("0x{:064x}", 6))
        .await
        .unwrap()
        .expect("transfer recorded");
    assert_eq!(record.currency, "ETH");
    assert_eq!(record.amount, "50.000000");
    assert_eq!(record.direction, Direction::Out);
}

/// Replaying the same dispatch twice leaves the store unchanged.
#[tokio::test]
async fn replayed_dispatch_is_idempotent() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, None, 10);
    let plugin = Erc20TransferPlugin::new(monitor, usdt_config());

    let log = usdt_transfer_log(OKX, RECIPIENT, 600_000_000_000, 7);
    plugin.accept_log(&log).await;
    plugin.accept_log(&log).await;

    assert_eq!(db.recent_transfers(10).await.unwrap().len(), 1);
    assert_eq!(db.recent_notifications(10).await.unwrap().len(), 1);
}

/// Cross-plugin dedup: once any plugin records a tx hash, other plugins
/// drop the same transaction.
#[tokio::test]
async fn notification_entries_dedup_across_plugins() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, None, 10);
    let erc20 = Erc20TransferPlugin::new(monitor.clone(), usdt_config());
    let native = NativeTransferPlugin::new(monitor);

    let log = usdt_transfer_log(OKX, RECIPIENT, 600_000_000_000, 8);
    erc20.accept_log(&log).await;

    let tx = native_tx(OKX, RECIPIENT, 50_000_000_000_000_000_000, 8);
    native.accept_tx(&tx).await;

    assert_eq!(db.recent_notifications(10).await.unwrap().len(), 1);
    assert_eq!(db.recent_transfers(10).await.unwrap().len(), 1);
}

/// Unwatched endpoints never produce rows, and removed (reorged) logs are
/// ignored outright.
#[tokio::test]
async fn unwatched_and_removed_events_are_dropped() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, None, 10);
    let plugin = Erc20TransferPlugin::new(monitor, usdt_config());

    // Neither endpoint watched.
    let log = usdt_transfer_log(RECIPIENT, "0x00000000000000000000000000000000000000bb", 600_000_000_000, 9);
    plugin.accept_log(&log).await;
    assert!(db.recent_transfers(10).await.unwrap().is_empty());

    // Watched, above threshold, but flagged removed by the node.
    let mut log = usdt_transfer_log(OKX, RECIPIENT, 600_000_000_000, 10);
    log.removed = true;
    plugin.accept_log(&log).await;
    assert!(db.recent_transfers(10).await.unwrap().is_empty());
}

/// The reorg signal applies to native transactions too: a removed tx is
/// dropped before any other gate runs.
#[tokio::test]
async fn removed_native_transactions_are_dropped() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, None, 10);
    let plugin = NativeTransferPlugin::new(monitor);

    let mut tx = native_tx(OKX, RECIPIENT, 50_000_000_000_000_000_000, 13);
    tx.removed = true;
    plugin.accept_tx(&tx).await;
    assert!(db.recent_transfers(10).await.unwrap().is_empty());
    assert!(db.recent_notifications(10).await.unwrap().is_empty());

    // The same transaction without the flag goes through.
    tx.removed = false;
    plugin.accept_tx(&tx).await;
    assert_eq!(db.recent_transfers(10).await.unwrap().len(), 1);
}

/// Inbound transfers are labeled from the watched receiving side.
#[tokio::test]
async fn inbound_transfer_uses_recipient_label() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, None, 10);
    let plugin = Erc20TransferPlugin::new(monitor, usdt_config());

    let log = usdt_transfer_log(RECIPIENT, OKX, 600_000_000_000, 11);
    plugin.accept_log(&log).await;

    let record = db
        .transfer_by_tx_hash(&format!("0x{:064x}", 11))
        .await
        .unwrap()
        .expect("inbound transfer recorded");
    assert_eq!(record.direction, Direction::In);
    assert_eq!(record.monitor_label, "OKX");
}

/// Watch-list membership is case-insensitive end to end: a checksummed
/// spelling in config still matches lowercase wire addresses.
#[tokio::test]
async fn watchlist_matching_is_case_insensitive() {
    let db = memory_db().await;
    let watch = Arc::new(
        WatchedAddresses::from_entries(&[WatchedAddressEntry {
            address: "0x6EA08CA8F313D860808EF7431FC72C6FBCF4A72D".to_string(),
            label: "OKX".to_string(),
        }])
        .unwrap(),
    );
    let notifications = Arc::new(NotificationService::new(db.clone(), None));
    let monitor = Arc::new(TransferMonitor::new(watch, notifications, None, 10));
    let plugin = Erc20TransferPlugin::new(monitor, usdt_config());

    let log = usdt_transfer_log(OKX, RECIPIENT, 600_000_000_000, 12);
    plugin.accept_log(&log).await;

    assert_eq!(db.recent_transfers(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn log_plugin_declares_its_route() {
    let db = memory_db().await;
    let monitor = monitor_with(&db, None, 10);
    let plugin = Erc20TransferPlugin::new(monitor, usdt_config());
    assert_eq!(
        plugin.from_contract(),
        USDT.parse::<Address>().unwrap()
    );
    assert_eq!(plugin.interested_topics().len(), 1);
}
