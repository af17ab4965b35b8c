// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::error::AppError;
use alloy::network::Ethereum;
use alloy::providers::RootProvider;

pub type WsProvider = RootProvider<Ethereum>;

/// Streaming connections for the push-mode head tracker. All data fetching
/// goes through the typed JSON-RPC client in `rpc.rs`; this factory only
/// exists for `eth_subscribe(newHeads)`.
pub struct ConnectionFactory;

impl ConnectionFactory {
    pub async fn ws(ws_url: &str) -> Result<WsProvider, AppError> {
        let provider = RootProvider::connect(ws_url)
            .await
            .map_err(|e| AppError::Connection(format!("WS Connection failed: {}", e)))?;
        Ok(provider)
    }
}
