// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! ERC-20 metadata reads. Freshly deployed tokens routinely revert on one
//! or more of these calls, so each field degrades independently; a read is
//! considered valid once both a symbol and a total supply came back.

use crate::abi::{
    SEL_DECIMALS, SEL_NAME, SEL_OWNER, SEL_SYMBOL, SEL_TOTAL_SUPPLY, decode_address,
    decode_string, decode_uint8, decode_uint256,
};
use crate::common::error::AppError;
use crate::network::rpc::RpcClient;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: Option<U256>,
    pub owner: Option<Address>,
    pub is_valid: bool,
}

#[async_trait]
pub trait TokenMetadataSource: Send + Sync {
    async fn read_token_info(&self, token: Address) -> Result<TokenInfo, AppError>;
}

pub struct TokenInfoReader {
    rpc: Arc<RpcClient>,
}

impl TokenInfoReader {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    async fn call_string(&self, token: Address, selector: [u8; 4]) -> Option<String> {
        let data = self.rpc.call(token, &selector).await.ok()?;
        decode_string(&data).ok().filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl TokenMetadataSource for TokenInfoReader {
    async fn read_token_info(&self, token: Address) -> Result<TokenInfo, AppError> {
        let code = self.rpc.code_at(token).await?;
        if code.is_empty() {
            return Err(AppError::NotFound(format!(
                "no code at {token:#x}; not a contract"
            )));
        }

        let mut info = TokenInfo {
            decimals: 18,
            ..Default::default()
        };

        if let Some(name) = self.call_string(token, SEL_NAME).await {
            info.name = name;
        }
        if let Some(symbol) = self.call_string(token, SEL_SYMBOL).await {
            info.symbol = symbol;
        }
        if let Ok(data) = self.rpc.call(token, &SEL_DECIMALS).await
            && let Ok(decimals) = decode_uint8(&data)
        {
            info.decimals = decimals;
        }
        if let Ok(data) = self.rpc.call(token, &SEL_TOTAL_SUPPLY).await
            && let Ok(supply) = decode_uint256(&data)
        {
            info.total_supply = Some(supply);
        }
        if let Ok(data) = self.rpc.call(token, &SEL_OWNER).await
            && let Ok(owner) = decode_address(&data)
            && owner != Address::ZERO
        {
            info.owner = Some(owner);
        }

        info.is_valid = !info.symbol.is_empty() && info.total_supply.is_some();
        Ok(info)
    }
}
