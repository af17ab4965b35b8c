// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Minimal ABI codec for the handful of read calls the pipeline issues.
//! Selectors are fixed; return decoding covers exactly the word shapes the
//! ERC-20 metadata reads and the Uniswap V2 pair probes produce.

use crate::common::error::AppError;
use alloy::primitives::{Address, B256, U256};

// 4-byte selectors, keccak256(signature)[..4].
pub const SEL_NAME: [u8; 4] = [0x06, 0xfd, 0xde, 0x03]; // name()
pub const SEL_SYMBOL: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41]; // symbol()
pub const SEL_DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67]; // decimals()
pub const SEL_TOTAL_SUPPLY: [u8; 4] = [0x18, 0x16, 0x0d, 0xdd]; // totalSupply()
pub const SEL_OWNER: [u8; 4] = [0x8d, 0xa5, 0xcb, 0x5b]; // owner()
pub const SEL_GET_RESERVES: [u8; 4] = [0x09, 0x02, 0xf1, 0xac]; // getReserves()
pub const SEL_TOKEN0: [u8; 4] = [0x0d, 0xfe, 0x16, 0x81]; // token0()

/// Reserves as reported by a V2 pair. `blockTimestampLast` is returned as a
/// third word on the wire but nothing downstream uses it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairReserves {
    pub reserve0: U256,
    pub reserve1: U256,
}

/// An indexed address topic is the address left-padded to 32 bytes.
pub fn address_from_topic(topic: B256) -> Address {
    Address::from_slice(&topic[12..])
}

pub fn address_from_word(word: &[u8]) -> Option<Address> {
    if word.len() < 32 {
        return None;
    }
    Some(Address::from_slice(&word[12..32]))
}

pub fn decode_uint256(data: &[u8]) -> Result<U256, AppError> {
    if data.is_empty() {
        return Err(AppError::Decode("empty uint256 return".into()));
    }
    if data.len() > 32 {
        return Ok(U256::from_be_slice(&data[..32]));
    }
    Ok(U256::from_be_slice(data))
}

pub fn decode_uint8(data: &[u8]) -> Result<u8, AppError> {
    let value = decode_uint256(data)?;
    u8::try_from(value).map_err(|_| AppError::Decode("uint8 return out of range".into()))
}

pub fn decode_address(data: &[u8]) -> Result<Address, AppError> {
    address_from_word(data).ok_or_else(|| AppError::Decode("short address return".into()))
}

/// ABI `string` return: offset word, length word, then UTF-8 bytes. A few
/// pre-standard tokens return a bare bytes32 instead; accept both.
pub fn decode_string(data: &[u8]) -> Result<String, AppError> {
    if data.len() == 32 {
        let trimmed: Vec<u8> = data.iter().copied().take_while(|b| *b != 0).collect();
        return Ok(String::from_utf8_lossy(&trimmed).into_owned());
    }
    if data.len() < 64 {
        return Err(AppError::Decode("short string return".into()));
    }
    let offset = word_as_usize(&data[..32])
        .filter(|o| o.checked_add(32).is_some_and(|end| end <= data.len()))
        .ok_or_else(|| AppError::Decode("string offset out of range".into()))?;
    let len = word_as_usize(&data[offset..offset + 32])
        .ok_or_else(|| AppError::Decode("string length word invalid".into()))?;
    let start = offset + 32;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| AppError::Decode("string length out of range".into()))?;
    Ok(String::from_utf8_lossy(&data[start..end]).into_owned())
}

fn word_as_usize(word: &[u8]) -> Option<usize> {
    let value = U256::from_be_slice(word);
    usize::try_from(value).ok()
}

/// getReserves() -> (uint112, uint112, uint32), each padded to a full word.
pub fn decode_reserves(data: &[u8]) -> Result<PairReserves, AppError> {
    if data.len() < 64 {
        return Err(AppError::Decode(format!(
            "getReserves returned {} bytes, expected at least 64",
            data.len()
        )));
    }
    Ok(PairReserves {
        reserve0: U256::from_be_slice(&data[0..32]),
        reserve1: U256::from_be_slice(&data[32..64]),
    })
}
