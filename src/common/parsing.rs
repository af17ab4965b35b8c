// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::{Address, B256, U256};

pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

pub fn parse_hex_bytes(s: &str) -> Option<Vec<u8>> {
    hex::decode(strip_0x(s)).ok()
}

pub fn parse_u64_hex(s: &str) -> Option<u64> {
    u64::from_str_radix(strip_0x(s), 16).ok()
}

pub fn parse_u128_hex(s: &str) -> Option<u128> {
    u128::from_str_radix(strip_0x(s), 16).ok()
}

pub fn parse_u256_hex(s: &str) -> Option<U256> {
    U256::from_str_radix(strip_0x(s), 16).ok()
}

pub fn parse_address_hex(s: &str) -> Option<Address> {
    let bytes = parse_hex_bytes(s)?;
    if bytes.len() != 20 {
        return None;
    }
    Some(Address::from_slice(&bytes))
}

pub fn parse_b256_hex(s: &str) -> Option<B256> {
    let bytes = parse_hex_bytes(s)?;
    if bytes.len() != 32 {
        return None;
    }
    Some(B256::from_slice(&bytes))
}

/// Canonical form used everywhere addresses touch the store: lowercase hex
/// with the 0x prefix. Equality stays case-insensitive by construction.
pub fn canonical_address(addr: Address) -> String {
    format!("{addr:#x}")
}

pub fn canonical_hash(hash: B256) -> String {
    format!("{hash:#x}")
}

/// Wei -> ETH with six decimal places, matching the alert format.
pub fn wei_to_eth(wei: U256) -> String {
    format_units(wei, 18, 6)
}

/// Render `amount / 10^decimals` to `precision` decimal places without going
/// through floats, so large supplies survive intact.
pub fn format_units(amount: U256, decimals: u8, precision: usize) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals as u64));
    if divisor.is_zero() {
        return amount.to_string();
    }
    let whole = amount / divisor;
    if precision == 0 {
        return whole.to_string();
    }
    let remainder = amount % divisor;
    // Scale the remainder up so truncation happens after `precision` digits.
    let scale = U256::from(10u64).pow(U256::from(precision as u64));
    let frac = remainder * scale / divisor;
    format!("{whole}.{frac:0width$}", width = precision)
}

/// Display precision for a token amount: the token's own precision, capped
/// at six places.
pub fn token_display_precision(decimals: u8) -> usize {
    decimals.min(6) as usize
}

pub fn wei_to_gwei(wei: u128) -> f64 {
    wei as f64 / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn hex_parsers_accept_lower_and_upper_prefixes() {
        assert_eq!(parse_u64_hex("0x2a"), Some(42));
        assert_eq!(parse_u64_hex("0X2a"), Some(42));
        assert_eq!(parse_u256_hex("0X0"), Some(U256::ZERO));
        assert_eq!(parse_hex_bytes("0Xabcd"), Some(vec![0xab, 0xcd]));
    }

    #[test]
    fn canonical_address_is_lowercase_prefixed() {
        let addr = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
        assert_eq!(
            canonical_address(addr),
            "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
        );
    }

    #[test]
    fn format_units_truncates_to_precision() {
        // 600_000 * 10^6 USDT base units at 6 decimals
        let amount = U256::from(600_000_000_000u64);
        assert_eq!(format_units(amount, 6, 6), "600000.000000");

        // 5 ETH in wei
        let five_eth = U256::from(5_000_000_000_000_000_000u64);
        assert_eq!(wei_to_eth(five_eth), "5.000000");

        // 1.5 at 18 decimals, two places
        let one_point_five = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(format_units(one_point_five, 18, 2), "1.50");
    }

    #[test]
    fn format_units_handles_values_beyond_f64() {
        // 10^30 base units at 18 decimals = 10^12 whole tokens, exact.
        let huge = U256::from(10u64).pow(U256::from(30u64));
        assert_eq!(format_units(huge, 18, 2), "1000000000000.00");
    }
}
