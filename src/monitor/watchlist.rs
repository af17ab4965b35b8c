// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::app::config::WatchedAddressEntry;
use crate::common::error::AppError;
use crate::common::parsing::{canonical_address, parse_address_hex};
use alloy::primitives::Address;
use std::collections::HashMap;

/// In-memory set of watched wallets with labels. Addresses are parsed into
/// their 20-byte form up front, so membership is case-insensitive no matter
/// how the caller spells the hex.
pub struct WatchedAddresses {
    labels: HashMap<Address, String>,
}

impl WatchedAddresses {
    pub fn from_entries(entries: &[WatchedAddressEntry]) -> Result<Self, AppError> {
        let mut labels = HashMap::with_capacity(entries.len());
        for entry in entries {
            let addr = parse_address_hex(&entry.address).ok_or_else(|| {
                AppError::Config(format!("Invalid watched address: {}", entry.address))
            })?;
            labels.insert(addr, entry.label.clone());
        }
        Ok(Self { labels })
    }

    pub fn is_monitored(&self, address: Address) -> bool {
        self.labels.contains_key(&address)
    }

    /// Label for a watched address, falling back to its hex form.
    pub fn label(&self, address: Address) -> String {
        match self.labels.get(&address) {
            Some(label) if !label.is_empty() => label.clone(),
            _ => canonical_address(address),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn describe(&self) -> Vec<String> {
        self.labels
            .iter()
            .map(|(addr, label)| {
                if label.is_empty() {
                    canonical_address(*addr)
                } else {
                    format!("{label}({})", canonical_address(*addr))
                }
            })
            .collect()
    }
}
