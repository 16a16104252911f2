/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2025 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::error::{Error, Result};

/// A 20-byte account or contract address
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize)]
#[serde(try_from = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Reference the raw inner bytes
    pub fn inner(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| Error::ValidationError(format!("Invalid address {s}: {e}")))?;

        let inner: [u8; 20] = bytes
            .try_into()
            .map_err(|_| Error::ValidationError(format!("Address {s} is not 20 bytes")))?;

        Ok(Self(inner))
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Client-assigned primary key of an order
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct OrderId(pub String);

impl OrderId {
    /// Build a new order id for `creator`.
    ///
    /// The creation time alone can collide when two orders are issued
    /// within the same millisecond, so the per-session `counter` and the
    /// creator address prefix are folded in as well.
    pub fn generate(creator: &Address, counter: u64, unix_millis: u128) -> Self {
        Self(format!("order-{}-{}-{}", unix_millis, counter, hex::encode(&creator.0[..4])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque reference to a ledger-held encrypted value
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct EncryptedHandle(pub String);

impl fmt::Display for EncryptedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every order owns exactly one encrypted slot, keyed by its id.
impl From<&OrderId> for EncryptedHandle {
    fn from(id: &OrderId) -> Self {
        Self(id.0.clone())
    }
}

/// Output of the encryption engine for a single plaintext value
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EncryptedInput {
    /// Ciphertext payload accepted by the contract
    pub encrypted_data: Vec<u8>,
    /// Zero-knowledge proof that the payload is well formed
    pub proof: Vec<u8>,
}

/// Order fields exactly as the contract returns them from `getBusinessData`
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawOrder {
    pub name: String,
    /// Public price of the listing
    pub public_value1: u64,
    /// Unused by this client, always written as zero
    pub public_value2: u64,
    pub description: String,
    pub creator: Address,
    /// Creation time in seconds since epoch
    pub timestamp: u64,
    pub is_verified: bool,
    /// Cleared amount, zero until the ledger has verified a decryption
    pub decrypted_value: u64,
}

/// One confidential carbon-credit listing as reconstructed from the ledger
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub name: String,
    pub description: String,
    pub encrypted_amount_handle: EncryptedHandle,
    pub public_price: u64,
    pub creator: Address,
    pub created_at: u64,
    pub is_verified: bool,
    /// Ledger-recorded cleared amount, present iff `is_verified`
    pub verified_amount: Option<u64>,
}

impl Order {
    pub fn from_raw(id: OrderId, raw: RawOrder) -> Self {
        let verified_amount = raw.is_verified.then_some(raw.decrypted_value);

        Self {
            encrypted_amount_handle: EncryptedHandle::from(&id),
            id,
            name: raw.name,
            description: raw.description,
            public_price: raw.public_value1,
            creator: raw.creator,
            created_at: raw.timestamp,
            is_verified: raw.is_verified,
            verified_amount,
        }
    }

    /// Resolve the amount to display, given an optional session-local reveal.
    ///
    /// A ledger-verified amount always wins over a local one.
    pub fn revealed_amount(&self, session_local: Option<u64>) -> Option<RevealedAmount> {
        match (self.verified_amount, session_local) {
            (Some(amount), _) if self.is_verified => Some(RevealedAmount::Authoritative(amount)),
            (_, Some(amount)) => Some(RevealedAmount::SessionLocal(amount)),
            _ => None,
        }
    }
}

/// A cleared amount together with where it came from
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RevealedAmount {
    /// Recorded by the ledger after on-chain verification
    Authoritative(u64),
    /// Decrypted during this session, not yet observed as verified
    SessionLocal(u64),
}

impl RevealedAmount {
    pub fn amount(&self) -> u64 {
        match self {
            Self::Authoritative(v) | Self::SessionLocal(v) => *v,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Authoritative(_))
    }

    /// `amount * price`, never stored
    pub fn total_value(&self, price: u64) -> u128 {
        u128::from(self.amount()) * u128::from(price)
    }
}

/// Aggregate statistics over a full order set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderStats {
    pub total_orders: usize,
    pub verified_orders: usize,
    pub avg_price: f64,
}

impl OrderStats {
    pub fn compute(orders: &[Order]) -> Self {
        let total_orders = orders.len();
        let verified_orders = orders.iter().filter(|o| o.is_verified).count();

        let avg_price = if orders.is_empty() {
            0.0
        } else {
            let sum: u128 = orders.iter().map(|o| u128::from(o.public_price)).sum();
            sum as f64 / total_orders as f64
        };

        Self { total_orders, verified_orders, avg_price }
    }
}

/// A complete snapshot of the ledger's orders as observed by one reload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    pub orders: Vec<Order>,
    pub stats: OrderStats,
    /// Sequence number of the reload that produced this book
    pub reload_seq: u64,
}

impl OrderBook {
    pub fn new(orders: Vec<Order>, reload_seq: u64) -> Self {
        let stats = OrderStats::compute(&orders);
        Self { orders, stats, reload_seq }
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == id)
    }
}
