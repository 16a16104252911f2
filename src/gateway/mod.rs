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

//! Ledger Gateway
//!
//! The only place where this client talks to the ledger contract. Reads go
//! through [`LedgerReader`], which needs no identity. Writes go through a
//! [`LedgerWriter`] bound to an authenticated signer and return a
//! [`PendingTx`] whose `wait()` resolves on confirmation.
//!
//! Implementations are expected to turn whatever their provider throws
//! into a [`RawChainFailure`] and classify it with [`RawChainFailure::classify`]
//! before handing it to the order client.

use async_trait::async_trait;
use log::debug;

use crate::{
    error::{Error, Result},
    model::{Address, EncryptedHandle, OrderId, RawOrder},
};

/// Provider error code for a signer declining a request (EIP-1193)
pub const USER_REJECTED_CODE: i64 = 4001;

/// Provider error label some wallets use instead of the numeric code
pub const USER_REJECTED_LABEL: &str = "ACTION_REJECTED";

/// Revert reason the contract emits when a cleared value already exists
pub const ALREADY_VERIFIED_REASON: &str = "Data already verified";

/// Read-only surface of the order contract
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Address of the deployed contract
    fn contract_address(&self) -> Address;

    /// `getAllBusinessIds`
    async fn list_all(&self) -> Result<Vec<OrderId>>;

    /// `getBusinessData`, failing with [`Error::OrderNotFound`] for unknown ids
    async fn fetch_order(&self, id: &OrderId) -> Result<RawOrder>;

    /// `getEncryptedValue`
    async fn fetch_encrypted_handle(&self, id: &OrderId) -> Result<EncryptedHandle>;

    /// `isAvailable`
    async fn probe_availability(&self) -> Result<bool>;
}

/// Parameters for `createBusinessData`
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CreateOrderParams {
    pub id: OrderId,
    pub name: String,
    pub encrypted_amount: Vec<u8>,
    pub proof: Vec<u8>,
    /// Plaintext price, stored as `publicValue1`
    pub public_price: u64,
    pub description: String,
}

/// Confirmation returned by [`PendingTx::wait`]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TxReceipt {
    pub tx_hash: String,
}

/// A submitted transaction awaiting confirmation
#[async_trait]
pub trait PendingTx: Send {
    fn tx_hash(&self) -> &str;

    /// Resolve on confirmation, or fail with a classified error such as
    /// [`Error::UserRejected`], [`Error::AlreadyVerified`] or
    /// [`Error::ChainReverted`].
    async fn wait(self: Box<Self>) -> Result<TxReceipt>;
}

/// Signer-bound write surface of the order contract
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Account that signs the transactions
    fn signer_address(&self) -> Address;

    /// `createBusinessData`
    async fn submit_create(&self, params: CreateOrderParams) -> Result<Box<dyn PendingTx>>;

    /// `verifyDecryption`
    async fn submit_verification(
        &self,
        id: &OrderId,
        clear_values: Vec<u8>,
        decryption_proof: Vec<u8>,
    ) -> Result<Box<dyn PendingTx>>;
}

/// Unclassified failure as reported by a wallet or RPC provider
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RawChainFailure {
    /// Numeric provider code, if any
    pub code: Option<i64>,
    /// Symbolic provider code, if any
    pub label: Option<String>,
    /// Decoded contract revert reason, if the call reverted
    pub reason: Option<String>,
    /// Human readable message
    pub message: String,
}

impl RawChainFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Default::default() }
    }

    pub fn revert(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self { message: format!("execution reverted: {reason}"), reason: Some(reason), ..Default::default() }
    }

    pub fn user_rejected() -> Self {
        Self {
            code: Some(USER_REJECTED_CODE),
            label: Some(USER_REJECTED_LABEL.to_string()),
            message: "user rejected transaction".to_string(),
            ..Default::default()
        }
    }

    /// Map into the client error taxonomy using structured fields only
    pub fn classify(self) -> Error {
        let error = if self.code == Some(USER_REJECTED_CODE) ||
            self.label.as_deref() == Some(USER_REJECTED_LABEL)
        {
            Error::UserRejected
        } else {
            match self.reason {
                Some(reason) if reason == ALREADY_VERIFIED_REASON => Error::AlreadyVerified,
                Some(reason) => Error::ChainReverted(reason),
                None => Error::NetworkFailure(self.message),
            }
        };

        debug!(target: "carbonswap::gateway", "Classified provider failure as {:?}", error);
        error
    }
}

impl From<RawChainFailure> for Error {
    fn from(raw: RawChainFailure) -> Self {
        raw.classify()
    }
}
