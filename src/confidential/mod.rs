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

//! Confidential Value Adapter
//!
//! Wraps the external encryption and decryption engines behind the two
//! operations the order client needs. A reveal is a two-phase protocol:
//! the off-chain decryption round produces an [`OffchainRevealResult`],
//! which is then submitted on-chain through the caller's [`LedgerWriter`]
//! exactly once. Both phases together form one outcome.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use log::{debug, info};

use crate::{
    error::{Error, Result},
    gateway::{LedgerWriter, TxReceipt},
    model::{Address, EncryptedHandle, EncryptedInput, OrderId},
};

/// Turns plaintext integers into contract-bound ciphertexts with proofs
#[async_trait]
pub trait EncryptionEngine: Send + Sync {
    fn is_initialized(&self) -> bool;

    async fn initialize(&self) -> Result<()>;

    /// Fails with [`Error::EncryptionUnavailable`] before `initialize()`.
    async fn encrypt(&self, contract: &Address, user: &Address, value: u64)
        -> Result<EncryptedInput>;
}

/// Off-chain relay that decrypts handles and proves the result
#[async_trait]
pub trait DecryptionEngine: Send + Sync {
    async fn decrypt(
        &self,
        handles: &[EncryptedHandle],
        contract: &Address,
    ) -> Result<OffchainRevealResult>;
}

/// Result of the off-chain decryption phase
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OffchainRevealResult {
    /// Cleared values keyed by the handle they decrypt
    pub clear_values: HashMap<EncryptedHandle, u64>,
    /// ABI-encoded clear values, as the contract expects them
    pub abi_encoded_clear_values: Vec<u8>,
    /// Proof that the clear values decrypt the handles
    pub decryption_proof: Vec<u8>,
}

impl OffchainRevealResult {
    pub fn clear_value(&self, handle: &EncryptedHandle) -> Option<u64> {
        self.clear_values.get(handle).copied()
    }
}

/// Outcome of a complete reveal: decrypted off-chain and confirmed on-chain
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RevealedValue {
    pub handle: EncryptedHandle,
    pub clear_value: u64,
    pub receipt: TxReceipt,
}

pub struct ConfidentialValueAdapter {
    encryption: Arc<dyn EncryptionEngine>,
    decryption: Arc<dyn DecryptionEngine>,
    contract: Address,
}

impl ConfidentialValueAdapter {
    pub fn new(
        encryption: Arc<dyn EncryptionEngine>,
        decryption: Arc<dyn DecryptionEngine>,
        contract: Address,
    ) -> Self {
        Self { encryption, decryption, contract }
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub fn is_initialized(&self) -> bool {
        self.encryption.is_initialized()
    }

    /// Initialize the encryption engine unless it already is.
    pub async fn initialize(&self) -> Result<()> {
        if self.encryption.is_initialized() {
            return Ok(())
        }

        debug!(target: "carbonswap::confidential", "Initializing encryption engine");
        self.encryption.initialize().await
    }

    /// Encrypt `value` for `user`, bound to the order contract.
    pub async fn submit_encrypted(&self, user: &Address, value: u64) -> Result<EncryptedInput> {
        if !self.encryption.is_initialized() {
            return Err(Error::EncryptionUnavailable)
        }

        debug!(target: "carbonswap::confidential", "Encrypting value for {}", user);
        self.encryption.encrypt(&self.contract, user, value).await.map_err(|e| match e {
            Error::EncryptionUnavailable | Error::EncryptionFailure(_) => e,
            other => Error::EncryptionFailure(other.to_string()),
        })
    }

    /// Phase one: decrypt `handle` off-chain.
    pub async fn reveal_offchain(&self, handle: &EncryptedHandle) -> Result<OffchainRevealResult> {
        debug!(target: "carbonswap::confidential", "Requesting off-chain decryption of {}", handle);
        let result = self.decryption.decrypt(&[handle.clone()], &self.contract).await?;

        if result.clear_value(handle).is_none() {
            return Err(Error::MissingClearValue)
        }

        Ok(result)
    }

    /// Phase two: submit the decryption proof for `id` and await confirmation.
    pub async fn submit_reveal(
        &self,
        writer: &dyn LedgerWriter,
        id: &OrderId,
        offchain: &OffchainRevealResult,
    ) -> Result<TxReceipt> {
        let tx = writer
            .submit_verification(
                id,
                offchain.abi_encoded_clear_values.clone(),
                offchain.decryption_proof.clone(),
            )
            .await?;

        debug!(target: "carbonswap::confidential", "Verification tx {} submitted for {}", tx.tx_hash(), id);
        tx.wait().await
    }

    /// Run both phases for the encrypted amount of order `id`.
    pub async fn reveal_encrypted(
        &self,
        writer: &dyn LedgerWriter,
        id: &OrderId,
        handle: &EncryptedHandle,
    ) -> Result<RevealedValue> {
        let offchain = self.reveal_offchain(handle).await?;
        let clear_value = offchain.clear_value(handle).ok_or(Error::MissingClearValue)?;
        let receipt = self.submit_reveal(writer, id, &offchain).await?;

        info!(target: "carbonswap::confidential", "Decryption of {} verified in tx {}", id, receipt.tx_hash);
        Ok(RevealedValue { handle: handle.clone(), clear_value, receipt })
    }
}
