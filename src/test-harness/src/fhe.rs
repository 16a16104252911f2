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

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use carbonswap::{
    confidential::{DecryptionEngine, EncryptionEngine, OffchainRevealResult},
    model::{Address, EncryptedHandle, EncryptedInput},
    Error, Result,
};
use log::debug;
use smol::lock::Mutex;

use crate::ledger::MockLedger;

/// Toy key the mock engine "encrypts" with
const MOCK_KEY: u64 = 0x5eed_c0ff_ee15_600d;

/// ABI-encode values as consecutive 32-byte big-endian words
pub fn encode_clear_values(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 32);
    for value in values {
        out.extend_from_slice(&[0u8; 24]);
        out.extend_from_slice(&value.to_be_bytes());
    }
    out
}

pub fn decode_clear_values(data: &[u8]) -> Vec<u64> {
    data.chunks_exact(32)
        .map(|word| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&word[24..]);
            u64::from_be_bytes(bytes)
        })
        .collect()
}

/// Proof the mock relay attaches, and the mock contract expects
pub fn expected_decryption_proof(handles: &[EncryptedHandle]) -> Vec<u8> {
    let mut proof = b"kms-signature:".to_vec();
    for handle in handles {
        proof.extend_from_slice(handle.0.as_bytes());
    }
    proof
}

/// Encryption engine and decryption relay in one, backed by a [`MockLedger`]
pub struct MockFhe {
    ledger: Arc<MockLedger>,
    initialized: AtomicBool,
    fail_init: AtomicBool,
    encrypted_values: Mutex<Vec<u64>>,
    decrypt_calls: Mutex<Vec<Vec<EncryptedHandle>>>,
    decrypt_failure: Mutex<Option<Error>>,
    /// While set, decryption waits for a message on this channel
    gate: Mutex<Option<async_channel::Receiver<()>>>,
    /// While set, encryption waits for a message on this channel
    encryption_gate: Mutex<Option<async_channel::Receiver<()>>>,
}

impl MockFhe {
    pub fn new(ledger: Arc<MockLedger>) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            initialized: AtomicBool::new(false),
            fail_init: AtomicBool::new(false),
            encrypted_values: Mutex::new(vec![]),
            decrypt_calls: Mutex::new(vec![]),
            decrypt_failure: Mutex::new(None),
            gate: Mutex::new(None),
            encryption_gate: Mutex::new(None),
        })
    }

    pub fn fail_init(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::SeqCst);
    }

    /// Plaintexts passed to `encrypt`, in call order
    pub async fn encrypted_values(&self) -> Vec<u64> {
        self.encrypted_values.lock().await.clone()
    }

    pub async fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.lock().await.len()
    }

    pub async fn fail_next_decrypt(&self, error: Error) {
        *self.decrypt_failure.lock().await = Some(error);
    }

    /// Hold decryption rounds until the returned sender is used or dropped
    pub async fn hold_decryption(&self) -> async_channel::Sender<()> {
        let (sender, receiver) = async_channel::bounded(1);
        *self.gate.lock().await = Some(receiver);
        sender
    }

    /// Hold encryption calls, after recording their plaintext, until the
    /// returned sender is used or dropped. Each message releases one call.
    pub async fn hold_encryption(&self) -> async_channel::Sender<()> {
        let (sender, receiver) = async_channel::bounded(1);
        *self.encryption_gate.lock().await = Some(receiver);
        sender
    }
}

#[async_trait]
impl EncryptionEngine for MockFhe {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn initialize(&self) -> Result<()> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(Error::EncryptionFailure("relayer unreachable".to_string()))
        }

        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn encrypt(&self, _contract: &Address, user: &Address, value: u64) -> Result<EncryptedInput> {
        if !self.is_initialized() {
            return Err(Error::EncryptionUnavailable)
        }

        debug!(target: "test_harness::fhe", "Encrypting {} for {}", value, user);
        self.encrypted_values.lock().await.push(value);

        let gate = self.encryption_gate.lock().await.clone();
        if let Some(gate) = gate {
            let _ = gate.recv().await;
        }

        Ok(EncryptedInput {
            encrypted_data: (value ^ MOCK_KEY).to_be_bytes().to_vec(),
            proof: user.0.to_vec(),
        })
    }
}

#[async_trait]
impl DecryptionEngine for MockFhe {
    async fn decrypt(
        &self,
        handles: &[EncryptedHandle],
        _contract: &Address,
    ) -> Result<OffchainRevealResult> {
        self.decrypt_calls.lock().await.push(handles.to_vec());

        let gate = self.gate.lock().await.clone();
        if let Some(gate) = gate {
            let _ = gate.recv().await;
        }

        if let Some(e) = self.decrypt_failure.lock().await.take() {
            return Err(e)
        }

        let mut clear_values = HashMap::new();
        let mut ordered = vec![];
        for handle in handles {
            let ciphertext = self
                .ledger
                .ciphertext(handle)
                .await
                .ok_or_else(|| Error::NetworkFailure(format!("Unknown handle {handle}")))?;

            let bytes: [u8; 8] = ciphertext
                .try_into()
                .map_err(|_| Error::NetworkFailure(format!("Malformed ciphertext for {handle}")))?;

            let value = u64::from_be_bytes(bytes) ^ MOCK_KEY;
            clear_values.insert(handle.clone(), value);
            ordered.push(value);
        }

        Ok(OffchainRevealResult {
            clear_values,
            abi_encoded_clear_values: encode_clear_values(&ordered),
            decryption_proof: expected_decryption_proof(handles),
        })
    }
}
