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
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use carbonswap::{
    gateway::{
        CreateOrderParams, LedgerReader, LedgerWriter, PendingTx, RawChainFailure, TxReceipt,
        ALREADY_VERIFIED_REASON,
    },
    model::{Address, EncryptedHandle, OrderId, RawOrder},
    Error, Result,
};
use log::debug;
use smol::lock::Mutex;

use crate::fhe::{decode_clear_values, expected_decryption_proof};

struct StoredOrder {
    raw: RawOrder,
    handle: EncryptedHandle,
    ciphertext: Vec<u8>,
}

/// In-memory stand-in for the order contract
pub struct MockLedger {
    contract: Address,
    /// Orders in creation order
    orders: Mutex<BTreeMap<u64, OrderId>>,
    store: Mutex<HashMap<OrderId, StoredOrder>>,
    next_index: AtomicU64,
    next_tx: AtomicU64,
    available: AtomicBool,
    fail_listing: AtomicBool,
    failing_reads: Mutex<HashSet<OrderId>>,
    /// Failure returned by the next `wait()` on any transaction
    fail_next_wait: Mutex<Option<RawChainFailure>>,
    /// Confirm the next verification without recording its value
    drop_next_verification: AtomicBool,
    create_calls: AtomicUsize,
    verification_calls: AtomicUsize,
}

impl MockLedger {
    pub fn new(contract: Address) -> Arc<Self> {
        Arc::new(Self {
            contract,
            orders: Mutex::new(BTreeMap::new()),
            store: Mutex::new(HashMap::new()),
            next_index: AtomicU64::new(0),
            next_tx: AtomicU64::new(0),
            available: AtomicBool::new(true),
            fail_listing: AtomicBool::new(false),
            failing_reads: Mutex::new(HashSet::new()),
            fail_next_wait: Mutex::new(None),
            drop_next_verification: AtomicBool::new(false),
            create_calls: AtomicUsize::new(0),
            verification_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make `getBusinessData` fail for `id`
    pub async fn fail_reads_of(&self, id: &OrderId) {
        self.failing_reads.lock().await.insert(id.clone());
    }

    pub async fn fail_next_wait(&self, failure: RawChainFailure) {
        *self.fail_next_wait.lock().await = Some(failure);
    }

    /// Let the next verification transaction confirm while the contract
    /// state stays unverified
    pub fn drop_next_verification(&self) {
        self.drop_next_verification.store(true, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn verification_calls(&self) -> usize {
        self.verification_calls.load(Ordering::SeqCst)
    }

    /// Raw view of a stored order, bypassing injected read failures
    pub async fn stored(&self, id: &OrderId) -> Option<RawOrder> {
        self.store.lock().await.get(id).map(|o| o.raw.clone())
    }

    /// Ciphertext behind `handle`, as the decryption relay would see it
    pub async fn ciphertext(&self, handle: &EncryptedHandle) -> Option<Vec<u8>> {
        self.store.lock().await.values().find(|o| &o.handle == handle).map(|o| o.ciphertext.clone())
    }

    /// Record a verified cleared value directly, as another client would
    pub async fn force_verify(&self, id: &OrderId, value: u64) {
        if let Some(order) = self.store.lock().await.get_mut(id) {
            order.raw.is_verified = true;
            order.raw.decrypted_value = value;
        }
    }

    fn next_tx_hash(&self) -> String {
        format!("0x{:064x}", self.next_tx.fetch_add(1, Ordering::SeqCst))
    }

    async fn apply(&self, action: TxAction) -> std::result::Result<(), RawChainFailure> {
        if let Some(failure) = self.fail_next_wait.lock().await.take() {
            return Err(failure)
        }

        match action {
            TxAction::Create { creator, params } => {
                let mut store = self.store.lock().await;
                if store.contains_key(&params.id) {
                    return Err(RawChainFailure::revert("Order already exists"))
                }

                let timestamp =
                    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);

                let raw = RawOrder {
                    name: params.name,
                    public_value1: params.public_price,
                    public_value2: 0,
                    description: params.description,
                    creator,
                    timestamp,
                    is_verified: false,
                    decrypted_value: 0,
                };
                let handle = EncryptedHandle(format!("handle:{}", params.id));
                debug!(target: "test_harness::ledger", "Stored order {}", params.id);
                store.insert(
                    params.id.clone(),
                    StoredOrder { raw, handle, ciphertext: params.encrypted_amount },
                );
                drop(store);

                let index = self.next_index.fetch_add(1, Ordering::SeqCst);
                self.orders.lock().await.insert(index, params.id);
                Ok(())
            }

            TxAction::Verify { id, clear_values, proof } => {
                let mut store = self.store.lock().await;
                let Some(order) = store.get_mut(&id) else {
                    return Err(RawChainFailure::revert("Order does not exist"))
                };

                if order.raw.is_verified {
                    return Err(RawChainFailure::revert(ALREADY_VERIFIED_REASON))
                }

                if proof != expected_decryption_proof(&[order.handle.clone()]) {
                    return Err(RawChainFailure::revert("Invalid decryption proof"))
                }

                let Some(value) = decode_clear_values(&clear_values).first().copied() else {
                    return Err(RawChainFailure::revert("Malformed clear values"))
                };

                if self.drop_next_verification.swap(false, Ordering::SeqCst) {
                    debug!(target: "test_harness::ledger", "Dropping verification of {}", id);
                    return Ok(())
                }

                debug!(target: "test_harness::ledger", "Order {} verified with {}", id, value);
                order.raw.is_verified = true;
                order.raw.decrypted_value = value;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    fn contract_address(&self) -> Address {
        self.contract
    }

    async fn list_all(&self) -> Result<Vec<OrderId>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(RawChainFailure::transport("connection refused").into())
        }

        Ok(self.orders.lock().await.values().cloned().collect())
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<RawOrder> {
        if self.failing_reads.lock().await.contains(id) {
            return Err(RawChainFailure::transport("request timed out").into())
        }

        self.stored(id).await.ok_or_else(|| Error::OrderNotFound(id.clone()))
    }

    async fn fetch_encrypted_handle(&self, id: &OrderId) -> Result<EncryptedHandle> {
        self.store
            .lock()
            .await
            .get(id)
            .map(|o| o.handle.clone())
            .ok_or_else(|| Error::OrderNotFound(id.clone()))
    }

    async fn probe_availability(&self) -> Result<bool> {
        Ok(self.available.load(Ordering::SeqCst))
    }
}

enum TxAction {
    Create { creator: Address, params: CreateOrderParams },
    Verify { id: OrderId, clear_values: Vec<u8>, proof: Vec<u8> },
}

pub struct MockPendingTx {
    tx_hash: String,
    ledger: Arc<MockLedger>,
    action: TxAction,
}

#[async_trait]
impl PendingTx for MockPendingTx {
    fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    async fn wait(self: Box<Self>) -> Result<TxReceipt> {
        let Self { tx_hash, ledger, action } = *self;
        ledger.apply(action).await?;
        Ok(TxReceipt { tx_hash })
    }
}

/// Signer bound to one account of the [`MockLedger`]
pub struct MockSigner {
    address: Address,
    ledger: Arc<MockLedger>,
    reject_all: AtomicBool,
}

impl MockSigner {
    pub fn new(address: Address, ledger: Arc<MockLedger>) -> Arc<Self> {
        Arc::new(Self { address, ledger, reject_all: AtomicBool::new(false) })
    }

    /// Decline every signature request until reset
    pub fn reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    fn check_signature(&self) -> Result<()> {
        if self.reject_all.load(Ordering::SeqCst) {
            return Err(RawChainFailure::user_rejected().into())
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerWriter for MockSigner {
    fn signer_address(&self) -> Address {
        self.address
    }

    async fn submit_create(&self, params: CreateOrderParams) -> Result<Box<dyn PendingTx>> {
        self.ledger.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_signature()?;

        Ok(Box::new(MockPendingTx {
            tx_hash: self.ledger.next_tx_hash(),
            ledger: self.ledger.clone(),
            action: TxAction::Create { creator: self.address, params },
        }))
    }

    async fn submit_verification(
        &self,
        id: &OrderId,
        clear_values: Vec<u8>,
        decryption_proof: Vec<u8>,
    ) -> Result<Box<dyn PendingTx>> {
        self.ledger.verification_calls.fetch_add(1, Ordering::SeqCst);
        self.check_signature()?;

        Ok(Box::new(MockPendingTx {
            tx_hash: self.ledger.next_tx_hash(),
            ledger: self.ledger.clone(),
            action: TxAction::Verify { id: id.clone(), clear_values, proof: decryption_proof },
        }))
    }
}
