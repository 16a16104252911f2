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

//! Order Client API
//!
//! This module implements the order orchestrator: the client-side state
//! machine driving order creation, full reloads and the reveal/verify
//! protocol. It owns the authoritative in-memory order book and exposes
//! it to the presentation layer as immutable [`Snapshot`]s, published
//! after every mutation.
//!
//! Note that the orchestrator does not talk to any wallet UI. It only
//! takes an [`Identity`] carrying a signer-bound [`LedgerWriter`] from
//! the caller, so wallet and network selection stay outside of it.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use log::{debug, error, info};
use smol::lock::Mutex;

use crate::{
    config::Config,
    confidential::{ConfidentialValueAdapter, DecryptionEngine, EncryptionEngine},
    error::Result,
    gateway::{LedgerReader, LedgerWriter},
    model::{Address, Order, OrderBook, OrderId},
    notifier::{StatusNotifier, StatusNotifierPtr, TxStatus},
    system::{ExecutorPtr, Publisher, PublisherPtr, Subscription},
};

pub mod order;
pub use order::{CreateOrderRequest, OrderForm};

mod reload;

mod reveal;
pub use reveal::RevealOutcome;

/// An authenticated account together with its transaction signer
#[derive(Clone)]
pub struct Identity {
    pub address: Address,
    pub signer: Arc<dyn LedgerWriter>,
}

impl Identity {
    pub fn new(signer: Arc<dyn LedgerWriter>) -> Self {
        Self { address: signer.signer_address(), signer }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity").field("address", &self.address).finish()
    }
}

/// Session-local progress of a reveal that the ledger has not confirmed yet
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LocalReveal {
    /// Decryption round and on-chain submission in flight
    Pending,
    /// Cleared off-chain this session, not yet observed as verified
    Revealed(u64),
}

/// Reveal state of one order as seen by the orchestrator
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RevealState {
    NoLocalReveal,
    LocalRevealPending,
    LocalRevealed(u64),
    /// Ledger-recorded cleared amount
    Verified(u64),
}

impl RevealState {
    fn derive(order: Option<&Order>, local: Option<&LocalReveal>) -> Self {
        if let Some(Order { is_verified: true, verified_amount: Some(amount), .. }) = order {
            return Self::Verified(*amount)
        }

        match local {
            Some(LocalReveal::Pending) => Self::LocalRevealPending,
            Some(LocalReveal::Revealed(amount)) => Self::LocalRevealed(*amount),
            None => Self::NoLocalReveal,
        }
    }
}

/// Immutable view of the orchestrator state handed to the presentation layer
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub account: Option<Address>,
    pub contract_address: Option<Address>,
    pub book: Arc<OrderBook>,
    pub local_reveals: HashMap<OrderId, LocalReveal>,
    /// Initial load after connecting is running
    pub loading: bool,
    /// At least one reload is in flight
    pub reloading: bool,
    /// At least one order creation is in flight
    pub creating: bool,
    /// Creation form contents, `Some` while the form is open
    pub create_form: Option<OrderForm>,
    pub status: TxStatus,
}

impl Snapshot {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn reveal_state(&self, id: &OrderId) -> RevealState {
        RevealState::derive(self.book.get(id), self.local_reveals.get(id))
    }

    /// Session-local cleared amount, if any
    pub fn local_amount(&self, id: &OrderId) -> Option<u64> {
        match self.local_reveals.get(id) {
            Some(LocalReveal::Revealed(amount)) => Some(*amount),
            _ => None,
        }
    }
}

#[derive(Default)]
struct State {
    identity: Option<Identity>,
    contract_address: Option<Address>,
    book: Arc<OrderBook>,
    /// Sequence number of the reload whose result is currently in `book`
    applied_reload_seq: u64,
    reloads_in_flight: usize,
    local_reveals: HashMap<OrderId, LocalReveal>,
    create_form: Option<OrderForm>,
    creates_in_flight: usize,
    loading: bool,
}

impl State {
    fn reveal_state(&self, id: &OrderId) -> RevealState {
        RevealState::derive(self.book.get(id), self.local_reveals.get(id))
    }

    fn snapshot(&self, status: TxStatus) -> Snapshot {
        Snapshot {
            account: self.identity.as_ref().map(|i| i.address),
            contract_address: self.contract_address,
            book: self.book.clone(),
            local_reveals: self.local_reveals.clone(),
            loading: self.loading,
            reloading: self.reloads_in_flight > 0,
            creating: self.creates_in_flight > 0,
            create_form: self.create_form.clone(),
            status,
        }
    }
}

pub type OrderClientPtr = Arc<OrderClient>;

/// The order orchestrator
pub struct OrderClient {
    reader: Arc<dyn LedgerReader>,
    adapter: ConfidentialValueAdapter,
    notifier: StatusNotifierPtr,
    state: Mutex<State>,
    publisher: PublisherPtr<Arc<Snapshot>>,
    reload_seq: AtomicU64,
    order_counter: AtomicU64,
}

impl OrderClient {
    pub fn new(
        config: &Config,
        reader: Arc<dyn LedgerReader>,
        encryption: Arc<dyn EncryptionEngine>,
        decryption: Arc<dyn DecryptionEngine>,
        executor: ExecutorPtr,
    ) -> OrderClientPtr {
        let contract = config.contract_address.unwrap_or_else(|| reader.contract_address());

        Arc::new(Self {
            adapter: ConfidentialValueAdapter::new(encryption, decryption, contract),
            reader,
            notifier: StatusNotifier::new(executor, config),
            state: Mutex::new(State::default()),
            publisher: Publisher::new(),
            reload_seq: AtomicU64::new(0),
            order_counter: AtomicU64::new(0),
        })
    }

    pub fn notifier(&self) -> &StatusNotifierPtr {
        &self.notifier
    }

    /// Current state of the orchestrator
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        let status = self.notifier.current().await;
        Arc::new(self.state.lock().await.snapshot(status))
    }

    /// Receive a fresh [`Snapshot`] after every state change.
    /// Status banner changes are published by [`StatusNotifier::subscribe`].
    pub async fn subscribe(&self) -> Subscription<Arc<Snapshot>> {
        self.publisher.clone().subscribe().await
    }

    /// Single mutation entry point: apply `f` and publish the result.
    async fn update<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let status = self.notifier.current().await;
        let (ret, snapshot) = {
            let mut state = self.state.lock().await;
            let ret = f(&mut state);
            (ret, Arc::new(state.snapshot(status)))
        };

        self.publisher.notify(snapshot).await;
        ret
    }

    async fn identity(&self) -> Option<Identity> {
        self.state.lock().await.identity.clone()
    }

    /// Current reveal state of order `id`
    pub async fn reveal_state(&self, id: &OrderId) -> RevealState {
        self.state.lock().await.reveal_state(id)
    }

    /// Attach an authenticated identity and perform the initial load.
    pub async fn connect(&self, identity: Identity) -> Result<()> {
        info!(target: "carbonswap::client", "Connecting account {}", identity.address);
        self.update(|state| {
            state.identity = Some(identity);
            state.loading = true;
        })
        .await;

        if let Err(e) = self.adapter.initialize().await {
            error!(target: "carbonswap::client", "Encryption engine initialization failed: {}", e);
            self.notifier.error("Encryption engine initialization failed").await;
        }

        let result = self.reload().await.map(|_| ());

        let contract = self.adapter.contract_address();
        self.update(|state| {
            state.contract_address = Some(contract);
            state.loading = false;
        })
        .await;

        result
    }

    /// Drop the identity along with everything that belongs to its session.
    pub async fn disconnect(&self) {
        info!(target: "carbonswap::client", "Disconnecting");
        self.update(|state| {
            state.identity = None;
            state.contract_address = None;
            state.book = Arc::new(OrderBook::default());
            state.local_reveals.clear();
            state.create_form = None;
            state.loading = false;
        })
        .await;
    }

    /// Ask the contract whether it is available.
    pub async fn check_availability(&self) -> Result<bool> {
        self.notifier.pending("Checking contract availability...").await;

        match self.reader.probe_availability().await {
            Ok(true) => {
                self.notifier.success("Contract is available").await;
                Ok(true)
            }
            Ok(false) => {
                self.notifier.error("Contract is unavailable").await;
                Ok(false)
            }
            Err(e) => {
                error!(target: "carbonswap::client", "Availability check failed: {}", e);
                self.notifier.error("Availability check failed").await;
                Err(e)
            }
        }
    }

    fn next_order_id(&self, creator: &Address) -> OrderId {
        let counter = self.order_counter.fetch_add(1, Ordering::SeqCst);
        let millis =
            SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();

        let id = OrderId::generate(creator, counter, millis);
        debug!(target: "carbonswap::client", "Generated order id {}", id);
        id
    }
}
