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

use std::{collections::HashMap, sync::Arc};

use carbonswap::{
    client::{Identity, OrderClient, OrderClientPtr, OrderForm},
    config::Config,
    model::{Address, OrderId},
    system::ExecutorPtr,
    Result,
};
use log::debug;

mod fhe;
pub use fhe::{decode_clear_values, encode_clear_values, expected_decryption_proof, MockFhe};

mod ledger;
pub use ledger::{MockLedger, MockPendingTx, MockSigner};

/// Address of the mock order contract
pub const CONTRACT_ADDRESS: Address = Address([0xcc; 20]);

/// Status dwell times short enough for tests to wait them out
pub const TEST_SUCCESS_DWELL_MS: u64 = 200;
pub const TEST_ERROR_DWELL_MS: u64 = 300;

pub fn init_logger() {
    let mut cfg = simplelog::ConfigBuilder::new();
    cfg.add_filter_ignore("async_io".to_string());
    cfg.add_filter_ignore("polling".to_string());

    // We check this error so we can execute same file tests in parallel,
    // otherwise second one fails to init logger here.
    if simplelog::TermLogger::init(
        //simplelog::LevelFilter::Info,
        simplelog::LevelFilter::Debug,
        //simplelog::LevelFilter::Trace,
        cfg.build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .is_err()
    {
        debug!(target: "test_harness", "Logger initialized");
    }
}

/// Enum representing configured wallet holders
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Holder {
    Alice,
    Bob,
}

impl Holder {
    pub fn address(&self) -> Address {
        match self {
            Holder::Alice => Address([0xa1; 20]),
            Holder::Bob => Address([0xb0; 20]),
        }
    }
}

/// Wires an [`OrderClient`] to the in-memory ledger and engines
pub struct TestHarness {
    pub executor: ExecutorPtr,
    pub ledger: Arc<MockLedger>,
    pub fhe: Arc<MockFhe>,
    pub client: OrderClientPtr,
    pub signers: HashMap<Holder, Arc<MockSigner>>,
}

impl TestHarness {
    pub fn new(holders: &[Holder]) -> Self {
        let config = Config {
            contract_address: Some(CONTRACT_ADDRESS),
            success_dwell_ms: TEST_SUCCESS_DWELL_MS,
            error_dwell_ms: TEST_ERROR_DWELL_MS,
        };
        Self::with_config(holders, &config)
    }

    pub fn with_config(holders: &[Holder], config: &Config) -> Self {
        let executor = Arc::new(smol::Executor::new());
        let ledger = MockLedger::new(config.contract_address.unwrap_or(CONTRACT_ADDRESS));
        let fhe = MockFhe::new(ledger.clone());

        let client =
            OrderClient::new(config, ledger.clone(), fhe.clone(), fhe.clone(), executor.clone());

        let signers = holders
            .iter()
            .map(|holder| (*holder, MockSigner::new(holder.address(), ledger.clone())))
            .collect();

        Self { executor, ledger, fhe, client, signers }
    }

    pub fn signer(&self, holder: &Holder) -> Arc<MockSigner> {
        self.signers[holder].clone()
    }

    /// Connect the client as `holder`
    pub async fn connect(&self, holder: &Holder) -> Result<()> {
        let signer = self.signer(holder);
        self.client.connect(Identity::new(signer)).await
    }

    /// Submit an order through the creation flow
    pub async fn create_order(
        &self,
        name: &str,
        amount: u64,
        price: u64,
        description: &str,
    ) -> Result<OrderId> {
        let form = OrderForm {
            name: name.to_string(),
            amount: amount.to_string(),
            price: price.to_string(),
            description: description.to_string(),
        };
        self.client.create_order(form).await
    }
}
