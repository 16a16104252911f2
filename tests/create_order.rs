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

use std::time::Duration;

use carbonswap::{
    client::OrderForm,
    gateway::RawChainFailure,
    notifier::TxPhase,
    Error, Result,
};
use carbonswap_test_harness::{init_logger, Holder, TestHarness};
use smol::Timer;

const HOLDERS: [Holder; 2] = [Holder::Alice, Holder::Bob];

fn batch_form() -> OrderForm {
    OrderForm {
        name: "Batch-1".to_string(),
        amount: "500".to_string(),
        price: "25".to_string(),
        description: "test".to_string(),
    }
}

#[test]
fn create_order() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Alice).await?;
        let before = th.client.snapshot().await.book.stats.total_orders;

        th.client.open_create_form().await;
        let id = th.client.create_order(batch_form()).await?;

        // Only the amount goes through the encryption engine
        assert_eq!(th.fhe.encrypted_values().await, vec![500]);
        assert_eq!(th.ledger.create_calls(), 1);

        let stored = th.ledger.stored(&id).await.unwrap();
        assert_eq!(stored.public_value1, 25);
        assert_eq!(stored.creator, Holder::Alice.address());

        let snapshot = th.client.snapshot().await;
        assert_eq!(snapshot.book.stats.total_orders, before + 1);
        assert!(snapshot.create_form.is_none());
        assert!(!snapshot.creating);

        let order = snapshot.book.get(&id).unwrap();
        assert_eq!(order.name, "Batch-1");
        assert_eq!(order.description, "test");
        assert_eq!(order.public_price, 25);
        assert!(!order.is_verified);
        assert_eq!(order.verified_amount, None);
        assert_eq!(snapshot.status.phase, TxPhase::Success);

        Ok(())
    }))
}

#[test]
fn create_requires_identity() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        let err = th.client.create_order(batch_form()).await.unwrap_err();
        assert_eq!(err, Error::NotConnected);
        assert_eq!(th.ledger.create_calls(), 0);
        assert!(th.fhe.encrypted_values().await.is_empty());
        assert_eq!(th.client.notifier().current().await.phase, TxPhase::Error);
        Ok(())
    }))
}

#[test]
fn invalid_form_is_refused_locally() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Alice).await?;

        let form = OrderForm { amount: "0".to_string(), ..batch_form() };
        let err = th.client.create_order(form.clone()).await.unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        assert_eq!(th.ledger.create_calls(), 0);

        // The form stays populated for a retry
        assert_eq!(th.client.snapshot().await.create_form, Some(form));
        Ok(())
    }))
}

#[test]
fn rejected_signature_keeps_form() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Bob).await?;
        th.signer(&Holder::Bob).reject_all(true);

        let err = th.client.create_order(batch_form()).await.unwrap_err();
        assert_eq!(err, Error::UserRejected);

        let snapshot = th.client.snapshot().await;
        assert_eq!(snapshot.create_form, Some(batch_form()));
        assert!(!snapshot.creating);
        assert!(snapshot.book.orders.is_empty());
        assert_eq!(snapshot.status.phase, TxPhase::Error);
        assert_eq!(snapshot.status.message, "Transaction cancelled by user");

        // Retry once the user signs
        th.signer(&Holder::Bob).reject_all(false);
        let id = th.client.create_order(batch_form()).await?;
        assert!(th.client.snapshot().await.book.get(&id).is_some());
        Ok(())
    }))
}

#[test]
fn reverted_create_leaves_no_order() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Alice).await?;
        th.ledger.fail_next_wait(RawChainFailure::revert("Paused")).await;

        let err = th.client.create_order(batch_form()).await.unwrap_err();
        assert_eq!(err, Error::ChainReverted("Paused".to_string()));

        let snapshot = th.client.snapshot().await;
        assert!(snapshot.book.orders.is_empty());
        assert_eq!(snapshot.status.message, "Submission failed, please try again");
        Ok(())
    }))
}

#[test]
fn uninitialized_encryption_aborts_create() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.fhe.fail_init(true);
        th.connect(&Holder::Alice).await?;

        let err = th.client.create_order(batch_form()).await.unwrap_err();
        assert_eq!(err, Error::EncryptionUnavailable);
        assert_eq!(th.ledger.create_calls(), 0);
        assert_eq!(th.client.snapshot().await.create_form, Some(batch_form()));
        Ok(())
    }))
}

#[test]
fn ids_are_unique_within_a_tick() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Alice).await?;

        let a = th.create_order("A", 1, 1, "").await?;
        let b = th.create_order("B", 2, 2, "").await?;
        assert_ne!(a, b);
        assert_eq!(th.client.snapshot().await.book.stats.total_orders, 2);
        Ok(())
    }))
}

#[test]
fn overlapping_creates_keep_creating_flag() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Alice).await?;
        let release = th.fhe.hold_encryption().await;

        let client = th.client.clone();
        let first = th.executor.spawn(async move {
            client.create_order(OrderForm { name: "A".to_string(), ..batch_form() }).await
        });
        let client = th.client.clone();
        let second = th.executor.spawn(async move {
            client.create_order(OrderForm { name: "B".to_string(), ..batch_form() }).await
        });

        while th.fhe.encrypted_values().await.len() < 2 {
            Timer::after(Duration::from_millis(5)).await;
        }
        assert!(th.client.snapshot().await.creating);

        // One create finishes and reloads, the other is still encrypting
        release.send(()).await.unwrap();
        while th.client.snapshot().await.book.orders.is_empty() {
            Timer::after(Duration::from_millis(5)).await;
        }
        assert!(th.client.snapshot().await.creating);

        release.send(()).await.unwrap();
        let (a, b) = (first.await?, second.await?);
        assert_ne!(a, b);

        let snapshot = th.client.snapshot().await;
        assert!(!snapshot.creating);
        assert_eq!(snapshot.book.stats.total_orders, 2);
        Ok(())
    }))
}
