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

use carbonswap::{notifier::TxPhase, view::PriceChart, Result};
use carbonswap_test_harness::{init_logger, Holder, TestHarness};

const HOLDERS: [Holder; 2] = [Holder::Alice, Holder::Bob];

#[test]
fn failing_read_drops_only_that_order() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Alice).await?;
        let a = th.create_order("A", 10, 100, "").await?;
        let b = th.create_order("B", 20, 200, "").await?;
        let c = th.create_order("C", 30, 300, "").await?;

        th.ledger.fail_reads_of(&b).await;
        let book = th.client.reload().await?;

        assert_eq!(book.stats.total_orders, 2);
        assert!(book.get(&a).is_some());
        assert!(book.get(&b).is_none());
        assert!(book.get(&c).is_some());
        assert_eq!(book.stats.avg_price, 200.0);
        Ok(())
    }))
}

#[test]
fn failing_listing_keeps_previous_book() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Alice).await?;
        let id = th.create_order("A", 10, 100, "").await?;
        let before = th.client.snapshot().await.book.clone();

        th.ledger.fail_listing(true);
        assert!(th.client.reload().await.is_err());

        let snapshot = th.client.snapshot().await;
        assert_eq!(snapshot.book, before);
        assert!(snapshot.book.get(&id).is_some());
        assert!(!snapshot.reloading);
        assert_eq!(snapshot.status.phase, TxPhase::Error);
        assert_eq!(snapshot.status.message, "Failed to load data");

        th.ledger.fail_listing(false);
        assert_eq!(th.client.reload().await?.stats.total_orders, 1);
        Ok(())
    }))
}

#[test]
fn empty_ledger_has_zero_stats() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Bob).await?;

        let book = th.client.reload().await?;
        assert!(book.orders.is_empty());
        assert_eq!(book.stats.total_orders, 0);
        assert_eq!(book.stats.verified_orders, 0);
        assert_eq!(book.stats.avg_price, 0.0);
        assert!(PriceChart::from_orders(&book.orders).is_none());
        Ok(())
    }))
}

#[test]
fn stats_follow_the_ledger() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Alice).await?;
        let cheap = th.create_order("Cheap", 5, 10, "").await?;
        th.create_order("Pricey", 5, 30, "").await?;

        // Verified elsewhere, only picked up by a reload
        th.ledger.force_verify(&cheap, 5).await;
        assert_eq!(th.client.snapshot().await.book.stats.verified_orders, 0);

        let book = th.client.reload().await?;
        assert_eq!(book.stats.total_orders, 2);
        assert_eq!(book.stats.verified_orders, 1);
        assert_eq!(book.stats.avg_price, 20.0);
        assert_eq!(book.get(&cheap).unwrap().verified_amount, Some(5));

        let chart = PriceChart::from_orders(&book.orders).unwrap();
        assert_eq!((chart.min_price, chart.max_price), (10, 30));
        assert_eq!(chart.bars.len(), 2);
        Ok(())
    }))
}

#[test]
fn concurrent_reloads_settle_on_latest() -> Result<()> {
    init_logger();
    let th = TestHarness::new(&HOLDERS);
    let ex = th.executor.clone();

    smol::block_on(ex.run(async {
        th.connect(&Holder::Alice).await?;
        th.create_order("A", 1, 1, "").await?;

        let (first, second) = futures::join!(th.client.reload(), th.client.reload());
        let (first, second) = (first?, second?);

        let snapshot = th.client.snapshot().await;
        assert!(!snapshot.reloading);
        assert_eq!(snapshot.book.reload_seq, first.reload_seq.max(second.reload_seq));
        assert_eq!(snapshot.book.stats.total_orders, 1);
        Ok(())
    }))
}
