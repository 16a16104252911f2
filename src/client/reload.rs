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

use std::sync::{atomic::Ordering, Arc};

use futures::future::join_all;
use log::{debug, error, info, warn};

use crate::{
    error::Result,
    model::{Order, OrderBook},
};

use super::{LocalReveal, OrderClient, State};

impl OrderClient {
    /// Rebuild the order book from the ledger.
    ///
    /// This is the only way orders are discovered or refreshed. A failing
    /// single-order read drops that order from the result; a failing id
    /// listing leaves the current book untouched. The returned book is the
    /// one in effect afterwards, which is a newer one if this reload was
    /// overtaken by a later reload that already completed.
    pub async fn reload(&self) -> Result<Arc<OrderBook>> {
        let seq = self.reload_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(target: "carbonswap::client::reload", "Starting reload #{}", seq);
        self.update(|state| state.reloads_in_flight += 1).await;

        let fetched = self.fetch_orders().await;

        let result = self
            .update(|state| {
                state.reloads_in_flight -= 1;
                fetched.map(|orders| state.apply_reload(seq, orders))
            })
            .await;

        if let Err(e) = &result {
            error!(target: "carbonswap::client::reload", "Reload #{} failed: {}", seq, e);
            self.notifier.error("Failed to load data").await;
        }

        result
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>> {
        let ids = self.reader.list_all().await?;

        let reads = ids.into_iter().map(|id| async move {
            let raw = self.reader.fetch_order(&id).await;
            (id, raw)
        });

        let mut orders = vec![];
        for (id, raw) in join_all(reads).await {
            match raw {
                Ok(raw) => orders.push(Order::from_raw(id, raw)),
                Err(e) => {
                    warn!(target: "carbonswap::client::reload", "Skipping order {}: {}", id, e)
                }
            }
        }

        Ok(orders)
    }
}

impl State {
    /// Atomically replace the book with a reload's result, unless a reload
    /// started later has already been applied.
    fn apply_reload(&mut self, seq: u64, mut orders: Vec<Order>) -> Arc<OrderBook> {
        if seq <= self.applied_reload_seq {
            debug!(
                target: "carbonswap::client::reload",
                "Discarding reload #{}, #{} is already applied", seq, self.applied_reload_seq,
            );
            return self.book.clone()
        }

        for order in orders.iter_mut().filter(|o| !o.is_verified) {
            if let Some(prev) = self.book.get(&order.id).filter(|p| p.is_verified) {
                warn!(
                    target: "carbonswap::client::reload",
                    "Ledger reports verified order {} as unverified, keeping verified record", order.id,
                );
                order.is_verified = true;
                order.verified_amount = prev.verified_amount;
            }
        }

        // Ledger-verified amounts supersede session-local ones
        for order in orders.iter().filter(|o| o.is_verified) {
            if let Some(LocalReveal::Revealed(local)) = self.local_reveals.get(&order.id) {
                if order.verified_amount != Some(*local) {
                    warn!(
                        target: "carbonswap::client::reload",
                        "Order {} verified as {:?}, local reveal was {}",
                        order.id, order.verified_amount, local,
                    );
                }
                self.local_reveals.remove(&order.id);
            }
        }

        self.book = Arc::new(OrderBook::new(orders, seq));
        self.applied_reload_seq = seq;

        info!(
            target: "carbonswap::client::reload",
            "Reload #{} applied: {} orders, {} verified",
            seq, self.book.stats.total_orders, self.book.stats.verified_orders,
        );
        self.book.clone()
    }
}
