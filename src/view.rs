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

//! Presentation-side derived data.
//!
//! Nothing here holds protocol state. Everything is computed from a
//! [`Snapshot`], and user intents are forwarded to the [`OrderClient`].

use crate::{
    client::{OrderClient, RevealOutcome, RevealState, Snapshot},
    error::Result,
    model::{Address, Order, OrderId, RevealedAmount},
};

/// One line of the order list
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub id: OrderId,
    pub name: String,
    pub description: String,
    pub creator: Address,
    pub created_at: u64,
    pub public_price: u64,
    pub is_verified: bool,
    pub amount: Option<RevealedAmount>,
}

impl OrderRow {
    pub fn new(order: &Order, session_local: Option<u64>) -> Self {
        Self {
            id: order.id.clone(),
            name: order.name.clone(),
            description: order.description.clone(),
            creator: order.creator,
            created_at: order.created_at,
            public_price: order.public_price,
            is_verified: order.is_verified,
            amount: order.revealed_amount(session_local),
        }
    }

    /// All rows of a snapshot, in ledger order
    pub fn rows(snapshot: &Snapshot) -> Vec<Self> {
        snapshot.book.orders.iter().map(|o| Self::new(o, snapshot.local_amount(&o.id))).collect()
    }

    pub fn total_value(&self) -> Option<u128> {
        self.amount.map(|a| a.total_value(self.public_price))
    }

    pub fn amount_label(&self) -> Option<&'static str> {
        self.amount.map(|a| if a.is_authoritative() { "Verified" } else { "Local decrypt" })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub id: OrderId,
    pub price: u64,
    /// Bar height relative to the price range, 0 to 100
    pub height_pct: f64,
}

/// Public price distribution over the current orders
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChart {
    pub min_price: u64,
    pub max_price: u64,
    pub bars: Vec<PriceBar>,
}

impl PriceChart {
    pub fn from_orders(orders: &[Order]) -> Option<Self> {
        let min_price = orders.iter().map(|o| o.public_price).min()?;
        let max_price = orders.iter().map(|o| o.public_price).max()?;
        let range = (max_price - min_price).max(1) as f64;

        let bars = orders
            .iter()
            .map(|o| PriceBar {
                id: o.id.clone(),
                price: o.public_price,
                height_pct: (o.public_price - min_price) as f64 / range * 100.0,
            })
            .collect();

        Some(Self { min_price, max_price, bars })
    }
}

/// Reveal control of the order detail view.
///
/// Clicking while a value is displayed only hides it. Clicking on a
/// verified order shows the ledger value without any network call.
#[derive(Debug, Clone)]
pub struct RevealPanel {
    order_id: OrderId,
    displayed: Option<u64>,
}

impl RevealPanel {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id, displayed: None }
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn displayed(&self) -> Option<u64> {
        self.displayed
    }

    pub async fn on_reveal_clicked(&mut self, client: &OrderClient) -> Result<Option<u64>> {
        if self.displayed.take().is_some() {
            return Ok(None)
        }

        let snapshot = client.snapshot().await;
        if let RevealState::Verified(amount) = snapshot.reveal_state(&self.order_id) {
            self.displayed = Some(amount);
            return Ok(self.displayed)
        }

        self.displayed = match client.reveal(&self.order_id).await? {
            RevealOutcome::Verified { amount } | RevealOutcome::Unconfirmed { amount } => {
                Some(amount)
            }
            RevealOutcome::AlreadyVerified { amount } => amount,
            RevealOutcome::InFlight => None,
        };

        Ok(self.displayed)
    }

    /// Amount to show in the detail view; the ledger value dominates.
    /// A collapsed panel shows no session-local value.
    pub fn amount(&self, snapshot: &Snapshot) -> Option<RevealedAmount> {
        let order = snapshot.book.get(&self.order_id)?;
        order.revealed_amount(self.displayed)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use super::*;
    use crate::{
        client::LocalReveal,
        model::{OrderBook, RawOrder},
        notifier::TxStatus,
    };

    fn order(id: &str, price: u64) -> Order {
        Order::from_raw(
            OrderId::from(id),
            RawOrder {
                name: id.to_string(),
                public_value1: price,
                public_value2: 0,
                description: String::new(),
                creator: Address([3; 20]),
                timestamp: 1_700_000_000,
                is_verified: false,
                decrypted_value: 0,
            },
        )
    }

    #[test]
    fn empty_chart() {
        assert_eq!(PriceChart::from_orders(&[]), None);
    }

    #[test]
    fn chart_heights() {
        let chart = PriceChart::from_orders(&[order("a", 10), order("b", 30), order("c", 20)]).unwrap();
        assert_eq!(chart.min_price, 10);
        assert_eq!(chart.max_price, 30);
        let heights: Vec<f64> = chart.bars.iter().map(|b| b.height_pct).collect();
        assert_eq!(heights, vec![0.0, 100.0, 50.0]);
    }

    #[test]
    fn flat_chart() {
        let chart = PriceChart::from_orders(&[order("a", 25), order("b", 25)]).unwrap();
        assert!(chart.bars.iter().all(|b| b.height_pct == 0.0));
    }

    #[test]
    fn row_labels() {
        let o = order("a", 25);
        let row = OrderRow::new(&o, Some(500));
        assert_eq!(row.amount_label(), Some("Local decrypt"));
        assert_eq!(row.total_value(), Some(12_500));

        let row = OrderRow::new(&o, None);
        assert_eq!(row.amount_label(), None);
        assert_eq!(row.total_value(), None);
    }

    fn snapshot(orders: Vec<Order>, local_reveals: HashMap<OrderId, LocalReveal>) -> Snapshot {
        Snapshot {
            account: Some(Address([1; 20])),
            contract_address: None,
            book: Arc::new(OrderBook::new(orders, 1)),
            local_reveals,
            loading: false,
            reloading: false,
            creating: false,
            create_form: None,
            status: TxStatus::default(),
        }
    }

    #[test]
    fn collapsed_panel_hides_local_reveal() {
        let id = OrderId::from("a");
        let locals = HashMap::from([(id.clone(), LocalReveal::Revealed(500))]);
        let snapshot = snapshot(vec![order("a", 25)], locals);

        let mut panel = RevealPanel::new(id);
        assert_eq!(panel.amount(&snapshot), None);

        panel.displayed = Some(500);
        assert_eq!(panel.amount(&snapshot), Some(RevealedAmount::SessionLocal(500)));

        panel.displayed = None;
        assert_eq!(panel.amount(&snapshot), None);
    }

    #[test]
    fn collapsed_panel_keeps_ledger_value() {
        let mut verified = order("a", 25);
        verified.is_verified = true;
        verified.verified_amount = Some(500);
        let snapshot = snapshot(vec![verified], HashMap::new());

        let panel = RevealPanel::new(OrderId::from("a"));
        assert_eq!(panel.amount(&snapshot), Some(RevealedAmount::Authoritative(500)));
    }
}
