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

use log::{debug, info, warn};

use crate::{
    error::{Error, Result},
    model::OrderId,
};

use super::{Identity, OrderClient};

mod builder;
pub use builder::CreateCallBuilder;

/// Creation form contents, as typed in by the user
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OrderForm {
    pub name: String,
    pub amount: String,
    pub price: String,
    pub description: String,
}

/// A validated order creation request
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CreateOrderRequest {
    pub name: String,
    pub amount: u64,
    pub price: u64,
    pub description: String,
}

fn parse_positive(field: &str, value: &str) -> Result<u64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::ValidationError(format!("{field} is required")))
    }

    match value.parse::<u64>() {
        Ok(0) => Err(Error::ValidationError(format!("{field} must be positive"))),
        Ok(v) => Ok(v),
        Err(_) => Err(Error::ValidationError(format!("{field} must be a positive integer"))),
    }
}

impl OrderForm {
    pub fn validate(&self) -> Result<CreateOrderRequest> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::ValidationError("Name is required".to_string()))
        }

        Ok(CreateOrderRequest {
            name: name.to_string(),
            amount: parse_positive("Amount", &self.amount)?,
            price: parse_positive("Price", &self.price)?,
            description: self.description.clone(),
        })
    }
}

impl OrderClient {
    /// Open the creation form with empty fields, unless it is already open.
    pub async fn open_create_form(&self) {
        self.update(|state| {
            state.create_form.get_or_insert_with(OrderForm::default);
        })
        .await;
    }

    pub async fn close_create_form(&self) {
        self.update(|state| state.create_form = None).await;
    }

    /// Create a confidential order.
    ///
    /// The order only becomes visible through the reload that follows a
    /// confirmed transaction. On failure the form stays populated.
    pub async fn create_order(&self, form: OrderForm) -> Result<OrderId> {
        let Some(identity) = self.identity().await else {
            self.notifier.error(Error::NotConnected.status_message()).await;
            return Err(Error::NotConnected)
        };

        let request = match form.validate() {
            Ok(request) => request,
            Err(e) => {
                self.update(|state| state.create_form = Some(form)).await;
                self.notifier.error(e.status_message()).await;
                return Err(e)
            }
        };

        self.update(|state| {
            state.creates_in_flight += 1;
            state.create_form = Some(form);
        })
        .await;
        self.notifier.pending("Creating order with encrypted amount...").await;

        let result = self.submit_create(&identity, request).await;
        self.update(|state| state.creates_in_flight -= 1).await;

        match result {
            Ok(id) => {
                info!(target: "carbonswap::client::create", "Order {} created", id);
                self.notifier.success("Order created").await;

                if let Err(e) = self.reload().await {
                    warn!(target: "carbonswap::client::create", "Reload after creating {} failed: {}", id, e);
                }

                self.update(|state| state.create_form = None).await;
                Ok(id)
            }

            Err(e) => {
                warn!(target: "carbonswap::client::create", "Order creation failed: {}", e);
                self.notifier.error(e.failure_banner("Submission")).await;
                Err(e)
            }
        }
    }

    /// encrypt -> submit -> await confirmation
    async fn submit_create(&self, identity: &Identity, request: CreateOrderRequest) -> Result<OrderId> {
        let id = self.next_order_id(&identity.address);

        let builder = CreateCallBuilder { id: id.clone(), creator: identity.address, request };
        let params = builder.build(&self.adapter).await?;

        let tx = identity.signer.submit_create(params).await?;
        debug!(target: "carbonswap::client::create", "Create tx {} submitted for {}", tx.tx_hash(), id);
        self.notifier.pending("Waiting for transaction confirmation...").await;

        let receipt = tx.wait().await?;
        debug!(target: "carbonswap::client::create", "Create tx {} confirmed", receipt.tx_hash);
        Ok(id)
    }
}
