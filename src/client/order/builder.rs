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

use log::debug;

use crate::{
    confidential::ConfidentialValueAdapter,
    error::Result,
    gateway::CreateOrderParams,
    model::{Address, OrderId},
};

use super::CreateOrderRequest;

/// Struct holding necessary information to build a `createBusinessData` call.
pub struct CreateCallBuilder {
    /// Freshly generated order id
    pub id: OrderId,
    /// Account creating the order
    pub creator: Address,
    /// Validated form contents
    pub request: CreateOrderRequest,
}

impl CreateCallBuilder {
    /// Encrypt the amount and assemble the call parameters.
    /// Only the amount is confidential, the price is submitted in the clear.
    pub async fn build(self, adapter: &ConfidentialValueAdapter) -> Result<CreateOrderParams> {
        debug!(target: "carbonswap::client::order::build", "Encrypting amount for order {}", self.id);
        let encrypted = adapter.submit_encrypted(&self.creator, self.request.amount).await?;

        Ok(CreateOrderParams {
            id: self.id,
            name: self.request.name,
            encrypted_amount: encrypted.encrypted_data,
            proof: encrypted.proof,
            public_price: self.request.price,
            description: self.request.description,
        })
    }
}
