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

//! Confidential carbon-credit order client.
//!
//! Order amounts are stored encrypted on a ledger contract and only become
//! public through an explicit reveal: an off-chain decryption round whose
//! proof is then verified on-chain. Prices stay public.

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub mod model;
pub mod system;

/// Ledger contract ports
pub mod gateway;

/// Encryption and decryption engine ports
pub mod confidential;

pub mod notifier;

/// Order orchestrator
pub mod client;

pub mod view;
