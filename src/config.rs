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

use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::{error::Result, model::Address};

/// Default dwell time of a success status, in milliseconds
pub const SUCCESS_DWELL_MS: u64 = 2000;

/// Default dwell time of an error status, in milliseconds
pub const ERROR_DWELL_MS: u64 = 3000;

/// Client configuration, usually read from a TOML file
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address of the deployed order contract, if known up front.
    /// When absent, the ledger reader's address is used.
    pub contract_address: Option<Address>,

    /// How long a success status stays visible
    pub success_dwell_ms: u64,

    /// How long an error status stays visible
    pub error_dwell_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contract_address: None,
            success_dwell_ms: SUCCESS_DWELL_MS,
            error_dwell_ms: ERROR_DWELL_MS,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn success_dwell(&self) -> Duration {
        Duration::from_millis(self.success_dwell_ms)
    }

    pub fn error_dwell(&self) -> Duration {
        Duration::from_millis(self.error_dwell_ms)
    }
}
