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

use crate::model::OrderId;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the order client.
///
/// Raw provider failures are classified into these variants at the
/// ledger gateway boundary (see [`crate::gateway::RawChainFailure`]),
/// so nothing downstream has to inspect error strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("No wallet connected")]
    NotConnected,

    #[error("Invalid order form: {0}")]
    ValidationError(String),

    #[error("Encryption engine is not initialized")]
    EncryptionUnavailable,

    #[error("Encryption failed: {0}")]
    EncryptionFailure(String),

    #[error("Transaction rejected by user")]
    UserRejected,

    #[error("Data already verified")]
    AlreadyVerified,

    #[error("Contract reverted: {0}")]
    ChainReverted(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Order {0} not found on ledger")]
    OrderNotFound(OrderId),

    #[error("Decryption result is missing the requested handle")]
    MissingClearValue,

    #[error("Order {0} is not verified on ledger after a successful reveal")]
    ConsistencyFault(OrderId),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// A signer declining a transaction is a cancellation, not a fault.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::UserRejected)
    }

    /// Banner text for a failed `action`.
    /// Revert reasons and transport detail only go to the logs.
    pub fn failure_banner(&self, action: &str) -> String {
        match self {
            e if e.is_benign() => e.status_message(),
            Self::ChainReverted(_) | Self::NetworkFailure(_) => {
                format!("{action} failed, please try again")
            }
            e => format!("{action} failed: {e}"),
        }
    }

    /// Short banner text for the status notifier.
    pub fn status_message(&self) -> String {
        match self {
            Self::NotConnected => "Please connect a wallet first".to_string(),
            Self::UserRejected => "Transaction cancelled by user".to_string(),
            Self::AlreadyVerified => "Data already verified on-chain".to_string(),
            e => e.to_string(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benign_errors() {
        assert!(Error::UserRejected.is_benign());
        assert!(!Error::ChainReverted("out of gas".to_string()).is_benign());
        assert!(!Error::AlreadyVerified.is_benign());
    }

    #[test]
    fn failure_banners_hide_provider_detail() {
        let reverted = Error::ChainReverted("Paused".to_string());
        assert_eq!(reverted.failure_banner("Submission"), "Submission failed, please try again");

        let transport = Error::NetworkFailure("connection refused".to_string());
        assert_eq!(transport.failure_banner("Decryption"), "Decryption failed, please try again");

        assert_eq!(Error::UserRejected.failure_banner("Decryption"), "Transaction cancelled by user");
        assert_eq!(
            Error::EncryptionUnavailable.failure_banner("Submission"),
            "Submission failed: Encryption engine is not initialized"
        );
    }

    #[test]
    fn status_messages() {
        assert_eq!(Error::UserRejected.status_message(), "Transaction cancelled by user");
        assert_eq!(
            Error::NetworkFailure("timeout".to_string()).status_message(),
            "Network failure: timeout"
        );
    }
}
