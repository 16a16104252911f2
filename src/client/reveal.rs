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

use super::{Identity, LocalReveal, OrderClient, RevealState};

/// How a reveal request ended
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RevealOutcome {
    /// Decrypted, verified on-chain, and observed as verified by the
    /// following reload. `amount` is the ledger-recorded value.
    Verified { amount: u64 },
    /// The ledger already held a cleared value, so no decryption round
    /// and no verification transaction were issued.
    AlreadyVerified { amount: Option<u64> },
    /// Decrypted and submitted, but the following reload did not observe
    /// the order as verified. `amount` is session-local only.
    Unconfirmed { amount: u64 },
    /// A reveal of this order is already running
    InFlight,
}

enum Round {
    AlreadyVerified(u64),
    Revealed(u64),
}

impl OrderClient {
    /// Reveal the encrypted amount of order `id` and record it on-chain.
    ///
    /// Safe to call concurrently for distinct orders. Calling it for an
    /// order that is verified or already being revealed issues no network
    /// call at all.
    pub async fn reveal(&self, id: &OrderId) -> Result<RevealOutcome> {
        let Some(identity) = self.identity().await else {
            self.notifier.error(Error::NotConnected.status_message()).await;
            return Err(Error::NotConnected)
        };

        let previous = self
            .update(|state| {
                let current = state.reveal_state(id);
                if let RevealState::NoLocalReveal | RevealState::LocalRevealed(_) = current {
                    state.local_reveals.insert(id.clone(), LocalReveal::Pending);
                }
                current
            })
            .await;

        match previous {
            RevealState::Verified(amount) => {
                debug!(target: "carbonswap::client::reveal", "Order {} already verified locally", id);
                self.notifier.success("Data already verified on-chain").await;
                return Ok(RevealOutcome::AlreadyVerified { amount: Some(amount) })
            }
            RevealState::LocalRevealPending => {
                debug!(target: "carbonswap::client::reveal", "Reveal of {} already in flight", id);
                return Ok(RevealOutcome::InFlight)
            }
            RevealState::NoLocalReveal | RevealState::LocalRevealed(_) => {}
        }

        debug!(target: "carbonswap::client::reveal", "Order {}: {:?} -> LocalRevealPending", id, previous);
        self.notifier.pending("Decrypting order amount...").await;

        match self.run_reveal(&identity, id).await {
            Ok(Round::AlreadyVerified(amount)) => {
                info!(target: "carbonswap::client::reveal", "Order {} was already verified on ledger", id);
                self.update(|state| state.local_reveals.remove(id)).await;
                self.notifier.success("Data already verified on-chain").await;
                self.refresh_after_reveal(id).await;
                Ok(RevealOutcome::AlreadyVerified { amount: Some(amount) })
            }

            Ok(Round::Revealed(amount)) => {
                debug!(target: "carbonswap::client::reveal", "Order {}: LocalRevealPending -> LocalRevealed", id);
                self.update(|state| state.local_reveals.insert(id.clone(), LocalReveal::Revealed(amount)))
                    .await;
                self.notifier.pending("Confirming verification on ledger...").await;

                match self.refresh_after_reveal(id).await {
                    Some(verified) => {
                        info!(target: "carbonswap::client::reveal", "Order {} verified", id);
                        self.notifier.success("Decryption verified").await;
                        Ok(RevealOutcome::Verified { amount: verified.unwrap_or(amount) })
                    }
                    None => {
                        let fault = Error::ConsistencyFault(id.clone());
                        warn!(target: "carbonswap::client::reveal", "{}", fault);
                        self.notifier.error(fault.status_message()).await;
                        Ok(RevealOutcome::Unconfirmed { amount })
                    }
                }
            }

            Err(Error::AlreadyVerified) => {
                info!(target: "carbonswap::client::reveal", "Contract reports {} as already verified", id);
                self.update(|state| state.local_reveals.remove(id)).await;
                let amount = self.refresh_after_reveal(id).await.flatten();
                self.notifier.success("Data already verified on-chain").await;
                Ok(RevealOutcome::AlreadyVerified { amount })
            }

            Err(e) => {
                warn!(target: "carbonswap::client::reveal", "Reveal of {} failed: {}", id, e);
                self.update(|state| state.local_reveals.remove(id)).await;
                self.notifier.error(e.failure_banner("Decryption")).await;
                Err(e)
            }
        }
    }

    /// fetch order -> fetch handle -> decrypt off-chain -> verify on-chain
    async fn run_reveal(&self, identity: &Identity, id: &OrderId) -> Result<Round> {
        // The book may be stale, so ask the ledger before spending gas on
        // a verification that is bound to revert.
        let raw = self.reader.fetch_order(id).await?;
        if raw.is_verified {
            return Ok(Round::AlreadyVerified(raw.decrypted_value))
        }

        let handle = self.reader.fetch_encrypted_handle(id).await?;
        let revealed = self.adapter.reveal_encrypted(identity.signer.as_ref(), id, &handle).await?;
        Ok(Round::Revealed(revealed.clear_value))
    }

    /// Reload and report whether `id` is now verified, with its ledger amount.
    async fn refresh_after_reveal(&self, id: &OrderId) -> Option<Option<u64>> {
        let book = match self.reload().await {
            Ok(book) => book,
            Err(e) => {
                warn!(target: "carbonswap::client::reveal", "Reload after revealing {} failed: {}", id, e);
                return None
            }
        };

        book.get(id).filter(|o| o.is_verified).map(|o| o.verified_amount)
    }
}
