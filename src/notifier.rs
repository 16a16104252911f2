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

//! Transaction/Status Notifier
//!
//! One process-wide transient status slot describing the most recently
//! started async operation. Newer statuses overwrite older ones. Success
//! and error statuses are cleared by a timer after their dwell time; a
//! timer only clears the status it was armed for.

use std::{sync::Arc, time::Duration};

use log::debug;
use smol::{lock::Mutex, Timer};

use crate::{
    config::Config,
    system::{ExecutorPtr, Publisher, PublisherPtr, Subscription},
};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TxPhase {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TxStatus {
    pub visible: bool,
    pub phase: TxPhase,
    pub message: String,
}

impl Default for TxStatus {
    fn default() -> Self {
        Self { visible: false, phase: TxPhase::Pending, message: String::new() }
    }
}

pub type StatusNotifierPtr = Arc<StatusNotifier>;

pub struct StatusNotifier {
    /// Generation counter and the status currently displayed
    slot: Mutex<(u64, TxStatus)>,
    publisher: PublisherPtr<TxStatus>,
    executor: ExecutorPtr,
    success_dwell: Duration,
    error_dwell: Duration,
}

impl StatusNotifier {
    pub fn new(executor: ExecutorPtr, config: &Config) -> StatusNotifierPtr {
        Arc::new(Self {
            slot: Mutex::new((0, TxStatus::default())),
            publisher: Publisher::new(),
            executor,
            success_dwell: config.success_dwell(),
            error_dwell: config.error_dwell(),
        })
    }

    pub async fn current(&self) -> TxStatus {
        self.slot.lock().await.1.clone()
    }

    pub async fn subscribe(&self) -> Subscription<TxStatus> {
        self.publisher.clone().subscribe().await
    }

    pub async fn pending(self: &Arc<Self>, message: impl Into<String>) {
        self.set(TxPhase::Pending, message.into()).await;
    }

    pub async fn success(self: &Arc<Self>, message: impl Into<String>) {
        self.set(TxPhase::Success, message.into()).await;
    }

    pub async fn error(self: &Arc<Self>, message: impl Into<String>) {
        self.set(TxPhase::Error, message.into()).await;
    }

    async fn set(self: &Arc<Self>, phase: TxPhase, message: String) {
        let status = TxStatus { visible: true, phase, message };
        debug!(target: "carbonswap::notifier", "Status {:?}: {}", status.phase, status.message);

        let generation = {
            let mut slot = self.slot.lock().await;
            slot.0 += 1;
            slot.1 = status.clone();
            slot.0
        };
        self.publisher.notify(status).await;

        let dwell = match phase {
            TxPhase::Pending => return,
            TxPhase::Success => self.success_dwell,
            TxPhase::Error => self.error_dwell,
        };

        let notifier = self.clone();
        self.executor
            .spawn(async move {
                Timer::after(dwell).await;
                notifier.clear(generation).await;
            })
            .detach();
    }

    /// Hide the status, unless something newer replaced it meanwhile.
    async fn clear(&self, generation: u64) {
        let mut slot = self.slot.lock().await;
        if slot.0 != generation {
            return
        }

        slot.1 = TxStatus::default();
        drop(slot);

        debug!(target: "carbonswap::notifier", "Status cleared");
        self.publisher.notify(TxStatus::default()).await;
    }
}
