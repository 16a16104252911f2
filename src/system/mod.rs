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

use std::{collections::HashMap, sync::Arc};

use log::warn;
use smol::lock::Mutex;

pub type ExecutorPtr = Arc<smol::Executor<'static>>;

pub type PublisherPtr<T> = Arc<Publisher<T>>;
pub type SubscriptionId = u64;

/// Receiving end of a [`Publisher`]
pub struct Subscription<T> {
    id: SubscriptionId,
    recv_queue: async_channel::Receiver<T>,
    parent: PublisherPtr<T>,
}

impl<T: Clone> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next published message.
    /// Returns `None` once the subscription has been dropped by its publisher.
    pub async fn receive(&self) -> Option<T> {
        self.recv_queue.recv().await.ok()
    }

    /// Pop a queued message without waiting
    pub fn try_receive(&self) -> Option<T> {
        self.recv_queue.try_recv().ok()
    }

    /// Drain everything currently queued and keep the newest message
    pub fn latest(&self) -> Option<T> {
        let mut last = None;
        while let Ok(msg) = self.recv_queue.try_recv() {
            last = Some(msg);
        }
        last
    }

    pub async fn unsubscribe(&self) {
        self.parent.clone().unsubscribe(self.id).await
    }
}

/// Simple broadcast primitive: every subscriber gets a clone of every message
pub struct Publisher<T> {
    subs: Mutex<HashMap<SubscriptionId, async_channel::Sender<T>>>,
}

impl<T: Clone> Publisher<T> {
    pub fn new() -> PublisherPtr<T> {
        Arc::new(Self { subs: Mutex::new(HashMap::new()) })
    }

    fn random_id() -> SubscriptionId {
        rand::random()
    }

    pub async fn subscribe(self: Arc<Self>) -> Subscription<T> {
        let (sender, recv_queue) = async_channel::unbounded();

        let mut subs = self.subs.lock().await;
        let mut id = Self::random_id();
        while subs.contains_key(&id) {
            id = Self::random_id();
        }
        subs.insert(id, sender);
        drop(subs);

        Subscription { id, recv_queue, parent: self.clone() }
    }

    async fn unsubscribe(self: Arc<Self>, id: SubscriptionId) {
        self.subs.lock().await.remove(&id);
    }

    /// Send `message` to every live subscriber.
    /// Subscriptions whose receiving end was dropped are removed.
    pub async fn notify(&self, message: T) {
        let mut subs = self.subs.lock().await;
        subs.retain(|_, sub| !sub.is_closed());

        let mut closed = vec![];
        for (id, sub) in subs.iter() {
            if let Err(e) = sub.send(message.clone()).await {
                warn!(target: "carbonswap::system::publisher", "Failed notifying subscriber {}: {}", id, e);
                closed.push(*id);
            }
        }

        for id in closed {
            subs.remove(&id);
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subs.lock().await.len()
    }
}
