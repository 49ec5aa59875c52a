// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded, overwrite-on-full ingestion channel.
//!
//! Producers never wait: when the ring is full the oldest unread item is
//! evicted to make room. A single consumer drains it asynchronously.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Outcome of a [`RingChannel::push`].
#[derive(Debug, PartialEq, Eq)]
pub enum Pushed<T> {
    Accepted,
    /// Accepted after evicting the returned oldest item.
    Evicted(T),
    /// The channel is closed; the item is handed back.
    Closed(T),
}

#[derive(Debug)]
struct Inner<T> {
    queue: VecDeque<T>,
    closed: bool,
    evicted: u64,
}

#[derive(Debug)]
pub struct RingChannel<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> RingChannel<T> {
    /// Capacity is clamped to at least one slot.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
                evicted: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // The queue stays consistent across a panicking holder, keep going.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, item: T) -> Pushed<T> {
        let outcome = {
            let mut inner = self.lock();
            if inner.closed {
                return Pushed::Closed(item);
            }
            let outcome = if inner.queue.len() >= self.capacity {
                inner.evicted += 1;
                inner.queue.pop_front().map_or(Pushed::Accepted, Pushed::Evicted)
            } else {
                Pushed::Accepted
            };
            inner.queue.push_back(item);
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    /// Pops the oldest item without waiting.
    pub fn try_recv(&self) -> Option<T> {
        self.lock().queue.pop_front()
    }

    /// Waits for the next item. Returns `None` once the channel is closed and
    /// every remaining item has been taken.
    pub async fn recv(&self) -> Option<T> {
        loop {
            {
                let mut inner = self.lock();
                if let Some(item) = inner.queue.pop_front() {
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }
            // notify_one stores a permit when nobody is waiting, so a push
            // between the check above and this await is not lost.
            self.notify.notified().await;
        }
    }

    /// Rejects further pushes. Items already queued can still be received.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_one();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of items dropped to make room for newer ones.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.lock().evicted
    }
}
