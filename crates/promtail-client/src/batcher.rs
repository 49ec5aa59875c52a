// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch accumulation and flush scheduling.
//!
//! A [`Batcher`] is the single consumer of the ingestion ring. It owns the
//! current batch and the flush timer, so neither needs a lock:
//!
//! ```text
//!   producers ──push──> RingChannel ──recv──> Batcher ──flush──> Flusher
//!                                              │   ^
//!                                              │   └── timer / size threshold
//!                                              └──print──> Printer (debug only)
//! ```
//!
//! The run loop waits on exactly one of: the quit signal, the flush timer, or
//! the next entry. On quit it moves to `Draining`, folds whatever is already
//! queued into the batch, flushes the remainder and reports `Stopped`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::entry::LogEntry;
use crate::flusher::Flusher;
use crate::printer::Printer;
use crate::ring::{Pushed, RingChannel};
use crate::severity::Severity;

/// Cap on how far ahead a flush deadline is scheduled. Longer waits, up to
/// `Duration::MAX`, behave as "flush by size only".
const MAX_BATCH_WAIT: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatcherState {
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct BatcherConfig {
    pub batch_wait: Duration,
    pub batch_entries: usize,
    pub send_level: Severity,
    pub print_level: Severity,
    pub buffer_capacity: usize,
    pub debug: bool,
}

/// Producer side of a running [`Batcher`].
#[derive(Clone)]
pub struct BatcherHandle {
    ring: Arc<RingChannel<LogEntry>>,
    cancel_token: CancellationToken,
    state_rx: watch::Receiver<BatcherState>,
}

impl BatcherHandle {
    /// Never waits; a full ring drops its oldest entry.
    pub fn push(&self, entry: LogEntry) -> Pushed<LogEntry> {
        self.ring.push(entry)
    }

    /// Signals the batcher to drain and stop.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Resolves once the batcher has flushed its remainder and stopped, or has
    /// gone away without doing so. The latter is logged; pending entries are
    /// lost.
    pub async fn stopped(&self) {
        let mut state_rx = self.state_rx.clone();
        if let Err(e) = state_rx
            .wait_for(|state| *state == BatcherState::Stopped)
            .await
        {
            error!(
                "PROMTAIL | Batcher exited without draining, {} queued entries lost: {e}",
                self.ring.len()
            );
        };
    }

    #[must_use]
    pub fn state(&self) -> BatcherState {
        *self.state_rx.borrow()
    }

    #[must_use]
    pub fn ring(&self) -> &RingChannel<LogEntry> {
        &self.ring
    }
}

pub struct Batcher {
    config: BatcherConfig,
    ring: Arc<RingChannel<LogEntry>>,
    flusher: Flusher,
    printer: Arc<dyn Printer>,
    cancel_token: CancellationToken,
    state_tx: watch::Sender<BatcherState>,
    batch: Vec<LogEntry>,
}

impl Batcher {
    pub fn new(
        config: BatcherConfig,
        flusher: Flusher,
        printer: Arc<dyn Printer>,
    ) -> (Self, BatcherHandle) {
        let ring = Arc::new(RingChannel::new(config.buffer_capacity));
        let cancel_token = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(BatcherState::Running);

        let handle = BatcherHandle {
            ring: Arc::clone(&ring),
            cancel_token: cancel_token.clone(),
            state_rx,
        };
        let batcher = Self {
            batch: Vec::with_capacity(config.batch_entries),
            config,
            ring,
            flusher,
            printer,
            cancel_token,
            state_tx,
        };
        (batcher, handle)
    }

    pub async fn run(mut self) {
        debug!("PROMTAIL | Batcher started");
        let batch_wait = self.config.batch_wait;
        let flush_timer = sleep_until(next_deadline(batch_wait));
        tokio::pin!(flush_timer);

        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => break,
                () = &mut flush_timer => {
                    if !self.batch.is_empty() {
                        self.flush().await;
                    }
                    // Restart from the fire point, not on a fixed grid.
                    flush_timer.as_mut().reset(next_deadline(batch_wait));
                }
                entry = self.ring.recv() => match entry {
                    Some(entry) => {
                        if self.accept(entry) {
                            self.flush().await;
                            flush_timer.as_mut().reset(next_deadline(batch_wait));
                        }
                    }
                    None => break,
                },
            }
        }

        self.drain().await;
    }

    /// Routes one entry. Returns true when the batch reached its size threshold.
    fn accept(&mut self, entry: LogEntry) -> bool {
        if self.config.debug && entry.severity.passes(self.config.print_level) {
            self.printer.print(&entry);
        }
        if entry.severity.passes(self.config.send_level) {
            self.batch.push(entry);
            return self.batch.len() >= self.config.batch_entries;
        }
        false
    }

    async fn flush(&mut self) {
        let batch = std::mem::replace(
            &mut self.batch,
            Vec::with_capacity(self.config.batch_entries),
        );
        self.flusher.flush(&batch).await;
    }

    async fn drain(mut self) {
        self.state_tx.send_replace(BatcherState::Draining);
        debug!("PROMTAIL | Batcher draining");

        self.ring.close();
        while let Some(entry) = self.ring.try_recv() {
            if self.accept(entry) {
                self.flush().await;
            }
        }
        if !self.batch.is_empty() {
            self.flush().await;
        }

        let evicted = self.ring.evicted();
        if evicted > 0 {
            debug!("PROMTAIL | {evicted} entries were dropped by the full ingestion buffer");
        }
        self.state_tx.send_replace(BatcherState::Stopped);
        debug!("PROMTAIL | Batcher stopped");
    }
}

fn next_deadline(batch_wait: Duration) -> Instant {
    Instant::now() + batch_wait.min(MAX_BATCH_WAIT)
}
