// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Producer-facing facade.
//!
//! Building a [`Client`] validates the configuration, renders the label string
//! once and spawns the batching task on the current tokio runtime. Logging
//! calls never wait; they only push onto the ingestion ring.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tracing::debug;

use crate::batcher::{Batcher, BatcherConfig, BatcherHandle, BatcherState};
use crate::config::ClientConfig;
use crate::entry::LogEntry;
use crate::errors::{Creation, ShutdownTimeout};
use crate::flusher::{Flusher, FlusherConfig};
use crate::http::{HttpTransport, Transport};
use crate::labels::LabelFormatter;
use crate::printer::{Printer, TracingPrinter};
use crate::severity::Severity;

const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z %Z";

pub struct Client {
    handle: BatcherHandle,
    labels: String,
    service_name: String,
    send_level: Severity,
    print_level: Severity,
}

impl Client {
    /// Builds a client that pushes over HTTP and prints through `tracing`.
    pub fn new(config: ClientConfig) -> Result<Client, Creation> {
        Self::with_printer(config, Arc::new(TracingPrinter))
    }

    pub fn with_printer(config: ClientConfig, printer: Arc<dyn Printer>) -> Result<Client, Creation> {
        let labels = render_labels(&config)?;
        let transport = HttpTransport::new(&config.transport)
            .map_err(|e| Creation::Transport(e.to_string()))?;
        Self::start(config, labels, Arc::new(transport), printer)
    }

    /// Builds a client on top of a caller-provided transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        printer: Arc<dyn Printer>,
    ) -> Result<Client, Creation> {
        let labels = render_labels(&config)?;
        Self::start(config, labels, transport, printer)
    }

    fn start(
        config: ClientConfig,
        labels: String,
        transport: Arc<dyn Transport>,
        printer: Arc<dyn Printer>,
    ) -> Result<Client, Creation> {
        let runtime = Handle::try_current().map_err(|_| Creation::NoRuntime)?;

        let flusher = Flusher::new(FlusherConfig {
            transport,
            encoding: config.encoding,
            push_url: config.push_url,
            labels: labels.clone(),
            debug: config.debug,
        });
        let (batcher, handle) = Batcher::new(
            BatcherConfig {
                batch_wait: config.batch_wait,
                batch_entries: config.batch_entries,
                send_level: config.send_level,
                print_level: config.print_level,
                buffer_capacity: config.buffer_capacity,
                debug: config.debug,
            },
            flusher,
            printer,
        );
        runtime.spawn(batcher.run());
        debug!("PROMTAIL | Client started with labels {labels}");

        Ok(Client {
            handle,
            labels,
            service_name: config.service_name,
            send_level: config.send_level,
            print_level: config.print_level,
        })
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Severity::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Severity::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Severity::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Severity::Error, message);
    }

    /// Enqueues `message` if it passes either the ship or the print threshold.
    /// The batching task re-checks each threshold on its own.
    pub fn log(&self, severity: Severity, message: impl fmt::Display) {
        if !(severity.passes(self.send_level) || severity.passes(self.print_level)) {
            return;
        }
        let line = format!(
            "{}: source = {}, time = {}, {message}",
            severity.tag(),
            self.service_name,
            Utc::now().format(LINE_TIME_FORMAT),
        );
        self.handle.push(LogEntry::new(severity, line));
    }

    /// The rendered stream label string sent with every batch.
    #[must_use]
    pub fn labels(&self) -> &str {
        &self.labels
    }

    #[must_use]
    pub fn state(&self) -> BatcherState {
        self.handle.state()
    }

    /// Stops the batching task after it has flushed everything already queued.
    /// Waits as long as the final push takes.
    pub async fn shutdown(self) {
        self.handle.shutdown();
        self.handle.stopped().await;
    }

    /// Like [`Client::shutdown`], but gives up waiting after `timeout`. The
    /// background task still finishes its final flush on its own.
    pub async fn shutdown_timeout(self, timeout: Duration) -> Result<(), ShutdownTimeout> {
        self.handle.shutdown();
        tokio::time::timeout(timeout, self.handle.stopped())
            .await
            .map_err(|_| ShutdownTimeout(timeout))
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // Without this the batching task would outlive every producer.
        self.handle.shutdown();
    }
}

fn render_labels(config: &ClientConfig) -> Result<String, Creation> {
    if config.service_name.trim().is_empty() {
        return Err(Creation::MissingConfig("service_name"));
    }
    if config.push_url.trim().is_empty() {
        return Err(Creation::MissingConfig("push_url"));
    }
    if config.batch_entries == 0 {
        return Err(Creation::ZeroBatchSize);
    }
    if config.batch_wait.is_zero() {
        return Err(Creation::ZeroBatchWait);
    }
    if config.buffer_capacity == 0 {
        return Err(Creation::ZeroBufferCapacity);
    }

    let formatter = LabelFormatter::new();
    let mut labels = formatter.labels(&config.label_set)?;
    labels.ensure_service_name(&config.service_name);
    if let Some(version) = &config.version {
        labels.append_version(&formatter, version)?;
    }
    Ok(labels.render())
}
