// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, error};

use crate::encoding::Encoding;
use crate::entry::LogEntry;
use crate::errors::ShippingError;
use crate::http::Transport;

/// The only status the push endpoint answers with on success.
pub const EXPECTED_STATUS: StatusCode = StatusCode::NO_CONTENT;

pub struct FlusherConfig {
    pub transport: Arc<dyn Transport>,
    pub encoding: Encoding,
    pub push_url: String,
    pub labels: String,
    pub debug: bool,
}

/// Encodes a batch with the configured strategy and pushes it.
#[derive(Clone)]
pub struct Flusher {
    transport: Arc<dyn Transport>,
    encoding: Encoding,
    push_url: String,
    labels: Arc<str>,
    debug: bool,
}

impl Flusher {
    pub fn new(config: FlusherConfig) -> Self {
        Flusher {
            transport: config.transport,
            encoding: config.encoding,
            push_url: config.push_url,
            labels: config.labels.into(),
            debug: config.debug,
        }
    }

    /// Encode and push `entries`, reporting why it failed if it did.
    pub async fn ship(&self, entries: &[LogEntry]) -> Result<(), ShippingError> {
        let body = self.encoding.encode(&self.labels, entries)?;
        let resp = self
            .transport
            .post(&self.push_url, self.encoding.content_type(), body)
            .await?;

        if resp.status != EXPECTED_STATUS {
            return Err(ShippingError::UnexpectedStatus {
                status: resp.status,
                body: resp.body,
            });
        }
        Ok(())
    }

    /// Push `entries` once. Failures are logged and the entries are dropped;
    /// nothing is retried.
    pub async fn flush(&self, entries: &[LogEntry]) {
        let n_entries = entries.len();
        if n_entries == 0 {
            return;
        }
        debug!("PROMTAIL | Flushing {n_entries} entries as {}", self.encoding);

        match self.ship(entries).await {
            Ok(()) => debug!("PROMTAIL | Successfully flushed {n_entries} entries"),
            Err(ShippingError::Encode(e)) => {
                // Encoding failures are only reported in debug mode.
                if self.debug {
                    error!("PROMTAIL | Failed to encode batch, {n_entries} entries dropped: {e}");
                }
            }
            Err(e) => {
                error!("PROMTAIL | Failed to push batch, {n_entries} entries dropped: {e}");
            }
        }
    }
}
