// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Local sink for the "print" half of severity routing.

use crate::entry::LogEntry;
use crate::severity::Severity;

/// Receives entries that pass the print threshold while debug mode is on.
pub trait Printer: Send + Sync {
    fn print(&self, entry: &LogEntry);
}

impl<F> Printer for F
where
    F: Fn(&LogEntry) + Send + Sync,
{
    fn print(&self, entry: &LogEntry) {
        self(entry);
    }
}

/// Default printer: re-emits the line as a `tracing` event at its severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPrinter;

impl Printer for TracingPrinter {
    fn print(&self, entry: &LogEntry) {
        let line = entry.line.as_str();
        match entry.severity {
            Severity::Debug => tracing::debug!("{line}"),
            Severity::Info => tracing::info!("{line}"),
            Severity::Warn => tracing::warn!("{line}"),
            Severity::Error => tracing::error!("{line}"),
            Severity::Disable => {}
        }
    }
}
