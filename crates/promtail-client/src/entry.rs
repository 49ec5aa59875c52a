// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::severity::Severity;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A single log line as produced by the client facade.
///
/// The severity only drives local routing; it never reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub line: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(severity: Severity, line: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            line: line.into(),
            severity,
        }
    }

    /// Splits the timestamp into whole seconds and the nanosecond remainder.
    #[must_use]
    pub fn seconds_and_nanos(&self) -> (i64, i32) {
        match self.timestamp.timestamp_nanos_opt() {
            Some(ns) => (
                ns.div_euclid(NANOS_PER_SEC),
                // Bounded by NANOS_PER_SEC, always fits.
                ns.rem_euclid(NANOS_PER_SEC) as i32,
            ),
            // Outside the i64 nanosecond range (before 1677 or after 2262).
            None => (
                self.timestamp.timestamp(),
                self.timestamp.timestamp_subsec_nanos() as i32,
            ),
        }
    }

    pub(crate) fn as_json(&self) -> JsonEntry<'_> {
        JsonEntry {
            ts: rfc3339_nano(&self.timestamp),
            line: &self.line,
        }
    }
}

/// RFC 3339 in UTC with trailing zeros trimmed from the fraction, so whole
/// seconds carry no fraction at all.
fn rfc3339_nano(timestamp: &DateTime<Utc>) -> String {
    let mut out = timestamp.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = timestamp.timestamp_subsec_nanos() % NANOS_PER_SEC as u32;
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out.push('Z');
    out
}

/// Human readable wire shape used by the JSON encoding.
#[derive(Debug, Serialize)]
pub(crate) struct JsonEntry<'a> {
    pub ts: String,
    pub line: &'a str,
}
