// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::error;

use crate::encoding::Encoding;
use crate::errors::Creation;
use crate::http::TransportSettings;
use crate::labels::LabelSet;
use crate::severity::Severity;

pub const DEFAULT_BATCH_WAIT: Duration = Duration::from_millis(1000);
pub const DEFAULT_BATCH_ENTRIES: usize = 100;
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;
pub const DEFAULT_SEND_LEVEL: Severity = Severity::Info;
pub const DEFAULT_PRINT_LEVEL: Severity = Severity::Warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub push_url: String,
    pub service_name: String,
    pub label_set: LabelSet,
    /// Appended as a `version` label when set.
    pub version: Option<String>,
    /// Longest time an entry waits in a non-empty batch.
    pub batch_wait: Duration,
    /// Batch size that triggers an immediate flush.
    pub batch_entries: usize,
    pub send_level: Severity,
    pub print_level: Severity,
    pub buffer_capacity: usize,
    pub debug: bool,
    pub encoding: Encoding,
    pub transport: TransportSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            push_url: String::new(),
            service_name: String::new(),
            label_set: LabelSet::default(),
            version: None,
            batch_wait: DEFAULT_BATCH_WAIT,
            batch_entries: DEFAULT_BATCH_ENTRIES,
            send_level: DEFAULT_SEND_LEVEL,
            print_level: DEFAULT_PRINT_LEVEL,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            debug: false,
            encoding: Encoding::default(),
            transport: TransportSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Reads `PROMTAIL_*` environment variables.
    ///
    /// Missing required variables are an error. Optional variables that fail to
    /// parse are logged and replaced by their default.
    pub fn from_env() -> Result<ClientConfig, Creation> {
        let push_url = required("PROMTAIL_PUSH_URL")?;
        let service_name = required("PROMTAIL_SERVICE_NAME")?;
        let label_set = LabelSet::new(
            required("PROMTAIL_HOST")?,
            required("PROMTAIL_SOURCE")?,
            required("PROMTAIL_JOB")?,
        );
        let version = env::var("PROMTAIL_VERSION")
            .ok()
            .filter(|val| !val.trim().is_empty());

        let batch_wait = Duration::from_millis(parse_or(
            "PROMTAIL_BATCH_WAIT_MS",
            DEFAULT_BATCH_WAIT.as_millis() as u64,
        ));

        let transport = TransportSettings {
            tls_verify: flag("PROMTAIL_TLS_VERIFY"),
            ..TransportSettings::default()
        };

        Ok(ClientConfig {
            push_url,
            service_name,
            label_set,
            version,
            batch_wait,
            batch_entries: parse_or("PROMTAIL_BATCH_ENTRIES", DEFAULT_BATCH_ENTRIES),
            send_level: parse_or("PROMTAIL_SEND_LEVEL", DEFAULT_SEND_LEVEL),
            print_level: parse_or("PROMTAIL_PRINT_LEVEL", DEFAULT_PRINT_LEVEL),
            buffer_capacity: parse_or("PROMTAIL_BUFFER_SIZE", DEFAULT_BUFFER_CAPACITY),
            debug: flag("PROMTAIL_DEBUG"),
            encoding: parse_or("PROMTAIL_ENCODING", Encoding::default()),
            transport,
        })
    }
}

fn required(name: &'static str) -> Result<String, Creation> {
    env::var(name)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .ok_or(Creation::MissingConfig(name))
}

fn parse_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            error!("PROMTAIL | Invalid value for {name}: {raw:?}, using default. Error: {e}");
            default
        }),
        Err(_) => default,
    }
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|val| matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
