// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching log shipping client for Loki-compatible push endpoints.
//!
//! Producers call [`Client::info`] and friends from any thread; entries go
//! through a bounded overwrite-on-full ring into a single background task that
//! batches them by size and time and pushes each batch as JSON or
//! snappy-compressed protobuf.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batcher;
pub mod client;
pub mod config;
pub mod encoding;
pub mod entry;
pub mod errors;
pub mod flusher;
pub mod http;
pub mod labels;
pub mod logproto;
pub mod printer;
pub mod ring;
pub mod severity;

pub use batcher::{Batcher, BatcherConfig, BatcherHandle, BatcherState};
pub use client::Client;
pub use config::ClientConfig;
pub use encoding::Encoding;
pub use entry::LogEntry;
pub use errors::{Creation, EncodeError, ShippingError, ShutdownTimeout, ValidationError};
pub use flusher::{Flusher, FlusherConfig};
pub use http::{HttpTransport, Transport, TransportResponse, TransportSettings};
pub use labels::{LabelFormatter, LabelSet, Labels};
pub use printer::{Printer, TracingPrinter};
pub use ring::{Pushed, RingChannel};
pub use severity::Severity;
