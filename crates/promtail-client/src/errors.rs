// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// A label field failed its shape check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid label '{field}': {value:?}")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Errors that prevent a client from being built.
#[derive(Debug, thiserror::Error)]
pub enum Creation {
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("batch size threshold must be at least 1")]
    ZeroBatchSize,

    #[error("batch wait must be greater than zero")]
    ZeroBatchWait,

    #[error("ingestion buffer capacity must be at least 1")]
    ZeroBufferCapacity,

    #[error("failed to build HTTP transport: {0}")]
    Transport(String),

    #[error("no tokio runtime available to run the batching task")]
    NoRuntime,
}

/// A batch could not be serialized.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("unable to marshal JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unable to compress payload: {0}")]
    Compression(#[from] snap::Error),
}

/// Reasons a flush failed. None of these are surfaced to producers.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("unable to send HTTP request: {0}")]
    Transport(String),

    #[error("unexpected HTTP status code: {status}, message: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
}

/// Shutdown did not complete within the allotted time.
#[derive(Debug, thiserror::Error)]
#[error("batching task did not drain within {0:?}")]
pub struct ShutdownTimeout(pub std::time::Duration);
