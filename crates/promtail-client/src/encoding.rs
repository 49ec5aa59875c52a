// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request body encodings understood by the push endpoint.
//!
//! Both encodings wrap a batch in a single stream carrying the client's label
//! string:
//!
//! - `Json`: `{"streams":[{"labels":"...","entries":[{"ts":"...","line":"..."}]}]}`
//! - `Protobuf`: a `PushRequest` message, snappy block compressed.
//!
//! ```text
//! PushRequest { repeated Stream streams = 1; }
//! Stream      { string labels = 1; repeated Entry entries = 2; }
//! Entry       { google.protobuf.Timestamp timestamp = 1; string line = 2; }
//! ```

use std::fmt;
use std::str::FromStr;

use prost::Message;
use prost_types::Timestamp;
use serde::Serialize;

use crate::entry::{JsonEntry, LogEntry};
use crate::errors::EncodeError;
use crate::logproto::{Entry, PushRequest, Stream};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    Json,
    #[default]
    Protobuf,
}

impl Encoding {
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Encoding::Json => JSON_CONTENT_TYPE,
            Encoding::Protobuf => PROTOBUF_CONTENT_TYPE,
        }
    }

    /// Serializes `entries` as one stream labelled with `labels`.
    pub fn encode(self, labels: &str, entries: &[LogEntry]) -> Result<Vec<u8>, EncodeError> {
        match self {
            Encoding::Json => encode_json(labels, entries),
            Encoding::Protobuf => encode_protobuf(labels, entries),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Json => f.write_str("json"),
            Encoding::Protobuf => f.write_str("protobuf"),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Encoding::Json),
            "protobuf" | "proto" => Ok(Encoding::Protobuf),
            _ => Err(format!(
                "Invalid encoding: '{s}'. Valid encodings are: json, protobuf"
            )),
        }
    }
}

#[derive(Serialize)]
struct JsonPushMessage<'a> {
    streams: Vec<JsonStream<'a>>,
}

#[derive(Serialize)]
struct JsonStream<'a> {
    labels: &'a str,
    entries: Vec<JsonEntry<'a>>,
}

fn encode_json(labels: &str, entries: &[LogEntry]) -> Result<Vec<u8>, EncodeError> {
    let message = JsonPushMessage {
        streams: vec![JsonStream {
            labels,
            entries: entries.iter().map(LogEntry::as_json).collect(),
        }],
    };
    Ok(serde_json::to_vec(&message)?)
}

fn encode_protobuf(labels: &str, entries: &[LogEntry]) -> Result<Vec<u8>, EncodeError> {
    let request = PushRequest {
        streams: vec![Stream {
            labels: labels.to_string(),
            entries: entries.iter().map(protobuf_entry).collect(),
        }],
    };
    Ok(snap::raw::Encoder::new().compress_vec(&request.encode_to_vec())?)
}

fn protobuf_entry(entry: &LogEntry) -> Entry {
    let (seconds, nanos) = entry.seconds_and_nanos();
    Entry {
        timestamp: Some(Timestamp { seconds, nanos }),
        line: entry.line.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use chrono::{TimeZone, Utc};

    const LABELS: &str = r#"{host="localhost",source="src",job="job",service_name="svc"}"#;

    fn entry(secs: i64, nanos: u32, line: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc.timestamp_opt(secs, nanos).unwrap(),
            line: line.to_string(),
            severity: Severity::Warn,
        }
    }

    fn decode(body: &[u8]) -> PushRequest {
        let raw = snap::raw::Decoder::new().decompress_vec(body).unwrap();
        PushRequest::decode(raw.as_slice()).unwrap()
    }

    #[test]
    fn test_content_types() {
        assert_eq!(Encoding::Json.content_type(), "application/json");
        assert_eq!(Encoding::Protobuf.content_type(), "application/x-protobuf");
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("JSON".parse::<Encoding>(), Ok(Encoding::Json));
        assert_eq!("proto".parse::<Encoding>(), Ok(Encoding::Protobuf));
        assert!("xml".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_json_single_stream() {
        let entries = vec![
            entry(1_700_000_000, 0, "first"),
            entry(1_700_000_001, 500, "second"),
        ];
        let body = Encoding::Json.encode(LABELS, &entries).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "streams": [{
                    "labels": LABELS,
                    "entries": [
                        {"ts": "2023-11-14T22:13:20Z", "line": "first"},
                        {"ts": "2023-11-14T22:13:21.0000005Z", "line": "second"},
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_protobuf_is_snappy_block_compressed_push_request() {
        let entries = vec![
            entry(1_700_000_000, 123_456_789, "first"),
            entry(1_700_000_002, 0, "second"),
        ];
        let body = Encoding::Protobuf.encode(LABELS, &entries).unwrap();
        let request = decode(&body);

        assert_eq!(request.streams.len(), 1);
        let stream = &request.streams[0];
        assert_eq!(stream.labels, LABELS);
        assert_eq!(
            stream.entries,
            vec![
                Entry {
                    timestamp: Some(Timestamp {
                        seconds: 1_700_000_000,
                        nanos: 123_456_789,
                    }),
                    line: "first".to_string(),
                },
                Entry {
                    timestamp: Some(Timestamp {
                        seconds: 1_700_000_002,
                        nanos: 0,
                    }),
                    line: "second".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_protobuf_empty_batch_still_carries_labels() {
        let body = Encoding::Protobuf.encode(LABELS, &[]).unwrap();
        let request = decode(&body);
        assert_eq!(request.streams.len(), 1);
        assert_eq!(request.streams[0].labels, LABELS);
        assert!(request.streams[0].entries.is_empty());
    }

    #[test]
    fn test_protobuf_field_tags_match_push_protocol() {
        // PushRequest.streams = 1 (length delimited) wraps Stream.labels = 1.
        let raw = PushRequest {
            streams: vec![Stream {
                labels: "{}".to_string(),
                entries: Vec::new(),
            }],
        }
        .encode_to_vec();
        assert_eq!(raw, vec![0x0a, 0x04, 0x0a, 0x02, b'{', b'}']);
    }
}
