// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use mockito::{Matcher, Server};
use promtail_client::{
    Client, ClientConfig, Encoding, LabelSet, Severity, TracingPrinter, Transport,
    TransportSettings,
};
use promtail_client::logproto::PushRequest;
use prost::Message;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PUSH_PATH: &str = "/loki/api/v1/push";
const EXPECTED_LABELS: &str =
    r#"{host="localhost",source="exchange",job="orders",service_name="matcher",version="2.0.1"}"#;

fn config(url: String, encoding: Encoding) -> ClientConfig {
    ClientConfig {
        push_url: format!("{url}{PUSH_PATH}"),
        service_name: "matcher".to_string(),
        label_set: LabelSet::new("localhost", "exchange", "orders"),
        version: Some("2.0.1".to_string()),
        batch_wait: Duration::from_secs(60),
        batch_entries: 100,
        send_level: Severity::Info,
        encoding,
        transport: TransportSettings {
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(2),
            ..TransportSettings::default()
        },
        ..ClientConfig::default()
    }
}

/// Returns the label string and the lines of the single stream in a push body.
fn decode_push_request(body: &[u8]) -> (String, Vec<String>) {
    let raw = snap::raw::Decoder::new()
        .decompress_vec(body)
        .expect("body is not snappy block compressed");
    let mut request = PushRequest::decode(raw.as_slice()).expect("body is not a PushRequest");
    assert_eq!(request.streams.len(), 1, "expected exactly one stream");

    let stream = request.streams.remove(0);
    let lines = stream
        .entries
        .into_iter()
        .map(|entry| {
            let ts = entry.timestamp.expect("entry without timestamp");
            assert!(ts.seconds > 0);
            assert!((0..1_000_000_000).contains(&ts.nanos));
            entry.line
        })
        .collect();
    (stream.labels, lines)
}

#[cfg(test)]
#[tokio::test]
async fn client_ships_json_batch_on_shutdown() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PUSH_PATH)
        .match_header("Content-Type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"service_name=\\"matcher\\",version=\\"2.0.1\\""#.to_string()),
            Matcher::Regex(r#""line":"Info: source = matcher, time = [^"]+, order 1 filled""#.to_string()),
            Matcher::Regex(r#""line":"Error: source = matcher, time = [^"]+, order 2 rejected""#.to_string()),
        ]))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let client = Client::new(config(server.url(), Encoding::Json)).expect("failed to create client");
    client.debug("below the send threshold");
    client.info("order 1 filled");
    client.error(format_args!("order {} rejected", 2));
    client.shutdown().await;

    mock.assert_async().await;
}

#[cfg(test)]
#[tokio::test]
async fn client_ships_protobuf_batches_at_size_threshold() {
    let bodies: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PUSH_PATH)
        .match_header("Content-Type", "application/x-protobuf")
        .with_status(204)
        .with_body_from_request({
            let bodies = Arc::clone(&bodies);
            move |request| {
                let body = request.body().expect("unreadable request body").clone();
                bodies.lock().expect("lock poisoned").push(body);
                Vec::new()
            }
        })
        .expect(2)
        .create_async()
        .await;

    let mut config = config(server.url(), Encoding::Protobuf);
    config.batch_entries = 2;
    let client = Client::new(config).expect("failed to create client");
    assert_eq!(client.labels(), EXPECTED_LABELS);

    client.info("first");
    client.warn("second");
    client.info("third");
    client.shutdown().await;

    mock.assert_async().await;
    let bodies = bodies.lock().expect("lock poisoned").clone();
    assert_eq!(bodies.len(), 2);

    let (labels, lines) = decode_push_request(&bodies[0]);
    assert_eq!(labels, EXPECTED_LABELS);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Info: source = matcher, time = "));
    assert!(lines[0].ends_with(", first"));
    assert!(lines[1].starts_with("Warn: "));
    assert!(lines[1].ends_with(", second"));

    let (_, lines) = decode_push_request(&bodies[1]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(", third"));
}

#[cfg(test)]
#[tokio::test]
async fn client_keeps_shipping_after_server_errors() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PUSH_PATH)
        .with_status(500)
        .with_body("ingester unavailable")
        .expect(2)
        .create_async()
        .await;

    let mut config = config(server.url(), Encoding::Json);
    config.batch_entries = 1;
    let client = Client::new(config).expect("failed to create client");

    client.error("first attempt");
    client.error("second attempt");
    client.shutdown().await;

    mock.assert_async().await;
}

#[cfg(test)]
#[tokio::test]
async fn client_flushes_on_batch_wait() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PUSH_PATH)
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let mut config = config(server.url(), Encoding::Json);
    config.batch_wait = Duration::from_millis(100);
    let client = Client::new(config).expect("failed to create client");
    client.warn("waiting for the timer");

    let flushed = tokio::time::timeout(Duration::from_secs(5), async {
        while !mock.matched_async().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(flushed.is_ok(), "batch was not flushed by the timer");

    client.shutdown().await;
    mock.assert_async().await;
}

#[cfg(test)]
#[tokio::test]
async fn client_routes_printed_entries_through_injected_printer() {
    let printed: Arc<Mutex<Vec<String>>> = Arc::default();
    let printer = {
        let printed = Arc::clone(&printed);
        move |entry: &promtail_client::LogEntry| {
            printed.lock().expect("lock poisoned").push(entry.line.clone());
        }
    };

    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PUSH_PATH)
        .with_status(204)
        .expect(0)
        .create_async()
        .await;

    let mut config = config(server.url(), Encoding::Json);
    config.debug = true;
    config.send_level = Severity::Disable;
    config.print_level = Severity::Warn;
    let client = Client::with_printer(config, Arc::new(printer)).expect("failed to create client");

    client.info("not printed");
    client.warn("printed");
    client.shutdown().await;

    mock.assert_async().await;
    let printed = printed.lock().expect("lock poisoned").clone();
    assert_eq!(printed.len(), 1);
    assert!(printed[0].starts_with("Warn: source = matcher"));
}

#[cfg(test)]
#[tokio::test]
async fn client_rejects_invalid_labels_before_starting() {
    let mut config = config("http://localhost:3100".to_string(), Encoding::Json);
    config.label_set.job = "orders job".to_string();

    let transport: Arc<dyn Transport> = Arc::new(
        promtail_client::HttpTransport::new(&TransportSettings::default())
            .expect("failed to build transport"),
    );
    let err = Client::with_transport(config, transport, Arc::new(TracingPrinter))
        .err()
        .expect("invalid job label must be rejected");
    assert!(matches!(
        err,
        promtail_client::Creation::Validation(ref v) if v.field == "job"
    ));
}
