// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use promtail_client::{Client, ClientConfig, Severity};

#[tokio::main]
pub async fn main() {
    let log_level = env::var("PROMTAIL_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    let env_filter = format!("h2=off,hyper=off,rustls=off,reqwest=off,{log_level}");

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let severity = env::var("PROMTAIL_TAIL_SEVERITY")
        .ok()
        .and_then(|val| val.parse::<Severity>().ok())
        .unwrap_or(Severity::Info);

    let config = match ClientConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("PROMTAIL | Error creating config on startup: {e}");
            return;
        }
    };
    let client = match Client::new(config) {
        Ok(c) => c,
        Err(e) => {
            error!("PROMTAIL | Error creating client on startup: {e}");
            return;
        }
    };
    info!("PROMTAIL | Shipping stdin with labels {}", client.labels());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let interrupted = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => client.log(severity, line),
                Ok(None) => {
                    debug!("PROMTAIL | Reached end of input");
                    break false;
                }
                Err(e) => {
                    error!("PROMTAIL | Failed to read stdin: {e}");
                    break false;
                }
            },
            _ = &mut ctrl_c => {
                info!("PROMTAIL | Interrupted, draining pending entries");
                break true;
            }
        }
    };

    client.shutdown().await;
    debug!("PROMTAIL | Shutdown complete");

    if interrupted {
        // A pending blocking stdin read would otherwise keep the runtime alive.
        std::process::exit(0);
    }
}
