use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use bridge_events::{BridgeConfig, ClientEvent, EventBridge, ProtocolEvent, SystemClock};

/// Replays captured source traffic through the event bridge and prints every
/// canonical event as one JSON line.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// JSON-lines file of captured source frames
    #[clap(long, value_name = "PATH", required = true)]
    input: PathBuf,

    /// Account id of the logged-in user
    #[clap(long, value_name = "ID", default_value_t = 0)]
    self_id: i64,

    /// Directory for application logs; logging stays off when omitted
    #[clap(long, value_name = "PATH")]
    logs_dir: Option<PathBuf>,

    /// Capacity of the event channel
    #[clap(long, value_name = "N")]
    buffer: Option<usize>,
}

/// One captured line: which stream it came from and the raw notification.
#[derive(Debug, Deserialize)]
#[serde(tag = "source", content = "event", rename_all = "lowercase")]
enum SourceFrame {
    Table(ClientEvent),
    E2ee(ProtocolEvent),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = BridgeConfig::from_env()?;
    config.self_id = args.self_id;
    if let Some(buffer) = args.buffer {
        config.event_buffer = buffer;
    }
    if args.logs_dir.is_some() {
        config.logs_dir = args.logs_dir.clone();
    }
    if let Some(logs_dir) = &config.logs_dir {
        bridge_events::init_tracing(logs_dir)?;
    }

    let (bridge, mut receiver) = EventBridge::new(config, Arc::new(SystemClock))?;

    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while let Some(event) = receiver.recv().await {
            match event.to_json() {
                Ok(line) => {
                    println!("{}", line);
                    printed += 1;
                }
                Err(e) => tracing::error!("Failed to encode {} event: {}", event.event_type(), e),
            }
        }
        printed
    });

    let file = tokio::fs::File::open(&args.input)
        .await
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let frame: SourceFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Skipping line {}: {}", line_number, e);
                continue;
            }
        };
        match frame {
            SourceFrame::Table(event) => {
                bridge.handle_client_event(&event);
            }
            SourceFrame::E2ee(event) => {
                bridge.handle_protocol_event(&event);
            }
        }
        // Let the printer drain between frames
        tokio::task::yield_now().await;
    }

    let dropped = bridge.dropped_count();
    drop(bridge);
    let printed = printer.await?;

    tracing::info!(
        "Replayed {} lines: {} events printed, {} dropped",
        line_number,
        printed,
        dropped
    );

    Ok(())
}
