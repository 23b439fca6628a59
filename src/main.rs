//! `segments` binary: split payloads into fragments and join them back.
//!
//! Fragments travel as one JSON envelope per line so the two subcommands can
//! be chained through a pipe.

mod cli;

use std::{error::Error, sync::Arc, time::Duration};

use clap::Parser;
use log::{info, warn};
use segments::{
    Fragmenter,
    JsonDecoder,
    JsonEnvelopeCodec,
    Reassembler,
    ReassemblyConfig,
    spawn_sweeper,
};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Diagnostics go to stderr; stdout carries fragments or messages.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match Cli::parse().command {
        Command::Split { id, max_bytes } => split(id, max_bytes).await,
        Command::Join {
            timeout_secs,
            sweep_interval_secs,
            max_fragments,
            max_message_size,
        } => {
            let mut config =
                ReassemblyConfig::default().with_timeout(Duration::from_secs(timeout_secs));
            if let Some(limit) = max_fragments {
                config = config.with_max_fragments(limit);
            }
            if let Some(limit) = max_message_size {
                config = config.with_max_message_size(limit);
            }
            join(config, Duration::from_secs(sweep_interval_secs.max(1))).await
        }
    }
}

async fn split(id: String, max_bytes: usize) -> Result<(), Box<dyn Error>> {
    let mut payload = Vec::new();
    io::stdin().read_to_end(&mut payload).await?;

    let batch = Fragmenter::new(JsonEnvelopeCodec).split(payload, id, max_bytes)?;
    let mut stdout = io::stdout();
    for encoded in batch.encoded() {
        stdout.write_all(encoded).await?;
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}

async fn join(config: ReassemblyConfig, period: Duration) -> Result<(), Box<dyn Error>> {
    let timeout = config.timeout;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = Arc::new(
        Reassembler::builder(JsonDecoder::<serde_json::Value>::new())
            .config(config)
            .handler(move |message| {
                if tx.send(message).is_err() {
                    warn!("message dropped: output closed");
                }
            })
            .build(),
    );
    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(Arc::clone(&engine), period, timeout, shutdown.clone());

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Rejections are logged by the engine; the stream carries on.
        if engine.ingest(line.as_bytes()).is_err() {
            continue;
        }
        while let Ok(message) = rx.try_recv() {
            let mut rendered = serde_json::to_vec(&message)?;
            rendered.push(b'\n');
            stdout.write_all(&rendered).await?;
        }
        stdout.flush().await?;
    }

    shutdown.cancel();
    sweeper.await?;
    for id in engine.store().ids() {
        warn!(
            "incomplete message discarded: id={id}, received={}",
            engine.received_count(id.as_str())
        );
    }
    info!("input closed");
    Ok(())
}
