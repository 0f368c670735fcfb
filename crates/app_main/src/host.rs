//! JSON-lines host loop
//!
//! Requests are dispatched concurrently; responses are written by a single
//! writer task so lines never interleave.

use anyhow::Result;
use app_core::{AppError, Dispatcher, Event, Preferences, ResponseEnvelope};
use crossbeam_channel::Receiver;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use uuid::Uuid;

enum Outgoing {
    Line(String),
    Close,
}

/// Serve requests from `input` until it closes; returns `output` once every
/// in-flight response has been written
pub async fn run<R, W>(dispatcher: Dispatcher, input: R, output: W) -> Result<W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_lines(output, rx));

    forward_preferences(dispatcher.engine().subscribe_preferences(), tx.clone());

    let mut in_flight = JoinSet::new();
    let mut reader = BufReader::new(input);
    let mut buf = Vec::new();
    loop {
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Cannot read input: {}", e);
                break;
            }
        }

        let line = match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Rejected request: {}", e);
                let err = AppError::InvalidRequest(e.to_string());
                send_response(&tx, ResponseEnvelope::error(Uuid::nil(), &err));
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let dispatcher = dispatcher.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            send_response(&tx, dispatcher.dispatch_line(&line).await);
        });
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Request task failed: {}", e);
        }
    }

    let _ = tx.send(Outgoing::Close);
    let output = writer.await??;
    Ok(output)
}

fn send_response(tx: &UnboundedSender<Outgoing>, response: ResponseEnvelope) {
    match response.to_line() {
        Ok(line) => {
            let _ = tx.send(Outgoing::Line(line));
        }
        Err(e) => tracing::error!("Cannot encode response {}: {}", response.id, e),
    }
}

async fn write_lines<W>(mut output: W, mut rx: UnboundedReceiver<Outgoing>) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        match message {
            Outgoing::Line(line) => {
                output.write_all(line.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
            Outgoing::Close => break,
        }
    }
    Ok(output)
}

/// Push every preference change to the host as a `prefsChanged` event
fn forward_preferences(prefs: Receiver<Preferences>, tx: UnboundedSender<Outgoing>) {
    let spawned = std::thread::Builder::new()
        .name("prefs-forwarder".into())
        .spawn(move || {
            for prefs in prefs.iter() {
                let line = match (Event::PrefsChanged { prefs }).to_line() {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Cannot encode preferences event: {}", e);
                        continue;
                    }
                };
                if tx.send(Outgoing::Line(line)).is_err() {
                    break;
                }
            }
        });

    if let Err(e) = spawned {
        tracing::error!("Failed to start preferences forwarder: {}", e);
    }
}
