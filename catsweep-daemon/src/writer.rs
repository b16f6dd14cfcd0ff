//! Default record sink: JSON lines on an async writer (stdout in production).
//!
//! Each record becomes one line: `{"tag": ..., "time": ..., "record": {...}}`,
//! where `time` is the emission timestamp in RFC 3339 with millisecond precision.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};

use catsweep_core::event::RecordEvent;
use catsweep_core::types::Record;

/// Wire shape of one output line.
#[derive(Debug, Serialize)]
struct OutputLine<'a> {
    tag: &'a str,
    time: String,
    record: &'a Record,
}

/// Render a record event as a single JSON line (without the trailing newline).
pub fn format_record_line(event: &RecordEvent) -> Result<String, serde_json::Error> {
    let time: DateTime<Utc> = event.timestamp().into();
    serde_json::to_string(&OutputLine {
        tag: &event.tag,
        time: time.to_rfc3339_opts(SecondsFormat::Millis, true),
        record: &event.record,
    })
}

async fn write_event<W>(out: &mut W, event: &RecordEvent) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = format_record_line(event).map_err(std::io::Error::other)?;
    line.push('\n');
    out.write_all(line.as_bytes()).await
}

/// Spawn the task that writes every received record to `out`.
///
/// On shutdown, records already queued in the channel are flushed
/// before the task exits. Returns the number of lines written.
pub fn spawn_record_writer<W>(
    mut record_rx: mpsc::Receiver<RecordEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
    mut out: W,
) -> tokio::task::JoinHandle<u64>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut written = 0u64;

        loop {
            tokio::select! {
                event = record_rx.recv() => {
                    match event {
                        Some(event) => {
                            if let Err(e) = write_event(&mut out, &event).await {
                                tracing::error!(error = %e, "failed to write record, stopping writer");
                                break;
                            }
                            written += 1;
                        }
                        None => {
                            tracing::debug!("record channel closed, exiting writer");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    while let Ok(event) = record_rx.try_recv() {
                        if let Err(e) = write_event(&mut out, &event).await {
                            tracing::error!(error = %e, "failed to write record during drain");
                            break;
                        }
                        written += 1;
                    }
                    tracing::debug!(written, "record writer shutting down");
                    break;
                }
            }
        }

        if let Err(e) = out.flush().await {
            tracing::warn!(error = %e, "failed to flush record output");
        }
        written
    })
}
