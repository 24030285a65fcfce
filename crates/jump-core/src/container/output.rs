//! Forwarding of demultiplexed container output to stdout/stderr sinks.
//
// Each sink is drained by its own task behind an unbounded channel, so reading
// the log stream never waits on a slow sink.

use bytes::Bytes;
use futures_util::stream::StreamExt;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use crate::engine::{LogChunk, LogStream};
use crate::errors::JumpError;

/// Bytes kept per stream in [`CapturedOutput`] unless configured otherwise.
pub const DEFAULT_CAPTURE_LIMIT: usize = 1024 * 1024;

/// Copies of what was forwarded to the sinks, each cut at the capture limit.
/// The sinks themselves always receive the full output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

async fn forward<W>(
    mut chunks: UnboundedReceiver<Bytes>,
    mut sink: W,
    capture_limit: usize,
) -> io::Result<Vec<u8>>
where
    W: AsyncWrite + Unpin,
{
    let mut captured = Vec::new();
    while let Some(chunk) = chunks.recv().await {
        sink.write_all(&chunk).await?;
        sink.flush().await?;
        let room = capture_limit.saturating_sub(captured.len());
        captured.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
    Ok(captured)
}

async fn join_sink(task: JoinHandle<io::Result<Vec<u8>>>, name: &str) -> Result<Vec<u8>, JumpError> {
    let context = format!("Failed to write container {}", name);
    match task.await {
        Ok(result) => result.map_err(JumpError::io(context)),
        Err(e) => Err(JumpError::Io {
            context,
            source: io::Error::other(e),
        }),
    }
}

/// Route stdout chunks to `stdout` and stderr chunks to `stderr` as they arrive,
/// keeping at most `capture_limit` bytes of each.
pub async fn demultiplex<O, E>(
    mut logs: LogStream<'_>,
    stdout: O,
    stderr: E,
    capture_limit: usize,
) -> Result<CapturedOutput, JumpError>
where
    O: AsyncWrite + Unpin + Send + 'static,
    E: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (err_tx, err_rx) = mpsc::unbounded_channel();
    let out_task = tokio::spawn(forward(out_rx, stdout, capture_limit));
    let err_task = tokio::spawn(forward(err_rx, stderr, capture_limit));

    let mut read_result = Ok(());
    while let Some(chunk) = logs.next().await {
        // A failed send means that sink already errored; its task reports it.
        match chunk {
            Ok(LogChunk::Stdout(bytes)) => {
                let _ = out_tx.send(bytes);
            }
            Ok(LogChunk::Stderr(bytes)) => {
                let _ = err_tx.send(bytes);
            }
            Err(e) => {
                read_result = Err(JumpError::from(e));
                break;
            }
        }
    }
    drop(out_tx);
    drop(err_tx);

    let stdout = join_sink(out_task, "stdout").await;
    let stderr = join_sink(err_task, "stderr").await;
    read_result?;

    Ok(CapturedOutput {
        stdout: stdout?,
        stderr: stderr?,
    })
}
