//! stream/pipeline.rs
//! Thread wiring for the blocking bridges. No wire logic lives here.
//!
//! Encode: a producer thread drives the async encoder and hands finished lines
//! to the calling thread over a bounded channel; the calling thread writes.
//! Decode: a worker thread drives the drain future and reports its outcome
//! over a channel.

use std::io::Write;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver};

use crate::constants::WRITER_FAILED_MESSAGE;
use crate::stream::cancel::CancellationToken;
use crate::stream::decoder::DrainFuture;
use crate::stream::encoder::FrameEncoder;
use crate::stream::io;
use crate::telemetry::{Stage, TelemetrySnapshot};
use crate::types::StreamError;
use crate::value::Value;

pub fn run_encode_pipeline<W>(
    mut encoder: FrameEncoder,
    mut writer: W,
    queue_cap: usize,
) -> Result<TelemetrySnapshot, StreamError>
where
    W: Write + Send,
{
    let (line_tx, line_rx) = bounded::<Result<String, StreamError>>(queue_cap);
    // Fired when the writer gives up, so a producer parked on an unsettled
    // deferred value still gets to exit.
    let abort = CancellationToken::new();
    encoder.add_cancellation(abort.clone());
    tracing::debug!(queue_cap, "encode pipeline start");

    thread::scope(move |scope| {
        // ---- Producer ----
        let producer = scope.spawn(move || {
            pollster::block_on(async {
                while let Some(line) = encoder.next_frame().await {
                    let failed = line.is_err();
                    if line_tx.send(line).is_err() {
                        tracing::debug!("writer gone, producer stopping");
                        break;
                    }
                    if failed {
                        break;
                    }
                }
            });
            drop(line_tx);
            encoder
        });

        // ---- Writer ----
        let written = write_lines(&line_rx, &mut writer);
        if written.is_err() {
            abort.cancel_with(Value::error(WRITER_FAILED_MESSAGE));
        }
        drop(line_rx);

        let encoder = producer
            .join()
            .map_err(|_| StreamError::PipelineError("encode producer panicked"))?;
        let write_time = written?;

        let mut snapshot = encoder.snapshot();
        snapshot.stage_times.add(Stage::Write, write_time);
        tracing::debug!(frames = snapshot.total_frames(), "encode pipeline done");
        Ok(snapshot)
    })
}

fn write_lines<W: Write>(
    lines: &Receiver<Result<String, StreamError>>,
    writer: &mut W,
) -> Result<Duration, StreamError> {
    let mut write_time = Duration::ZERO;
    for line in lines.iter() {
        let line = line?;
        let start = Instant::now();
        io::write_line(writer, line.as_bytes())?;
        write_time += start.elapsed();
    }
    writer.flush()?;
    Ok(write_time)
}

/// Handle on a drain running on its own thread.
pub struct DrainHandle {
    rx: Receiver<Result<TelemetrySnapshot, StreamError>>,
    worker: Option<JoinHandle<()>>,
}

impl DrainHandle {
    /// Block until the drain finishes.
    pub fn wait(mut self) -> Result<TelemetrySnapshot, StreamError> {
        let outcome = self
            .rx
            .recv()
            .map_err(|_| StreamError::PipelineError("drain worker exited without a result"))?;
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| StreamError::PipelineError("drain worker panicked"))?;
        }
        outcome
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

pub fn spawn_drain(done: DrainFuture) -> Result<DrainHandle, StreamError> {
    let (tx, rx) = bounded(1);
    let worker = thread::Builder::new()
        .name("graphwire-drain".into())
        .spawn(move || {
            let outcome = pollster::block_on(done);
            let _ = tx.send(outcome);
        })?;
    Ok(DrainHandle {
        rx,
        worker: Some(worker),
    })
}
