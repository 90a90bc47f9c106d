//! stream/decoder.rs
//! Reads an encoded stream back into a value.
//!
//! `decode` returns as soon as the initial frame is hydrated. Deferred
//! positions in that value are placeholders; they settle while the returned
//! `done` future drains the remaining lines. If draining fails, or the input
//! ends while placeholders are still pending, every pending placeholder is
//! rejected with the failure and `done` reports it.

use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use futures::io::{AsyncBufRead, AsyncBufReadExt};
use serde_json::Value as Json;

use crate::stream::framing::{decode_frame, is_blank, FrameType};
use crate::stream::options::DecodeOptions;
use crate::stream::unflatten::DecodeState;
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::{ProtocolError, StreamError, SyntaxError};
use crate::value::Value;

/// Completes when the input is exhausted and every placeholder has settled.
pub type DrainFuture = BoxFuture<'static, Result<TelemetrySnapshot, StreamError>>;

pub struct Decoded {
    pub value: Value,
    pub done: DrainFuture,
}

/// Read the initial frame and hand back the root value plus the drain future.
///
/// Placeholders only settle while `done` is polled. Dropping `done` rejects
/// every placeholder still pending.
pub async fn decode<R>(reader: R, options: DecodeOptions) -> Result<Decoded, StreamError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let mut timer = TelemetryTimer::new();
    let mut counters = TelemetryCounters::default();
    let mut lines = LineReader::new(reader);

    let start = Instant::now();
    let Some(line) = lines.next_line().await? else {
        return Err(SyntaxError::MissingInitialFrame.into());
    };
    timer.add_stage_time(Stage::Read, start.elapsed());
    if is_blank(&line) {
        return Err(SyntaxError::EmptyInitialFrame.into());
    }

    let mut state = DecodeState::new(options.plugins);
    let start = Instant::now();
    let payload: Json = serde_json::from_str(&line)?;
    let value = state.unflatten(payload)?;
    timer.add_stage_time(Stage::Unflatten, start.elapsed());

    counters.add_initial(line.len() + 1, state.fragment_count());
    tracing::debug!(
        fragments = state.fragment_count(),
        pending = state.registry().len(),
        "initial frame decoded"
    );

    let drain = Drain {
        lines,
        state,
        counters,
        timer,
    };
    Ok(Decoded {
        value,
        done: drain.run().boxed(),
    })
}

/// Splits the input on `\n`, dropping a trailing `\r`. Bytes that are not
/// UTF-8 are a syntax error rather than an I/O failure.
struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R> LineReader<R>
where
    R: AsyncBufRead + Unpin,
{
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        let line = std::str::from_utf8(&self.buf).map_err(SyntaxError::InvalidUtf8)?;
        Ok(Some(line.to_owned()))
    }
}

struct Drain<R> {
    lines: LineReader<R>,
    state: DecodeState,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl<R> Drain<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn run(mut self) -> Result<TelemetrySnapshot, StreamError> {
        let drained = self.drain_lines().await;
        let outcome = match drained {
            Ok(()) if !self.state.registry().is_empty() => Err(ProtocolError::StreamClosed {
                pending: self.state.registry().len(),
            }
            .into()),
            other => other,
        };

        self.timer.finish();
        match outcome {
            Ok(()) => {
                tracing::debug!(
                    settlements = self.counters.settlements(),
                    skipped = self.counters.frames_skipped,
                    "decode stream drained"
                );
                Ok(TelemetrySnapshot::from(&self.counters, &self.timer))
            }
            Err(err) => {
                let reason = err.to_error_value();
                let rejected = self.state.registry_mut().reject_all(&reason);
                tracing::warn!(error = %err, rejected, "decode failed; rejecting pending placeholders");
                Err(err)
            }
        }
    }

    async fn drain_lines(&mut self) -> Result<(), StreamError> {
        loop {
            let start = Instant::now();
            let Some(line) = self.lines.next_line().await? else {
                return Ok(());
            };
            self.timer.add_stage_time(Stage::Read, start.elapsed());

            if is_blank(&line) {
                self.counters.add_skipped(line.len() + 1);
                continue;
            }
            self.dispatch(&line)?;
        }
    }

    fn dispatch(&mut self, line: &str) -> Result<(), StreamError> {
        let frame = decode_frame(line)?;

        let start = Instant::now();
        let before = self.state.fragment_count();
        let payload: Json = serde_json::from_str(frame.payload)?;
        let value = self.state.unflatten(payload)?;
        self.timer.add_stage_time(Stage::Unflatten, start.elapsed());

        let start = Instant::now();
        let registry = self.state.registry_mut();
        match frame.frame_type {
            FrameType::Resolve => registry.resolve(frame.id, value)?,
            FrameType::Reject => registry.reject(frame.id, value)?,
        }
        self.timer.add_stage_time(Stage::Settle, start.elapsed());

        let fragments = self.state.fragment_count() - before;
        self.counters
            .add_settlement(frame.frame_type, line.len() + 1, fragments);
        tracing::trace!(
            deferred_id = frame.id,
            frame = frame.frame_type.as_str(),
            fragments,
            "settlement applied"
        );
        Ok(())
    }
}
