//! stream/encoder.rs
//! Produces the frames of one encoded stream.
//!
//! The first frame carries the root value. Every deferred value met while
//! flattening is registered and awaited; whichever settles first produces the
//! next frame. A settlement frame carries only the fragments appended since
//! the previous frame, so nothing already sent is sent again. The stream ends
//! once no deferred value is outstanding.

use std::time::Instant;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, FuturesUnordered, StreamExt};
use bytes::Bytes;

use crate::constants::UNKNOWN_ERROR_MESSAGE;
use crate::stream::cancel::{race, CancellationToken};
use crate::stream::flatten::EncodeState;
use crate::stream::fragment::RefId;
use crate::stream::framing::{encode_settlement, frame_line, FrameType};
use crate::stream::options::EncodeOptions;
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::StreamError;
use crate::value::{Settlement, Value};

/// Newline-terminated frames, in emission order.
pub type FrameStream = BoxStream<'static, Result<Bytes, StreamError>>;

enum Phase {
    Initial(Value),
    Settling,
    Closed,
}

pub struct FrameEncoder {
    state: EncodeState,
    phase: Phase,
    in_flight: FuturesUnordered<BoxFuture<'static, (u64, Settlement)>>,
    // Highest table index already written to the wire.
    high_water: Option<usize>,
    cancellation: Vec<CancellationToken>,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl FrameEncoder {
    pub fn new(value: Value, options: EncodeOptions) -> Self {
        Self {
            state: EncodeState::new(options.plugins),
            phase: Phase::Initial(value),
            in_flight: FuturesUnordered::new(),
            high_water: None,
            cancellation: options.cancellation.into_iter().collect(),
            counters: TelemetryCounters::default(),
            timer: TelemetryTimer::new(),
        }
    }

    pub fn state(&self) -> &EncodeState {
        &self.state
    }

    /// Highest fragment index emitted so far.
    pub fn high_water_mark(&self) -> Option<usize> {
        self.high_water
    }

    pub fn counters(&self) -> &TelemetryCounters {
        &self.counters
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closed)
    }

    /// Also race deferred values against `token`. Only affects deferred
    /// values not yet being awaited.
    pub fn add_cancellation(&mut self, token: CancellationToken) {
        self.cancellation.push(token);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from(&self.counters, &self.timer)
    }

    /// Next frame as a line without terminator, or `None` once the stream has
    /// ended. An error ends the stream.
    pub async fn next_frame(&mut self) -> Option<Result<String, StreamError>> {
        match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Initial(value) => {
                let frame = self.initial_frame(&value);
                if frame.is_ok() && !self.state.registry().is_empty() {
                    self.phase = Phase::Settling;
                } else {
                    self.close();
                }
                Some(frame)
            }
            Phase::Settling => {
                if self.state.registry().is_empty() {
                    self.close();
                    return None;
                }
                self.schedule();

                let start = Instant::now();
                let next = self.in_flight.next().await;
                self.timer.add_stage_time(Stage::Settle, start.elapsed());

                let frame = match next {
                    Some((id, settlement)) => self.settlement_frame(id, settlement),
                    None => Err(StreamError::Invariant(
                        "deferred values registered but none in flight",
                    )),
                };
                if frame.is_ok() {
                    self.phase = Phase::Settling;
                } else {
                    self.close();
                }
                Some(frame)
            }
            Phase::Closed => None,
        }
    }

    /// Drive the encoder as a stream of terminated lines.
    pub fn into_stream(self) -> FrameStream {
        stream::unfold(self, |mut encoder| async move {
            let frame = encoder.next_frame().await?;
            Some((frame.map(frame_line), encoder))
        })
        .boxed()
    }

    fn close(&mut self) {
        self.phase = Phase::Closed;
        self.timer.finish();
        tracing::debug!(
            frames = self.counters.total_frames(),
            fragments = self.counters.fragments,
            bytes = self.counters.bytes,
            "encode stream closed"
        );
    }

    fn schedule(&mut self) {
        for (id, deferred) in self.state.registry_mut().schedule() {
            tracing::trace!(deferred_id = id, "awaiting deferred value");
            self.in_flight
                .push(race(id, deferred, self.cancellation.clone()));
        }
    }

    fn initial_frame(&mut self, value: &Value) -> Result<String, StreamError> {
        let start = Instant::now();
        let reference = self.state.flatten(value)?;
        self.timer.add_stage_time(Stage::Flatten, start.elapsed());

        let (line, fragments) = match reference {
            RefId::Sentinel(sentinel) => (sentinel.code().to_string(), 0),
            RefId::Index(_) => {
                let table = self.state.table();
                self.high_water = table.last_index();
                (table.payload_from(0), table.len())
            }
            RefId::BackRef(_) => {
                return Err(StreamError::Invariant(
                    "root value resolved to an existing fragment",
                ))
            }
        };

        self.counters.add_initial(line.len() + 1, fragments);
        tracing::debug!(
            fragments,
            deferred = self.state.registry().len(),
            "initial frame"
        );
        Ok(line)
    }

    fn settlement_frame(&mut self, id: u64, settlement: Settlement) -> Result<String, StreamError> {
        let start = Instant::now();
        let (mut frame_type, value) = match settlement {
            Ok(value) => (FrameType::Resolve, value),
            Err(reason) => (FrameType::Reject, normalize_rejection(reason)),
        };

        let checkpoint = self.state.checkpoint();
        let reference = match self.state.flatten(&value) {
            Ok(reference) => reference,
            Err(err) => {
                self.state.rollback(checkpoint);
                tracing::warn!(deferred_id = id, error = %err, "settled value cannot be encoded; rejecting");
                frame_type = FrameType::Reject;
                self.state.flatten(&Value::error(err.to_string()))?
            }
        };
        self.timer.add_stage_time(Stage::Flatten, start.elapsed());

        let (payload, fragments) = match reference {
            RefId::Sentinel(sentinel) => (sentinel.code().to_string(), 0),
            RefId::BackRef(target) => {
                let alias = self.state.push_alias(target);
                self.high_water = self.state.table().last_index();
                self.counters.add_alias();
                (format!("[{}]", alias), 1)
            }
            RefId::Index(_) => {
                let start = self.high_water.map_or(0, |hw| hw + 1);
                let table = self.state.table();
                let payload = table.payload_from(start);
                let fragments = table.len() - start;
                self.high_water = table.last_index();
                (payload, fragments)
            }
        };

        if !self.state.registry_mut().remove(id) {
            return Err(StreamError::Invariant("settled an unregistered deferred id"));
        }

        let line = encode_settlement(frame_type, id, &payload);
        self.counters
            .add_settlement(frame_type, line.len() + 1, fragments);
        tracing::debug!(
            deferred_id = id,
            frame = frame_type.as_str(),
            fragments,
            outstanding = self.state.registry().len(),
            "settlement frame"
        );
        Ok(line)
    }
}

/// Rejections always carry an error value.
fn normalize_rejection(reason: Value) -> Value {
    match reason {
        Value::Error(_) => reason,
        other => {
            tracing::debug!(kind = other.type_name(), "non-error rejection reason replaced");
            Value::error(UNKNOWN_ERROR_MESSAGE)
        }
    }
}

/// Encode `value` as a stream of frames.
pub fn encode(value: Value, options: EncodeOptions) -> FrameStream {
    FrameEncoder::new(value, options).into_stream()
}
