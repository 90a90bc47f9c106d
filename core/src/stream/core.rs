//! stream/core.rs
//! Stable public API: async encode/decode plus blocking sink/source bridges.

use std::sync::PoisonError;

use crate::constants::{DEFAULT_QUEUE_CAP, MAX_QUEUE_CAP};
use crate::stream::decoder::{decode, Decoded};
use crate::stream::encoder::FrameEncoder;
use crate::stream::io::{open_output, open_source_reader, InputSource, OutputSink};
use crate::stream::options::{DecodeOptions, EncodeOptions};
use crate::stream::pipeline::{run_encode_pipeline, spawn_drain, DrainHandle};
use crate::telemetry::TelemetrySnapshot;
use crate::types::StreamError;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Whether to capture `OutputSink::Memory` output into the snapshot.
    /// - `None` or `Some(false)` → output discarded (production default).
    /// - `Some(true)` → captured for tests/benchmarks.
    pub with_buf: Option<bool>,

    /// Lines buffered between the encoder thread and the writer.
    pub queue_cap: Option<usize>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            with_buf: Some(false),
            queue_cap: Some(DEFAULT_QUEUE_CAP),
        }
    }
}

impl ApiConfig {
    pub fn new(with_buf: Option<bool>, queue_cap: Option<usize>) -> Self {
        Self {
            with_buf: with_buf.or(Some(false)),
            queue_cap: queue_cap.or(Some(DEFAULT_QUEUE_CAP)),
        }
    }

    pub fn with_buf_enabled() -> Self {
        Self {
            with_buf: Some(true),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        let q = self.queue_cap.unwrap_or(DEFAULT_QUEUE_CAP);
        if q == 0 || q > MAX_QUEUE_CAP {
            return Err(StreamError::Validation(format!(
                "invalid queue capacity: {q}, must be in 1..={MAX_QUEUE_CAP}"
            )));
        }
        Ok(())
    }
}

/// Encode `value` and write every frame to `output`, blocking until the last
/// deferred value has settled.
pub fn encode_to_sink(
    value: Value,
    output: OutputSink,
    options: EncodeOptions,
    config: ApiConfig,
) -> Result<TelemetrySnapshot, StreamError> {
    config.validate()?;
    let (writer, maybe_buf) = open_output(output, config.with_buf)?;

    let encoder = FrameEncoder::new(value, options);
    let mut snapshot = run_encode_pipeline(
        encoder,
        writer,
        config.queue_cap.unwrap_or(DEFAULT_QUEUE_CAP),
    )?;

    if let Some(buf) = maybe_buf {
        let captured = buf.lock().unwrap_or_else(PoisonError::into_inner).clone();
        snapshot.attach_output(captured);
    }
    Ok(snapshot)
}

/// Result of [`decode_from_source`]: the root value and the background drain.
pub struct BlockingDecoded {
    pub value: Value,
    pub drain: DrainHandle,
}

/// Decode from a blocking source. Returns once the initial frame is read;
/// placeholders settle on a background thread.
pub fn decode_from_source(
    input: InputSource,
    options: DecodeOptions,
) -> Result<BlockingDecoded, StreamError> {
    let reader = open_source_reader(input)?;
    let Decoded { value, done } = pollster::block_on(decode(reader, options))?;
    Ok(BlockingDecoded {
        value,
        drain: spawn_drain(done)?,
    })
}
