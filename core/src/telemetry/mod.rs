//! telemetry/mod.rs
//! Unified telemetry module: counters, timers, and immutable snapshots.
//!
//! Encoder and decoder each own one `TelemetryCounters` and one
//! `TelemetryTimer`; a `TelemetrySnapshot` is taken when the stream ends.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
