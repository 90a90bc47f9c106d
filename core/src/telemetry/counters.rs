//! telemetry/counters.rs
//! Mutable counters collected while a stream is encoded or decoded.
//!
//! Converted into an immutable `TelemetrySnapshot` at stream end.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::stream::framing::FrameType;

/// Deterministic counters collected during stream processing
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub frames_initial: u64,
    pub frames_resolve: u64,
    pub frames_reject: u64,
    /// Blank lines the decoder skipped.
    pub frames_skipped: u64,
    /// Fragments written or read, alias fragments included.
    pub fragments: u64,
    /// Settlements sent as `["Z",k]` instead of new fragments.
    pub aliases: u64,
    /// Line bytes including terminators.
    pub bytes: u64,
}

impl TelemetryCounters {
    /// Record the initial frame.
    ///
    /// - `line_len`: encoded line length including the terminator
    /// - `fragments`: fragments carried (0 for a bare sentinel)
    pub fn add_initial(&mut self, line_len: usize, fragments: usize) {
        self.frames_initial += 1;
        self.bytes += line_len as u64;
        self.fragments += fragments as u64;
    }

    /// Record one settlement frame.
    pub fn add_settlement(&mut self, frame_type: FrameType, line_len: usize, fragments: usize) {
        match frame_type {
            FrameType::Resolve => self.frames_resolve += 1,
            FrameType::Reject => self.frames_reject += 1,
        }
        self.bytes += line_len as u64;
        self.fragments += fragments as u64;
    }

    pub fn add_alias(&mut self) {
        self.aliases += 1;
    }

    pub fn add_skipped(&mut self, line_len: usize) {
        self.frames_skipped += 1;
        self.bytes += line_len as u64;
    }

    pub fn settlements(&self) -> u64 {
        self.frames_resolve + self.frames_reject
    }

    pub fn total_frames(&self) -> u64 {
        self.frames_initial + self.settlements()
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.frames_initial += other.frames_initial;
        self.frames_resolve += other.frames_resolve;
        self.frames_reject += other.frames_reject;
        self.frames_skipped += other.frames_skipped;
        self.fragments += other.fragments;
        self.aliases += other.aliases;
        self.bytes += other.bytes;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
