//! telemetry/snapshot.rs
//! Immutable view of one stream's counters and timings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Stage, StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub frames_initial: u64,
    pub frames_resolve: u64,
    pub frames_reject: u64,
    pub frames_skipped: u64,
    pub fragments: u64,
    pub aliases: u64,
    pub bytes: u64,
    pub throughput_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
    /// Captured sink output when the blocking encoder ran with `with_buf`.
    #[serde(skip)]
    pub output: Option<Vec<u8>>,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();
        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            frames_initial: counters.frames_initial,
            frames_resolve: counters.frames_resolve,
            frames_reject: counters.frames_reject,
            frames_skipped: counters.frames_skipped,
            fragments: counters.fragments,
            aliases: counters.aliases,
            bytes: counters.bytes,
            throughput_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
            output: None,
        }
    }

    pub fn settlements(&self) -> u64 {
        self.frames_resolve + self.frames_reject
    }

    pub fn total_frames(&self) -> u64 {
        self.frames_initial + self.settlements()
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    pub fn has_all_stages(&self, expected: &[Stage]) -> bool {
        self.stage_times.has_all(expected)
    }

    /// Internal consistency:
    /// - at most one initial frame
    /// - every alias is also a fragment
    pub fn sanity_check(&self) -> bool {
        self.frames_initial <= 1 && self.aliases <= self.fragments
    }

    pub fn attach_output(&mut self, output: Vec<u8>) {
        self.output = Some(output);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
