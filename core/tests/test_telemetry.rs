#[cfg(test)]
mod telemetry_snapshot_tests {
    use std::time::Duration;

    use futures::executor::block_on;
    use graphwire_core::stream::framing::FrameType;
    use graphwire_core::stream::{encode_to_sink, ApiConfig, EncodeOptions, FrameEncoder, OutputSink};
    use graphwire_core::telemetry::{Stage, StageTimes, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
    use graphwire_core::value::{Deferred, Value};

    fn make_counters() -> TelemetryCounters {
        TelemetryCounters {
            frames_initial: 1,
            frames_resolve: 3,
            frames_reject: 1,
            frames_skipped: 2,
            fragments: 12,
            aliases: 1,
            bytes: 200,
        }
    }

    fn make_timer() -> TelemetryTimer {
        let mut timer = TelemetryTimer::new();
        std::thread::sleep(Duration::from_millis(20)); // ensure elapsed > stage times
        timer.add_stage_time(Stage::Flatten, Duration::from_millis(5));
        timer.add_stage_time(Stage::Write, Duration::from_millis(10));
        timer.finish();
        timer
    }

    #[test]
    fn snapshot_initializes_output_none() {
        let snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer());
        assert!(snapshot.output.is_none());
    }

    #[test]
    fn attach_output_sets_output_field() {
        let mut snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer());

        let buf = b"-1\n".to_vec();
        snapshot.attach_output(buf.clone());
        assert_eq!(snapshot.output, Some(buf));
    }

    #[test]
    fn snapshot_copies_counters_and_totals() {
        let snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer());
        assert_eq!(snapshot.settlements(), 4);
        assert_eq!(snapshot.total_frames(), 5);
        assert_eq!(snapshot.frames_skipped, 2);
        assert!(snapshot.throughput_bytes_per_sec > 0.0);
        assert!(snapshot.elapsed >= snapshot.total_stage_time());
        assert_eq!(snapshot.total_stage_time(), Duration::from_millis(15));
    }

    #[test]
    fn sanity_check_flags_impossible_counts() {
        let timer = make_timer();
        assert!(TelemetrySnapshot::from(&make_counters(), &timer).sanity_check());

        let mut counters = make_counters();
        counters.frames_initial = 2;
        assert!(!TelemetrySnapshot::from(&counters, &timer).sanity_check());

        let mut counters = make_counters();
        counters.aliases = counters.fragments + 1;
        assert!(!TelemetrySnapshot::from(&counters, &timer).sanity_check());
    }

    #[test]
    fn json_skips_captured_output() {
        let mut snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer());
        snapshot.attach_output(vec![1, 2, 3]);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"frames_resolve\":3"));
        assert!(!json.contains("output"));

        let back: TelemetrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.aliases, 1);
        assert!(back.output.is_none());
    }

    // --- Counters ---

    #[test]
    fn counters_accumulate_by_frame_type() {
        let mut counters = TelemetryCounters::default();
        counters.add_initial(10, 3);
        counters.add_settlement(FrameType::Resolve, 6, 1);
        counters.add_settlement(FrameType::Reject, 8, 2);
        counters.add_skipped(1);
        counters.add_alias();

        assert_eq!(counters.frames_initial, 1);
        assert_eq!(counters.frames_resolve, 1);
        assert_eq!(counters.frames_reject, 1);
        assert_eq!(counters.frames_skipped, 1);
        assert_eq!(counters.fragments, 6);
        assert_eq!(counters.aliases, 1);
        assert_eq!(counters.bytes, 25);
        assert_eq!(counters.total_frames(), 3);
    }

    #[test]
    fn counters_merge() {
        let mut total = make_counters();
        total += make_counters();
        assert_eq!(total.frames_resolve, 6);
        assert_eq!(total.bytes, 400);

        let mut merged = TelemetryCounters::default();
        merged.merge(&make_counters());
        assert_eq!(merged, make_counters());
    }

    // --- Timers ---

    #[test]
    fn stage_times_accumulate() {
        let mut times = StageTimes::default();
        times.add(Stage::Read, Duration::from_millis(2));
        times.add(Stage::Read, Duration::from_millis(3));

        assert_eq!(times.get(Stage::Read), Duration::from_millis(5));
        assert_eq!(times.get(Stage::Write), Duration::ZERO);
        assert!((times.get_ms(Stage::Read) - 5.0).abs() < 1e-9);
        assert!((times.get_us(Stage::Read) - 5_000.0).abs() < 1e-6);
        assert!(times.has_all(&[Stage::Read]));
        assert!(!times.has_all(&[Stage::Read, Stage::Settle]));
        assert_eq!(times.iter().count(), 1);
    }

    #[test]
    fn timer_finish_is_idempotent() {
        let mut timer = TelemetryTimer::new();
        timer.finish();
        let first = timer.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        timer.finish();
        assert_eq!(timer.elapsed(), first);
    }

    #[test]
    fn timer_time_charges_stage() {
        let mut timer = TelemetryTimer::new();
        let out = timer.time(Stage::Unflatten, || {
            std::thread::sleep(Duration::from_millis(2));
            7
        });
        assert_eq!(out, 7);
        assert!(timer.stage_times.get(Stage::Unflatten) >= Duration::from_millis(2));
    }

    #[test]
    fn stage_display_names() {
        assert_eq!(Stage::Flatten.to_string(), "flatten");
        assert_eq!(Stage::Settle.to_string(), "settle");
    }

    // --- Live streams ---

    #[test]
    fn encoder_snapshot_matches_output() {
        let value = Value::array([
            Value::Deferred(Deferred::resolved(Value::from("x"))),
            Value::Deferred(Deferred::rejected(Value::error("no"))),
        ]);
        let snapshot = encode_to_sink(
            value,
            OutputSink::Memory,
            EncodeOptions::new(),
            ApiConfig::with_buf_enabled(),
        )
        .unwrap();

        let output = snapshot.output.clone().unwrap();
        assert_eq!(snapshot.bytes, output.len() as u64);
        assert_eq!(snapshot.total_frames(), 3);
        assert!(snapshot.sanity_check());
        assert!(snapshot.has_all_stages(&[Stage::Flatten, Stage::Settle, Stage::Write]));
    }

    #[test]
    fn encoder_counts_fragments_without_retransmission() {
        let shared = Value::array([Value::from(1)]);
        let value = Value::array([
            shared.clone(),
            Value::Deferred(Deferred::resolved(Value::array([shared]))),
        ]);
        let mut encoder = FrameEncoder::new(value, EncodeOptions::new());
        while block_on(encoder.next_frame()).is_some() {}

        // Four fragments up front; the settlement adds only the new outer array.
        assert_eq!(encoder.counters().fragments, 5);
        assert_eq!(encoder.state().table().len(), 5);
    }
}
