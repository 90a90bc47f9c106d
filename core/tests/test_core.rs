#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use graphwire_core::constants::MAX_QUEUE_CAP;
    use graphwire_core::stream::io::SharedBufferWriter;
    use graphwire_core::stream::{
        decode_from_source, encode_to_sink, ApiConfig, DecodeOptions, EncodeOptions, InputSource,
        OutputSink,
    };
    use graphwire_core::types::{ProtocolError, StreamError};
    use graphwire_core::value::{Deferred, Value};

    fn sample() -> Value {
        Value::object([
            ("a", Value::from(1)),
            ("b", Value::Deferred(Deferred::resolved(Value::from(2)))),
        ])
    }

    fn encode_captured(value: Value) -> Vec<u8> {
        let snapshot = encode_to_sink(
            value,
            OutputSink::Memory,
            EncodeOptions::new(),
            ApiConfig::with_buf_enabled(),
        )
        .unwrap();
        snapshot.output.expect("captured output")
    }

    // --- Validation Tests ---

    #[test]
    fn default_config_is_valid() {
        assert!(ApiConfig::default().validate().is_ok());
        assert!(ApiConfig::new(None, None).validate().is_ok());
        assert!(ApiConfig::new(None, Some(MAX_QUEUE_CAP)).validate().is_ok());
    }

    #[test]
    fn zero_queue_cap_is_rejected() {
        let err = ApiConfig::new(None, Some(0)).validate().unwrap_err();
        assert!(matches!(err, StreamError::Validation(_)));
    }

    #[test]
    fn oversized_queue_cap_is_rejected() {
        let result = encode_to_sink(
            Value::Null,
            OutputSink::Memory,
            EncodeOptions::new(),
            ApiConfig::new(None, Some(MAX_QUEUE_CAP + 1)),
        );
        assert!(matches!(result, Err(StreamError::Validation(_))));
    }

    // --- Encode Sink Tests ---

    #[test]
    fn memory_sink_captures_frames() {
        let output = encode_captured(sample());
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "[{\"_1\":2,\"_3\":4},\"a\",1,\"b\",[\"P\",0]]\nP0:[2]\n"
        );
    }

    #[test]
    fn memory_sink_discards_without_buf() {
        let snapshot = encode_to_sink(
            sample(),
            OutputSink::Memory,
            EncodeOptions::new(),
            ApiConfig::default(),
        )
        .unwrap();
        assert!(snapshot.output.is_none());
        assert_eq!(snapshot.total_frames(), 2);
    }

    #[test]
    fn writer_sink_receives_frames() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let writer = SharedBufferWriter::new(buf.clone());
        encode_to_sink(
            Value::from("hi"),
            OutputSink::Writer(Box::new(writer)),
            EncodeOptions::new(),
            ApiConfig::default(),
        )
        .unwrap();
        assert_eq!(&buf.lock().unwrap()[..], b"[\"hi\"]\n");
    }

    #[test]
    fn file_sink_and_file_source() {
        let path = std::env::temp_dir().join(format!("graphwire-core-{}.ndjson", std::process::id()));
        encode_to_sink(
            sample(),
            OutputSink::File(path.clone()),
            EncodeOptions::new(),
            ApiConfig::default(),
        )
        .unwrap();

        let decoded = decode_from_source(InputSource::File(path.clone()), DecodeOptions::new()).unwrap();
        let snapshot = decoded.drain.wait().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(decoded.value.get("a"), Some(Value::from(1)));
        assert_eq!(snapshot.frames_resolve, 1);
    }

    #[test]
    fn sink_waits_for_late_settlement() {
        let (pending, resolver) = Deferred::pending();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            resolver.resolve(Value::from("late"));
        });

        let output = encode_captured(Value::array([Value::Deferred(pending)]));
        worker.join().unwrap();
        assert!(String::from_utf8(output).unwrap().ends_with("P0:[\"late\"]\n"));
    }

    #[test]
    fn unencodable_root_fails_the_sink() {
        struct Widget;
        let result = encode_to_sink(
            Value::opaque(Widget),
            OutputSink::Memory,
            EncodeOptions::new(),
            ApiConfig::with_buf_enabled(),
        );
        assert!(matches!(result, Err(StreamError::Flatten(_))));
    }

    // --- Decode Source Tests ---

    #[test]
    fn sink_output_decodes_from_memory() {
        let output = encode_captured(sample());
        let decoded = decode_from_source(InputSource::Memory(output), DecodeOptions::new()).unwrap();
        let b = decoded.value.get("b").unwrap();

        decoded.drain.wait().unwrap();
        let settled = pollster::block_on(b.as_deferred().unwrap().settled());
        assert_eq!(settled, Ok(Value::from(2)));
    }

    #[test]
    fn reader_source_is_accepted() {
        let reader = std::io::Cursor::new(b"[[1,2],true,false]\n".to_vec());
        let decoded = decode_from_source(InputSource::Reader(Box::new(reader)), DecodeOptions::new()).unwrap();
        assert_eq!(decoded.value, Value::array([Value::from(true), Value::from(false)]));
        assert!(decoded.drain.wait().is_ok());
    }

    #[test]
    fn truncated_source_rejects_placeholders() {
        let decoded = decode_from_source(
            InputSource::Memory(b"[[\"P\",0]]\n".to_vec()),
            DecodeOptions::new(),
        )
        .unwrap();
        let root = decoded.value.clone();

        let err = decoded.drain.wait().unwrap_err();
        assert!(matches!(
            err,
            StreamError::Protocol(ProtocolError::StreamClosed { pending: 1 })
        ));
        let settled = pollster::block_on(root.as_deferred().unwrap().settled());
        assert!(settled.is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("graphwire-core-does-not-exist.ndjson");
        let result = decode_from_source(InputSource::File(path), DecodeOptions::new());
        assert!(matches!(result, Err(StreamError::Io(_))));
    }
}
