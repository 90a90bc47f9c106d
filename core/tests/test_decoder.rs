// Decoder orchestration: initial frame, draining, protocol and syntax
// failures, and fan-out rejection of pending placeholders.

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use futures::io::Cursor;
    use graphwire_core::stream::{decode, DecodeOptions, Decoded};
    use graphwire_core::types::{ProtocolError, StreamError, SyntaxError};
    use graphwire_core::value::{Settlement, Value};

    fn start(input: &str) -> Result<Decoded, StreamError> {
        start_bytes(input.as_bytes())
    }

    fn start_bytes(input: &[u8]) -> Result<Decoded, StreamError> {
        block_on(decode(Cursor::new(input.to_vec()), DecodeOptions::new()))
    }

    fn settle(value: &Value) -> Settlement {
        block_on(value.as_deferred().unwrap().settled())
    }

    fn rejection_name(settlement: Settlement) -> String {
        settlement.unwrap_err().as_error().unwrap().name.clone()
    }

// # ✅ 1. Happy path

    #[test]
    fn placeholder_settles_after_drain() {
        let decoded = start("[{\"_1\":2,\"_3\":4},\"a\",1,\"b\",[\"P\",0]]\nP0:[2]\n").unwrap();
        assert_eq!(decoded.value.get("a"), Some(Value::from(1)));

        let b = decoded.value.get("b").unwrap();
        let snapshot = block_on(decoded.done).unwrap();
        assert_eq!(snapshot.frames_initial, 1);
        assert_eq!(snapshot.frames_resolve, 1);
        assert_eq!(settle(&b), Ok(Value::from(2)));
    }

    #[test]
    fn rejection_frame_rejects_placeholder() {
        let decoded = start("[[\"P\",0]]\nE0:[[\"E\",\"nope\",\"TypeError\"]]\n").unwrap();
        let root = decoded.value.clone();
        block_on(decoded.done).unwrap();

        let reason = settle(&root).unwrap_err();
        assert_eq!(reason, Value::named_error("TypeError", "nope"));
    }

    #[test]
    fn sentinel_root_completes_immediately() {
        let decoded = start("-2\n").unwrap();
        assert_eq!(decoded.value, Value::Null);
        let snapshot = block_on(decoded.done).unwrap();
        assert_eq!(snapshot.settlements(), 0);
    }

    #[test]
    fn missing_trailing_newline_is_fine() {
        let decoded = start("[[\"P\",0]]\nP0:-1").unwrap();
        let root = decoded.value.clone();
        block_on(decoded.done).unwrap();
        assert_eq!(settle(&root), Ok(Value::Undefined));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let decoded = start("[[\"P\",0]]\n\n   \nP0:[1]\n\n").unwrap();
        let root = decoded.value.clone();
        let snapshot = block_on(decoded.done).unwrap();
        assert_eq!(snapshot.frames_skipped, 3);
        assert_eq!(settle(&root), Ok(Value::from(1)));
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let decoded = start("[[\"P\",0]]\r\nP0:[1]\r\n").unwrap();
        let root = decoded.value.clone();
        block_on(decoded.done).unwrap();
        assert_eq!(settle(&root), Ok(Value::from(1)));
    }

    #[test]
    fn settlement_may_reference_earlier_fragments() {
        let decoded = start("[[1,2],{},[\"P\",0]]\nP0:[[\"Z\",1]]\n").unwrap();
        let shared = decoded.value.at(0).unwrap();
        let pending = decoded.value.at(1).unwrap();
        block_on(decoded.done).unwrap();
        assert!(settle(&pending).unwrap().ptr_eq(&shared));
    }

    #[test]
    fn nested_placeholders_chain() {
        let decoded = start("[[\"P\",0]]\nP0:[[\"P\",1]]\nP1:[\"deep\"]\n").unwrap();
        let root = decoded.value.clone();
        block_on(decoded.done).unwrap();

        let inner = settle(&root).unwrap();
        assert_eq!(settle(&inner), Ok(Value::from("deep")));
    }

// # ❌ 2. Initial frame failures

    #[test]
    fn empty_input_is_missing_initial_frame() {
        let err = start("").err().unwrap();
        assert!(matches!(err, StreamError::Syntax(SyntaxError::MissingInitialFrame)));
    }

    #[test]
    fn blank_initial_line_is_syntax_error() {
        let err = start("\nP0:[1]\n").err().unwrap();
        assert!(matches!(err, StreamError::Syntax(SyntaxError::EmptyInitialFrame)));
    }

    #[test]
    fn invalid_initial_json_is_syntax_error() {
        let err = start("{nope\n").err().unwrap();
        assert!(matches!(err, StreamError::Syntax(SyntaxError::InvalidJson(_))));
    }

    #[test]
    fn non_utf8_initial_line_is_syntax_error() {
        let err = start_bytes(&[0xff, 0xfe, b'\n']).err().unwrap();
        assert!(matches!(err, StreamError::Syntax(SyntaxError::InvalidUtf8(_))));
    }

// # ❌ 3. Drain failures reject every pending placeholder

    #[test]
    fn unknown_id_is_protocol_error() {
        let decoded = start("[[1,2],[\"P\",0],[\"P\",1]]\nP7:[1]\n").unwrap();
        let first = decoded.value.at(0).unwrap();
        let second = decoded.value.at(1).unwrap();

        let err = block_on(decoded.done).unwrap_err();
        assert!(matches!(err, StreamError::Protocol(ProtocolError::UnknownDeferred(7))));
        assert_eq!(rejection_name(settle(&first)), "ProtocolError");
        assert_eq!(rejection_name(settle(&second)), "ProtocolError");
    }

    #[test]
    fn second_settlement_for_same_id_is_protocol_error() {
        let decoded = start("[[\"P\",0]]\nP0:[1]\nP0:[2]\n").unwrap();
        let root = decoded.value.clone();
        let err = block_on(decoded.done).unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(settle(&root), Ok(Value::from(1)));
    }

    #[test]
    fn premature_end_is_protocol_error() {
        let decoded = start("[[1,2],[\"P\",0],[\"P\",1]]\nP1:[true]\n").unwrap();
        let first = decoded.value.at(0).unwrap();
        let second = decoded.value.at(1).unwrap();

        let err = block_on(decoded.done).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Protocol(ProtocolError::StreamClosed { pending: 1 })
        ));
        assert_eq!(settle(&second), Ok(Value::from(true)));
        assert_eq!(rejection_name(settle(&first)), "ProtocolError");
    }

    #[test]
    fn bad_marker_is_syntax_error() {
        let decoded = start("[[\"P\",0]]\nQ0:[1]\n").unwrap();
        let root = decoded.value.clone();
        let err = block_on(decoded.done).unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(rejection_name(settle(&root)), "SyntaxError");
    }

    #[test]
    fn bad_payload_json_is_syntax_error() {
        let decoded = start("[[\"P\",0]]\nP0:[1\n").unwrap();
        let root = decoded.value.clone();
        let err = block_on(decoded.done).unwrap_err();
        assert!(matches!(err, StreamError::Syntax(SyntaxError::InvalidJson(_))));
        assert!(settle(&root).is_err());
    }

    #[test]
    fn bare_index_settlement_is_syntax_error() {
        let decoded = start("[[1],\"x\",[\"P\",0]]\nP0:1\n").unwrap();
        let root = decoded.value.clone();
        let err = block_on(decoded.done).unwrap_err();
        assert!(err.is_syntax(), "{err}");
        assert_eq!(root.at(0), Some(Value::from("x")));
    }

    #[test]
    fn non_utf8_settlement_line_is_syntax_error() {
        let decoded = start_bytes(b"[[1,2],[\"P\",0],[\"P\",1]]\nP0:[\"\xff\"]\n").unwrap();
        let first = decoded.value.at(0).unwrap();
        let second = decoded.value.at(1).unwrap();

        let err = block_on(decoded.done).unwrap_err();
        assert!(matches!(err, StreamError::Syntax(SyntaxError::InvalidUtf8(_))));
        assert_eq!(rejection_name(settle(&first)), "SyntaxError");
        assert_eq!(rejection_name(settle(&second)), "SyntaxError");
    }

    #[test]
    fn dropping_drain_rejects_placeholders() {
        let decoded = start("[[\"P\",0]]\nP0:[1]\n").unwrap();
        let root = decoded.value.clone();
        drop(decoded);
        assert!(settle(&root).is_err());
    }
}
