// Line framing: settlement envelope encode/decode and its error behavior.

#[cfg(test)]
mod tests {
    use graphwire_core::stream::framing::{
        decode_frame, encode_frame, encode_settlement, frame_line, is_blank, Frame, FrameError,
        FrameType,
    };

// # ✅ 1. Encode → decode (canonical path)

    #[test]
    fn settlement_roundtrip() {
        let line = encode_settlement(FrameType::Resolve, 12, "[1,\"x\"]");
        assert_eq!(line, "P12:[1,\"x\"]");

        let view = decode_frame(&line).unwrap();
        assert_eq!(view.frame_type, FrameType::Resolve);
        assert_eq!(view.id, 12);
        assert_eq!(view.payload, "[1,\"x\"]");
    }

    #[test]
    fn reject_marker_is_e() {
        let line = encode_settlement(FrameType::Reject, 0, "[[\"E\",\"boom\"]]");
        assert!(line.starts_with("E0:"));
        assert_eq!(decode_frame(&line).unwrap().frame_type, FrameType::Reject);
    }

    #[test]
    fn payload_may_contain_separator() {
        let view = decode_frame("P3:[\"a:b\"]").unwrap();
        assert_eq!(view.id, 3);
        assert_eq!(view.payload, "[\"a:b\"]");
    }

    #[test]
    fn sentinel_payload_is_accepted() {
        let view = decode_frame("P0:-2").unwrap();
        assert_eq!(view.payload, "-2");
    }

// # ✅ 2. Terminators

    #[test]
    fn frame_line_appends_newline() {
        let bytes = frame_line("P0:[1]".to_owned());
        assert_eq!(&bytes[..], b"P0:[1]\n");
    }

    #[test]
    fn encode_frame_handles_both_kinds() {
        let initial = encode_frame(&Frame::Initial("[1]".into()));
        assert_eq!(&initial[..], b"[1]\n");

        let settlement = encode_frame(&Frame::Settlement {
            frame_type: FrameType::Reject,
            id: 4,
            payload: "[2]".into(),
        });
        assert_eq!(&settlement[..], b"E4:[2]\n");
    }

    #[test]
    fn blank_lines_are_detected() {
        assert!(is_blank(""));
        assert!(is_blank("   \t"));
        assert!(!is_blank("P0:1"));
    }

// # ❌ 3. Malformed envelopes are rejected

    #[test]
    fn unknown_marker_is_rejected() {
        assert_eq!(decode_frame("X0:[1]"), Err(FrameError::UnknownMarker('X')));
        assert_eq!(decode_frame("é0:[1]"), Err(FrameError::UnknownMarker('é')));
    }

    #[test]
    fn empty_line_is_rejected() {
        assert_eq!(decode_frame(""), Err(FrameError::EmptyLine));
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert_eq!(decode_frame("P0[1]"), Err(FrameError::MissingSeparator));
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        assert!(matches!(decode_frame("P:[1]"), Err(FrameError::InvalidId(_))));
        assert!(matches!(decode_frame("P-1:[1]"), Err(FrameError::InvalidId(_))));
        assert!(matches!(decode_frame("Pab:[1]"), Err(FrameError::InvalidId(_))));
    }

    #[test]
    fn id_overflow_is_rejected() {
        let line = format!("P{}0:[1]", u64::MAX);
        assert!(matches!(decode_frame(&line), Err(FrameError::InvalidId(_))));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert_eq!(decode_frame("P0:"), Err(FrameError::EmptyPayload));
    }
}
