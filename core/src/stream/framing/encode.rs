use bytes::Bytes;

use crate::constants::{ID_SEPARATOR, LINE_DELIMITER};
use crate::stream::framing::types::{Frame, FrameType};

/// Render a settlement line (no terminator).
///
/// ```text
/// P12:[...]
/// ^ marker, ^ decimal id, ^ ':' then payload JSON
/// ```
pub fn encode_settlement(frame_type: FrameType, id: u64, payload: &str) -> String {
    let mut line = String::with_capacity(payload.len() + 24);
    line.push(frame_type.marker());
    line.push_str(&id.to_string());
    line.push(ID_SEPARATOR);
    line.push_str(payload);
    line
}

/// Terminate a line and hand it over as bytes.
pub fn frame_line(line: String) -> Bytes {
    let mut out = line.into_bytes();
    out.push(LINE_DELIMITER);
    Bytes::from(out)
}

pub fn encode_frame(frame: &Frame) -> Bytes {
    match frame {
        Frame::Initial(payload) => frame_line(payload.clone()),
        Frame::Settlement {
            frame_type,
            id,
            payload,
        } => frame_line(encode_settlement(*frame_type, *id, payload)),
    }
}
