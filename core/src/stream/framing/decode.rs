use crate::constants::ID_SEPARATOR;
use crate::stream::framing::types::{FrameError, FrameType, FrameView};

/// Lines holding only whitespace carry nothing and are skipped by the reader.
#[inline]
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Decode a single settlement line (terminator already stripped).
///
/// Only the envelope is checked here; the payload is returned untouched.
pub fn decode_frame(line: &str) -> Result<FrameView<'_>, FrameError> {
    let marker = line.chars().next().ok_or(FrameError::EmptyLine)?;
    let frame_type = FrameType::try_from_marker(marker)?;

    let rest = &line[marker.len_utf8()..];
    let (id, payload) = rest
        .split_once(ID_SEPARATOR)
        .ok_or(FrameError::MissingSeparator)?;

    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FrameError::InvalidId(id.to_owned()));
    }
    let id = id
        .parse::<u64>()
        .map_err(|_| FrameError::InvalidId(id.to_owned()))?;

    if payload.trim().is_empty() {
        return Err(FrameError::EmptyPayload);
    }

    Ok(FrameView {
        frame_type,
        id,
        payload,
    })
}
