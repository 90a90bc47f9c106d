use std::fmt;

use num_enum::TryFromPrimitive;

/// Settlement markers: the first byte of every line after the initial one.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum FrameType {
    Resolve = b'P',
    Reject = b'E',
}

impl FrameType {
    #[inline(always)]
    pub const fn marker(self) -> char {
        self as u8 as char
    }

    #[inline]
    pub fn try_from_marker(c: char) -> Result<Self, FrameError> {
        u8::try_from(c)
            .ok()
            .and_then(|b| Self::try_from_primitive(b).ok())
            .ok_or(FrameError::UnknownMarker(c))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameType::Resolve => "resolve",
            FrameType::Reject => "reject",
        }
    }
}

/// One line of the stream, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// First line: the root payload.
    Initial(String),
    /// `<marker><id>:<payload>`
    Settlement {
        frame_type: FrameType,
        id: u64,
        payload: String,
    },
}

/// Borrowed view of a settlement line; `payload` is still raw JSON text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub frame_type: FrameType,
    pub id: u64,
    pub payload: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    EmptyLine,
    UnknownMarker(char),
    MissingSeparator,
    InvalidId(String),
    EmptyPayload,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FrameError::*;
        match self {
            EmptyLine => write!(f, "empty frame line"),
            UnknownMarker(c) => write!(f, "unknown frame marker: {:?}", c),
            MissingSeparator => write!(f, "missing ':' after deferred id"),
            InvalidId(id) => write!(f, "invalid deferred id: {:?}", id),
            EmptyPayload => write!(f, "frame has no payload"),
        }
    }
}

impl std::error::Error for FrameError {}
