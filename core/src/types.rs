use std::io;

use thiserror::Error;

use crate::stream::flatten::FlattenError;
use crate::stream::fragment::FragmentError;
use crate::stream::framing::FrameError;
use crate::value::Value;

/// Malformed input: the bytes on the wire do not follow the line format.
#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("stream ended before the initial frame")]
    MissingInitialFrame,

    #[error("initial frame is empty")]
    EmptyInitialFrame,

    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Fragment(#[from] FragmentError),
}

/// Well-formed input that breaks the settlement protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("deferred id {0} was never announced or is already settled")]
    UnknownDeferred(u64),

    #[error("deferred id {0} announced twice")]
    DuplicateDeferred(u64),

    #[error("stream closed with {pending} deferred value(s) still pending")]
    StreamClosed { pending: usize },
}

/// Unified stream error covering I/O, wire syntax, protocol, flattening and
/// generic validation.
/// - `From<T>` impls enable `?` across encoder, decoder and the blocking bridges.
/// - `to_error_value` turns a decode failure into the rejection reason handed
///   to outstanding placeholders.
#[derive(Debug)]
pub enum StreamError {
    Io(io::Error),

    Syntax(SyntaxError),

    Protocol(ProtocolError),

    /// A value could not be turned into fragments.
    Flatten(FlattenError),

    /// Internal bookkeeping broke; indicates a bug, not bad input.
    Invariant(&'static str),

    /// Thread or channel wiring of the blocking bridges failed.
    PipelineError(&'static str),

    Validation(String),
}

impl StreamError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, StreamError::Syntax(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, StreamError::Protocol(_))
    }

    /// Error value used to reject placeholders when decoding fails.
    pub fn to_error_value(&self) -> Value {
        let name = match self {
            StreamError::Syntax(_) => "SyntaxError",
            StreamError::Protocol(_) => "ProtocolError",
            _ => crate::constants::DEFAULT_ERROR_NAME,
        };
        Value::named_error(name, self.to_string())
    }
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Io(e) => write!(f, "I/O error: {}", e),
            StreamError::Syntax(e) => write!(f, "syntax error: {}", e),
            StreamError::Protocol(e) => write!(f, "protocol error: {}", e),
            StreamError::Flatten(e) => write!(f, "flatten error: {}", e),
            StreamError::Invariant(msg) => write!(f, "invariant violated: {}", msg),
            StreamError::PipelineError(msg) => write!(f, "pipeline error: {}", msg),
            StreamError::Validation(msg) => write!(f, "validation error: {}", msg),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Io(e) => Some(e),
            StreamError::Syntax(e) => Some(e),
            StreamError::Protocol(e) => Some(e),
            StreamError::Flatten(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(e: io::Error) -> Self {
        StreamError::Io(e)
    }
}

impl From<SyntaxError> for StreamError {
    fn from(e: SyntaxError) -> Self {
        StreamError::Syntax(e)
    }
}

impl From<ProtocolError> for StreamError {
    fn from(e: ProtocolError) -> Self {
        StreamError::Protocol(e)
    }
}

impl From<FlattenError> for StreamError {
    fn from(e: FlattenError) -> Self {
        StreamError::Flatten(e)
    }
}

impl From<FrameError> for StreamError {
    fn from(e: FrameError) -> Self {
        StreamError::Syntax(SyntaxError::Frame(e))
    }
}

impl From<FragmentError> for StreamError {
    fn from(e: FragmentError) -> Self {
        StreamError::Syntax(SyntaxError::Fragment(e))
    }
}

/// JSON that fails to parse on the read side is malformed input.
impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::Syntax(SyntaxError::InvalidJson(e))
    }
}
