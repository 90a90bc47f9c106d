//! graphwire-core
//!
//! Streaming serialization of value graphs whose parts may not be ready yet.
//! Shared and cyclic structure survives the round trip; deferred values are
//! sent as placeholders and filled in by later frames as they settle.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;

pub mod value;
pub mod plugins;
pub mod telemetry;

// Stream layers
pub mod stream;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::plugins::{DecodePlugin, EncodePlugin, PluginEncoded};
    pub use crate::stream::{
        decode, decode_from_source, encode, encode_to_sink, ApiConfig, CancellationToken,
        DecodeOptions, Decoded, EncodeOptions, InputSource, OutputSink,
    };
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::{ProtocolError, StreamError, SyntaxError};
    pub use crate::value::{Deferred, ErrorValue, Resolver, Settlement, Value};
}
