//! stream — encode value graphs into newline-delimited frames and back.
//!
//! Layering, bottom up:
//! - `framing`, `fragment`: wire vocabulary
//! - `flatten`, `unflatten`, `registry`: graph to fragments and back
//! - `encoder`, `decoder`, `cancel`: stream orchestration
//! - `io`, `pipeline`, `core`: transports and the public API

pub mod framing;
pub mod fragment;
pub mod registry;
pub mod flatten;
pub mod unflatten;
pub mod cancel;
pub mod options;
pub mod encoder;
pub mod decoder;
pub mod io;
pub mod pipeline;
pub mod core;

pub use io::{InputSource, OutputSink};
pub use cancel::CancellationToken;
pub use options::{DecodeOptions, EncodeOptions};
pub use encoder::{encode, FrameEncoder, FrameStream};
pub use decoder::{decode, Decoded, DrainFuture};
pub use self::core::{decode_from_source, encode_to_sink, ApiConfig, BlockingDecoded};
