//! Line framing for the graphwire wire format.
//!
//! Responsibilities:
//! - Define settlement frame markers and borrowed frame views
//! - Encode frames into newline-terminated lines
//! - Decode settlement lines with strict validation
//!
//! Non-responsibilities:
//! - Fragment contents (see `stream::fragment`)
//! - IO
//! - Deferred bookkeeping

pub mod types;
pub mod encode;
pub mod decode;

pub use types::{Frame, FrameError, FrameType, FrameView};
pub use encode::{encode_frame, encode_settlement, frame_line};
pub use decode::{decode_frame, is_blank};
