//! Wire constants for the graphwire line protocol.
//!
//! Everything the encoder writes and the decoder accepts is pinned here:
//! sentinel numbers, fragment type tags and settlement markers.

/// Line terminator between frames.
pub const LINE_DELIMITER: u8 = b'\n';

/// Separator between `<marker><id>` and the payload of a settlement frame.
pub const ID_SEPARATOR: char = ':';

/// Prefix of object field keys: `{"_<keyRef>": valueRef}`.
pub const OBJECT_KEY_PREFIX: char = '_';

/// Fragment type tags (first element of a tagged array fragment).
pub mod tags {
    pub const BIGINT: &str = "B";
    pub const DATE: &str = "D";
    pub const ERROR: &str = "E";
    pub const MAP: &str = "M";
    pub const DEFERRED: &str = "P";
    pub const REGEXP: &str = "R";
    pub const SET: &str = "S";
    pub const URL: &str = "U";
    pub const SYMBOL: &str = "Y";
    pub const PREVIOUS_RESOLVED: &str = "Z";

    /// Built-in tags. Plugin tags must not collide with any of these.
    pub const RESERVED: &[&str] = &[
        BIGINT, DATE, ERROR, MAP, DEFERRED, REGEXP, SET, URL, SYMBOL, PREVIOUS_RESOLVED,
    ];
}

/// Name given to errors when the value carries no explicit name.
pub const DEFAULT_ERROR_NAME: &str = "Error";

/// Substituted when a deferred value rejects with something that is not an error.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Default cancellation reason.
pub const CANCELLED_MESSAGE: &str = "Encoding was cancelled";

/// Cancellation reason used when the blocking sink stops accepting frames.
pub const WRITER_FAILED_MESSAGE: &str = "Frame writer failed";

/// Rejection reason when a `Resolver` is dropped without settling.
pub const DROPPED_RESOLVER_MESSAGE: &str = "Deferred value was dropped before it settled";

/// Largest magnitude written as a bare integer (2^53).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Defaults for the blocking sink/source bridges.
pub const DEFAULT_QUEUE_CAP: usize = 16;
pub const MAX_QUEUE_CAP: usize = 4096;
