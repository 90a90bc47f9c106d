//! stream/fragment.rs
//! Fragments: the JSON snippets a value graph is flattened into.
//!
//! A payload is either a bare sentinel number or a JSON array of fragments.
//! Fragments refer to each other by index into the table that accumulates over
//! the life of one stream; negative numbers are sentinels, never indices.

use num_enum::TryFromPrimitive;
use thiserror::Error;

use crate::value::Value;

/// Values that have no fragment of their own and are written inline.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum Sentinel {
    Undefined = -1,
    Null = -2,
    NaN = -3,
    PositiveInfinity = -4,
    NegativeInfinity = -5,
    NegativeZero = -6,
}

impl Sentinel {
    pub fn for_value(value: &Value) -> Option<Sentinel> {
        match value {
            Value::Undefined => Some(Sentinel::Undefined),
            Value::Null => Some(Sentinel::Null),
            Value::Number(n) if n.is_nan() => Some(Sentinel::NaN),
            Value::Number(n) if *n == f64::INFINITY => Some(Sentinel::PositiveInfinity),
            Value::Number(n) if *n == f64::NEG_INFINITY => Some(Sentinel::NegativeInfinity),
            Value::Number(n) if *n == 0.0 && n.is_sign_negative() => Some(Sentinel::NegativeZero),
            _ => None,
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            Sentinel::Undefined => Value::Undefined,
            Sentinel::Null => Value::Null,
            Sentinel::NaN => Value::Number(f64::NAN),
            Sentinel::PositiveInfinity => Value::Number(f64::INFINITY),
            Sentinel::NegativeInfinity => Value::Number(f64::NEG_INFINITY),
            Sentinel::NegativeZero => Value::Number(-0.0),
        }
    }

    #[inline(always)]
    pub const fn code(self) -> i64 {
        self as i8 as i64
    }

    pub fn from_code(code: i64) -> Option<Sentinel> {
        i8::try_from(code)
            .ok()
            .and_then(|c| Sentinel::try_from_primitive(c).ok())
    }
}

/// Result of flattening one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefId {
    /// A fragment newly written at this index.
    Index(usize),
    /// Inline sentinel; no fragment written.
    Sentinel(Sentinel),
    /// Identity already in the table at this index; nothing written.
    BackRef(usize),
}

impl RefId {
    /// The number a parent fragment uses to point at this value.
    pub fn to_ref(self) -> i64 {
        match self {
            RefId::Index(i) | RefId::BackRef(i) => i as i64,
            RefId::Sentinel(s) => s.code(),
        }
    }
}

/// Append-only table of emitted fragments, indexed from 0.
#[derive(Debug, Clone, Default)]
pub struct FragmentTable {
    fragments: Vec<String>,
}

impl FragmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.fragments.len().checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fragments.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(String::as_str)
    }

    /// Claim the next index before the fragment text is known.
    pub(crate) fn reserve(&mut self) -> usize {
        self.fragments.push(String::new());
        self.fragments.len() - 1
    }

    pub(crate) fn fill(&mut self, index: usize, fragment: String) {
        if let Some(slot) = self.fragments.get_mut(index) {
            *slot = fragment;
        }
    }

    pub(crate) fn push(&mut self, fragment: String) -> usize {
        self.fragments.push(fragment);
        self.fragments.len() - 1
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.fragments.truncate(len);
    }

    /// `[f_start,...,f_last]` as payload text.
    pub fn payload_from(&self, start: usize) -> String {
        let tail = self.fragments.get(start..).unwrap_or_default();
        let mut out = String::with_capacity(tail.iter().map(|f| f.len() + 1).sum::<usize>() + 2);
        out.push('[');
        out.push_str(&tail.join(","));
        out.push(']');
        out
    }
}

/// A fragment that cannot be turned back into a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FragmentError {
    #[error("payload must be a sentinel or a non-empty fragment array")]
    InvalidPayload,

    #[error("reference {0} points past the fragment table")]
    OutOfRange(i64),

    #[error("unknown sentinel {0}")]
    UnknownSentinel(i64),

    #[error("malformed {kind} fragment at index {index}")]
    Malformed { kind: &'static str, index: usize },

    #[error("fragment at index {0} refers to itself through aliases")]
    CircularAlias(usize),

    #[error("no decoder for fragment type {0:?}")]
    UnknownType(String),
}
