//! value/types.rs
//! The in-memory value graph the encoder walks and the decoder rebuilds.
//!
//! Composites live behind `Node<T>` (an `Arc<RwLock<T>>`), so two positions in
//! a graph can hold the same node and a node can contain itself.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::constants::DEFAULT_ERROR_NAME;
use crate::value::deferred::Deferred;

/// Shared, mutable composite. Identity is the allocation address.
pub struct Node<T>(Arc<RwLock<T>>);

impl<T> Node<T> {
    pub fn new(inner: T) -> Self {
        Node(Arc::new(RwLock::new(inner)))
    }

    /// Read access. A poisoned lock still yields its data.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access. A poisoned lock still yields its data.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<T: Clone> Node<T> {
    /// Clone the contents out so no guard is held while walking children.
    pub fn snapshot(&self) -> T {
        self.read().clone()
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Node(Arc::clone(&self.0))
    }
}

impl<T: Default> Default for Node<T> {
    fn default() -> Self {
        Node::new(T::default())
    }
}

/// Insertion-ordered, string-keyed fields of a plain object.
#[derive(Clone, Default)]
pub struct Object {
    fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (k, v) in iter {
            object.insert(k, v);
        }
        object
    }
}

/// A structured error: what rejections carry across the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
}

impl ErrorValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self::named(DEFAULT_ERROR_NAME, message)
    }

    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn has_default_name(&self) -> bool {
        self.name == DEFAULT_ERROR_NAME
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegExp {
    pub source: String,
    pub flags: String,
}

/// A host value the built-in encoding does not understand; only plugins can
/// carry it across the wire.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

/// Dynamic value. Cheap to clone: composites are shared, not copied.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    /// Registry-global symbol, identified by its key.
    Symbol(String),
    Date(DateTime<Utc>),
    RegExp(RegExp),
    Url(String),
    Array(Node<Vec<Value>>),
    Object(Node<Object>),
    Map(Node<Vec<(Value, Value)>>),
    Set(Node<Vec<Value>>),
    Error(Arc<ErrorValue>),
    Deferred(Deferred),
    Opaque(Opaque),
}

impl Value {
    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(Node::new(items.into_iter().collect()))
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Object(Node::new(fields.into_iter().collect()))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        Value::Map(Node::new(entries.into_iter().collect()))
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Set(Node::new(items.into_iter().collect()))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn error(message: impl Into<String>) -> Value {
        Value::Error(Arc::new(ErrorValue::new(message)))
    }

    pub fn named_error(name: impl Into<String>, message: impl Into<String>) -> Value {
        Value::Error(Arc::new(ErrorValue::named(name, message)))
    }

    pub fn regexp(source: impl Into<String>, flags: impl Into<String>) -> Value {
        Value::RegExp(RegExp {
            source: source.into(),
            flags: flags.into(),
        })
    }

    pub fn opaque<T: Any + Send + Sync>(value: T) -> Value {
        Value::Opaque(Opaque::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Date(_) => "date",
            Value::RegExp(_) => "regexp",
            Value::Url(_) => "url",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Error(_) => "error",
            Value::Deferred(_) => "deferred",
            Value::Opaque(o) => o.type_name(),
        }
    }

    /// Address of the shared allocation behind this value, if it has one.
    pub fn node_addr(&self) -> Option<usize> {
        match self {
            Value::Array(n) | Value::Set(n) => Some(n.addr()),
            Value::Object(n) => Some(n.addr()),
            Value::Map(n) => Some(n.addr()),
            Value::Error(e) => Some(Arc::as_ptr(e) as *const () as usize),
            Value::Deferred(d) => Some(d.addr()),
            Value::Opaque(o) => Some(o.addr()),
            _ => None,
        }
    }

    /// Identity comparison: true only for the same shared allocation.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.node_addr(), other.node_addr()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Node<Vec<Value>>> {
        match self {
            Value::Array(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Node<Object>> {
        match self {
            Value::Object(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Node<Vec<(Value, Value)>>> {
        match self {
            Value::Map(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Node<Vec<Value>>> {
        match self {
            Value::Set(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Value::Deferred(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self {
            Value::Opaque(o) => Some(o),
            _ => None,
        }
    }

    /// Field of an object value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.as_object().and_then(|o| o.read().get(key).cloned())
    }

    /// Element of an array value.
    pub fn at(&self, index: usize) -> Option<Value> {
        self.as_array().and_then(|a| a.read().get(index).cloned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<ErrorValue> for Value {
    fn from(e: ErrorValue) -> Self {
        Value::Error(Arc::new(e))
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Value::Deferred(d)
    }
}

impl From<Opaque> for Value {
    fn from(o: Opaque) -> Self {
        Value::Opaque(o)
    }
}
