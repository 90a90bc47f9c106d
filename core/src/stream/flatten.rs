//! stream/flatten.rs
//! Turns value graphs into fragments, one table per encoded stream.
//!
//! Identity rules:
//! - composites, errors, deferreds and opaque values are keyed by allocation,
//!   so shared and cyclic structure is written once and referenced by index;
//! - booleans, numbers, strings, bigints and symbols are keyed by value, so a
//!   repeated `"a"` is one fragment;
//! - sentinels never enter the table.
//!
//! Every composite reserves its index before its children are visited. That is
//! what makes a self-reference resolve to the composite's own index.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::constants::{tags, MAX_SAFE_INTEGER, OBJECT_KEY_PREFIX};
use crate::plugins::{EncodePlugin, EncodePlugins};
use crate::stream::fragment::{FragmentTable, RefId, Sentinel};
use crate::stream::registry::EncodeRegistry;
use crate::value::{ErrorValue, Opaque, Value};

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("no plugin can encode a value of type {type_name}")]
    Unsupported { type_name: &'static str },

    #[error("plugin tag {0:?} collides with a built-in fragment type")]
    ReservedTag(String),

    #[error("could not render fragment: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    Node(usize),
    Bool(bool),
    Number(u64),
    BigInt(i128),
    String(String),
    Symbol(String),
}

fn identity_key(value: &Value) -> Option<IdentityKey> {
    if let Some(addr) = value.node_addr() {
        return Some(IdentityKey::Node(addr));
    }
    match value {
        Value::Bool(b) => Some(IdentityKey::Bool(*b)),
        Value::Number(n) => Some(IdentityKey::Number(n.to_bits())),
        Value::BigInt(i) => Some(IdentityKey::BigInt(*i)),
        Value::String(s) => Some(IdentityKey::String(s.clone())),
        Value::Symbol(k) => Some(IdentityKey::Symbol(k.clone())),
        _ => None,
    }
}

/// Table position and registry position to restore after a failed flatten.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    table_len: usize,
    next_deferred_id: u64,
}

/// Everything the encoder accumulates across the frames of one stream.
pub struct EncodeState {
    table: FragmentTable,
    indices: HashMap<IdentityKey, usize>,
    // Keeps every keyed allocation alive so its address cannot be reused by a
    // different value while the stream is open.
    anchors: Vec<Value>,
    registry: EncodeRegistry,
    plugins: EncodePlugins,
}

impl EncodeState {
    pub fn new(plugins: EncodePlugins) -> Self {
        Self {
            table: FragmentTable::new(),
            indices: HashMap::new(),
            anchors: Vec::new(),
            registry: EncodeRegistry::new(),
            plugins,
        }
    }

    pub fn table(&self) -> &FragmentTable {
        &self.table
    }

    pub fn registry(&self) -> &EncodeRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut EncodeRegistry {
        &mut self.registry
    }

    /// Index already assigned to this value's identity, if any.
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        identity_key(value).and_then(|key| self.indices.get(&key).copied())
    }

    /// Flatten `value`, appending any new fragments to the table.
    ///
    /// On error the table may hold partial output; callers that keep the
    /// stream going must [`rollback`](Self::rollback) to a checkpoint.
    pub fn flatten(&mut self, value: &Value) -> Result<RefId, FlattenError> {
        if let Some(sentinel) = Sentinel::for_value(value) {
            return Ok(RefId::Sentinel(sentinel));
        }

        let key = identity_key(value);
        if let Some(index) = key.as_ref().and_then(|k| self.indices.get(k)) {
            return Ok(RefId::BackRef(*index));
        }

        let index = self.table.reserve();
        if let Some(key) = key {
            if matches!(key, IdentityKey::Node(_)) {
                self.anchors.push(value.clone());
            }
            self.indices.insert(key, index);
        }

        let fragment = self.stringify(value)?;
        self.table.fill(index, fragment);
        Ok(RefId::Index(index))
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            table_len: self.table.len(),
            next_deferred_id: self.registry.next_id(),
        }
    }

    /// Undo everything flattened since `checkpoint`.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.table.truncate(checkpoint.table_len);
        self.indices.retain(|_, index| *index < checkpoint.table_len);
        self.registry.rollback(checkpoint.next_deferred_id);
    }

    /// Append a `["Z",target]` fragment; returns its text.
    pub(crate) fn push_alias(&mut self, target: usize) -> String {
        let fragment = format!("[\"{}\",{}]", tags::PREVIOUS_RESOLVED, target);
        self.table.push(fragment.clone());
        fragment
    }

    fn child(&mut self, value: &Value) -> Result<i64, FlattenError> {
        Ok(self.flatten(value)?.to_ref())
    }

    fn stringify(&mut self, value: &Value) -> Result<String, FlattenError> {
        let fragment = match value {
            Value::Undefined => Sentinel::Undefined.code().to_string(),
            Value::Null => Sentinel::Null.code().to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n)?,
            Value::String(s) => serde_json::to_string(s)?,
            Value::BigInt(i) => tagged(tags::BIGINT, &[serde_json::to_string(&i.to_string())?]),
            Value::Date(d) => tagged(tags::DATE, &[d.timestamp_millis().to_string()]),
            Value::RegExp(r) => tagged(
                tags::REGEXP,
                &[serde_json::to_string(&r.source)?, serde_json::to_string(&r.flags)?],
            ),
            Value::Symbol(k) => tagged(tags::SYMBOL, &[serde_json::to_string(k)?]),
            Value::Url(u) => tagged(tags::URL, &[serde_json::to_string(u)?]),
            Value::Error(e) => error_fragment(e)?,
            Value::Array(node) => {
                let items = node.snapshot();
                let mut refs = Vec::with_capacity(items.len());
                for item in &items {
                    refs.push(self.child(item)?.to_string());
                }
                format!("[{}]", refs.join(","))
            }
            Value::Object(node) => {
                let fields: Vec<(String, Value)> = node
                    .read()
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.clone()))
                    .collect();
                let mut parts = Vec::with_capacity(fields.len());
                for (key, field) in fields {
                    let key_ref = self.child(&Value::String(key))?;
                    let value_ref = self.child(&field)?;
                    parts.push(format!("\"{}{}\":{}", OBJECT_KEY_PREFIX, key_ref, value_ref));
                }
                format!("{{{}}}", parts.join(","))
            }
            Value::Map(node) => {
                let entries = node.snapshot();
                let mut refs = Vec::with_capacity(entries.len() * 2);
                for (k, v) in &entries {
                    refs.push(self.child(k)?.to_string());
                    refs.push(self.child(v)?.to_string());
                }
                tagged(tags::MAP, &refs)
            }
            Value::Set(node) => {
                let items = node.snapshot();
                let mut refs = Vec::with_capacity(items.len());
                for item in &items {
                    refs.push(self.child(item)?.to_string());
                }
                tagged(tags::SET, &refs)
            }
            Value::Deferred(deferred) => {
                let id = self.registry.register(deferred.clone());
                tracing::trace!(deferred_id = id, "registered deferred value");
                tagged(tags::DEFERRED, &[id.to_string()])
            }
            Value::Opaque(opaque) => self.plugin_fragment(value, opaque)?,
        };
        Ok(fragment)
    }

    fn plugin_fragment(&mut self, value: &Value, opaque: &Opaque) -> Result<String, FlattenError> {
        let plugins: Vec<Arc<dyn EncodePlugin>> = self.plugins.clone();
        for plugin in &plugins {
            let Some(encoded) = plugin.encode(value) else {
                continue;
            };
            if tags::RESERVED.contains(&encoded.tag.as_str()) {
                return Err(FlattenError::ReservedTag(encoded.tag));
            }
            let mut parts = Vec::with_capacity(encoded.values.len() + 1);
            parts.push(serde_json::to_string(&encoded.tag)?);
            for nested in &encoded.values {
                parts.push(self.child(nested)?.to_string());
            }
            return Ok(format!("[{}]", parts.join(",")));
        }
        Err(FlattenError::Unsupported {
            type_name: opaque.type_name(),
        })
    }
}

fn tagged(tag: &str, parts: &[String]) -> String {
    let mut out = String::with_capacity(8 + parts.iter().map(|p| p.len() + 1).sum::<usize>());
    out.push_str("[\"");
    out.push_str(tag);
    out.push('"');
    for part in parts {
        out.push(',');
        out.push_str(part);
    }
    out.push(']');
    out
}

fn error_fragment(error: &ErrorValue) -> Result<String, FlattenError> {
    let message = serde_json::to_string(&error.message)?;
    if error.has_default_name() {
        Ok(tagged(tags::ERROR, &[message]))
    } else {
        Ok(tagged(tags::ERROR, &[message, serde_json::to_string(&error.name)?]))
    }
}

/// Integral values inside the safe range print without a fraction.
fn format_number(n: f64) -> Result<String, FlattenError> {
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        Ok((n as i64).to_string())
    } else {
        Ok(serde_json::to_string(&n)?)
    }
}
