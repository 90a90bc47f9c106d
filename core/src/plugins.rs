//! plugins.rs
//! Extension points for values the built-in encoding does not know.
//!
//! An encode plugin turns a value into a tag plus a list of nested values; the
//! nested values are flattened like any other child. A decode plugin receives
//! the tag and the already-hydrated nested values. Plugins are consulted in
//! order and the first one to answer wins.

use std::sync::Arc;

use crate::value::Value;

/// What an encode plugin produces for a value it claims.
#[derive(Debug, Clone)]
pub struct PluginEncoded {
    pub tag: String,
    pub values: Vec<Value>,
}

impl PluginEncoded {
    pub fn new(tag: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            tag: tag.into(),
            values,
        }
    }
}

pub trait EncodePlugin: Send + Sync {
    /// `None` declines the value.
    fn encode(&self, value: &Value) -> Option<PluginEncoded>;
}

pub trait DecodePlugin: Send + Sync {
    /// `None` declines the tag.
    fn decode(&self, tag: &str, values: &[Value]) -> Option<Value>;
}

impl<F> EncodePlugin for F
where
    F: Fn(&Value) -> Option<PluginEncoded> + Send + Sync,
{
    fn encode(&self, value: &Value) -> Option<PluginEncoded> {
        self(value)
    }
}

impl<F> DecodePlugin for F
where
    F: Fn(&str, &[Value]) -> Option<Value> + Send + Sync,
{
    fn decode(&self, tag: &str, values: &[Value]) -> Option<Value> {
        self(tag, values)
    }
}

pub type EncodePlugins = Vec<Arc<dyn EncodePlugin>>;
pub type DecodePlugins = Vec<Arc<dyn DecodePlugin>>;
