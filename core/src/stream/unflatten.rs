//! stream/unflatten.rs
//! Rebuilds values from fragments, one table per decoded stream.
//!
//! Fragments accumulate across frames exactly as the encoder appended them,
//! so a later frame may point at any earlier index. Composites are stored as
//! empty shells before their children are hydrated, which lets cycles and
//! shared references come back as the same node.

use std::sync::Arc;

use chrono::DateTime;
use serde_json::Value as Json;

use crate::constants::{tags, OBJECT_KEY_PREFIX};
use crate::plugins::{DecodePlugin, DecodePlugins};
use crate::stream::fragment::{FragmentError, Sentinel};
use crate::stream::registry::DecodeRegistry;
use crate::types::StreamError;
use crate::value::{ErrorValue, Node, Object, Value};

#[derive(Clone)]
enum Slot {
    Vacant,
    /// Being hydrated; reaching it again means an alias loop.
    Visiting,
    Ready(Value),
}

pub struct DecodeState {
    fragments: Vec<Json>,
    slots: Vec<Slot>,
    registry: DecodeRegistry,
    plugins: DecodePlugins,
}

impl DecodeState {
    pub fn new(plugins: DecodePlugins) -> Self {
        Self {
            fragments: Vec::new(),
            slots: Vec::new(),
            registry: DecodeRegistry::new(),
            plugins,
        }
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn registry(&self) -> &DecodeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DecodeRegistry {
        &mut self.registry
    }

    /// Hydrate one payload: a bare sentinel, or a fragment array whose first
    /// element is the value being delivered. Table indices never travel bare.
    pub fn unflatten(&mut self, payload: Json) -> Result<Value, StreamError> {
        match payload {
            Json::Number(n) => match n.as_i64() {
                Some(code) if code < 0 => self.hydrate(code),
                _ => Err(FragmentError::InvalidPayload.into()),
            },
            Json::Array(fragments) if !fragments.is_empty() => {
                let start = self.fragments.len();
                self.slots
                    .extend(std::iter::repeat(Slot::Vacant).take(fragments.len()));
                self.fragments.extend(fragments);
                self.hydrate(start as i64)
            }
            _ => Err(FragmentError::InvalidPayload.into()),
        }
    }

    fn hydrate(&mut self, reference: i64) -> Result<Value, StreamError> {
        if reference < 0 {
            return Sentinel::from_code(reference)
                .map(Sentinel::to_value)
                .ok_or_else(|| FragmentError::UnknownSentinel(reference).into());
        }
        let index = reference as usize;
        match self.slots.get(index) {
            None => return Err(FragmentError::OutOfRange(reference).into()),
            Some(Slot::Ready(value)) => return Ok(value.clone()),
            Some(Slot::Visiting) => return Err(FragmentError::CircularAlias(index).into()),
            Some(Slot::Vacant) => {}
        }

        let fragment = self.fragments[index].clone();
        self.slots[index] = Slot::Visiting;
        let value = match fragment {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().ok_or(FragmentError::Malformed {
                kind: "number",
                index,
            })?),
            Json::String(s) => Value::String(s),
            Json::Object(fields) => self.hydrate_object(index, fields)?,
            Json::Array(items) => self.hydrate_array(index, items)?,
        };
        self.slots[index] = Slot::Ready(value.clone());
        Ok(value)
    }

    fn store(&mut self, index: usize, value: Value) -> Value {
        self.slots[index] = Slot::Ready(value.clone());
        value
    }

    fn hydrate_object(
        &mut self,
        index: usize,
        fields: serde_json::Map<String, Json>,
    ) -> Result<Value, StreamError> {
        let node = Node::new(Object::new());
        self.store(index, Value::Object(node.clone()));
        for (key, field) in fields {
            let key_ref = key
                .strip_prefix(OBJECT_KEY_PREFIX)
                .and_then(|k| k.parse::<i64>().ok())
                .ok_or(FragmentError::Malformed { kind: "object", index })?;
            let key = match self.hydrate(key_ref)? {
                Value::String(s) => s,
                _ => return Err(FragmentError::Malformed { kind: "object", index }.into()),
            };
            let value = self.hydrate(reference(&field, "object", index)?)?;
            node.write().insert(key, value);
        }
        Ok(Value::Object(node))
    }

    fn hydrate_array(&mut self, index: usize, items: Vec<Json>) -> Result<Value, StreamError> {
        let tag = match items.first() {
            None | Some(Json::Number(_)) => {
                let node = Node::new(Vec::with_capacity(items.len()));
                self.store(index, Value::Array(node.clone()));
                for item in &items {
                    let value = self.hydrate(reference(item, "array", index)?)?;
                    node.write().push(value);
                }
                return Ok(Value::Array(node));
            }
            Some(Json::String(tag)) => tag.clone(),
            Some(_) => return Err(FragmentError::Malformed { kind: "array", index }.into()),
        };
        let args = &items[1..];

        let value = match tag.as_str() {
            tags::BIGINT => {
                let digits = string_arg(args, 0, "bigint", index)?;
                let parsed = digits
                    .parse::<i128>()
                    .map_err(|_| FragmentError::Malformed { kind: "bigint", index })?;
                Value::BigInt(parsed)
            }
            tags::DATE => {
                let millis = args
                    .first()
                    .and_then(Json::as_f64)
                    .ok_or(FragmentError::Malformed { kind: "date", index })?;
                let date = DateTime::from_timestamp_millis(millis as i64)
                    .ok_or(FragmentError::Malformed { kind: "date", index })?;
                Value::Date(date)
            }
            tags::REGEXP => Value::regexp(
                string_arg(args, 0, "regexp", index)?,
                string_arg(args, 1, "regexp", index)?,
            ),
            tags::SYMBOL => Value::Symbol(string_arg(args, 0, "symbol", index)?.to_owned()),
            tags::URL => Value::Url(string_arg(args, 0, "url", index)?.to_owned()),
            tags::ERROR => {
                let message = string_arg(args, 0, "error", index)?;
                let error = match args.get(1) {
                    Some(Json::String(name)) => ErrorValue::named(name.as_str(), message),
                    None => ErrorValue::new(message),
                    Some(_) => return Err(FragmentError::Malformed { kind: "error", index }.into()),
                };
                Value::Error(Arc::new(error))
            }
            tags::MAP => {
                if args.len() % 2 != 0 {
                    return Err(FragmentError::Malformed { kind: "map", index }.into());
                }
                let node = Node::new(Vec::with_capacity(args.len() / 2));
                self.store(index, Value::Map(node.clone()));
                for pair in args.chunks(2) {
                    let key = self.hydrate(reference(&pair[0], "map", index)?)?;
                    let value = self.hydrate(reference(&pair[1], "map", index)?)?;
                    node.write().push((key, value));
                }
                Value::Map(node)
            }
            tags::SET => {
                let node = Node::new(Vec::with_capacity(args.len()));
                self.store(index, Value::Set(node.clone()));
                for item in args {
                    let value = self.hydrate(reference(item, "set", index)?)?;
                    node.write().push(value);
                }
                Value::Set(node)
            }
            tags::DEFERRED => {
                let id = args
                    .first()
                    .and_then(Json::as_u64)
                    .ok_or(FragmentError::Malformed { kind: "deferred", index })?;
                Value::Deferred(self.registry.register(id)?)
            }
            tags::PREVIOUS_RESOLVED => {
                let target = reference(
                    args.first().unwrap_or(&Json::Null),
                    "back-reference",
                    index,
                )?;
                self.hydrate(target)?
            }
            _ => self.hydrate_plugin(index, &tag, args)?,
        };
        Ok(value)
    }

    fn hydrate_plugin(&mut self, index: usize, tag: &str, args: &[Json]) -> Result<Value, StreamError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.hydrate(reference(arg, "plugin", index)?)?);
        }
        let plugins: Vec<Arc<dyn DecodePlugin>> = self.plugins.clone();
        plugins
            .iter()
            .find_map(|plugin| plugin.decode(tag, &values))
            .ok_or_else(|| FragmentError::UnknownType(tag.to_owned()).into())
    }
}

fn reference(json: &Json, kind: &'static str, index: usize) -> Result<i64, FragmentError> {
    json.as_i64().ok_or(FragmentError::Malformed { kind, index })
}

fn string_arg<'a>(
    args: &'a [Json],
    position: usize,
    kind: &'static str,
    index: usize,
) -> Result<&'a str, FragmentError> {
    args.get(position)
        .and_then(Json::as_str)
        .ok_or(FragmentError::Malformed { kind, index })
}
