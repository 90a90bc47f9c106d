//! value/eq.rs
//! Structural equality and debug output for value graphs.
//!
//! Both walk graphs that may contain cycles. Equality assumes a pair of nodes
//! already under comparison is equal (coinductive); debug output prints
//! `[Circular]` for a node already on the current path.

use std::collections::HashSet;
use std::fmt;

use crate::value::types::{Node, Object, Value};

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        let mut seen = HashSet::new();
        eq_with(self, other, &mut seen)
    }
}

/// Numbers compare by value except that NaN equals NaN and the two zeros
/// differ, matching what the wire can distinguish.
fn number_eq(a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    a == b && a.is_sign_negative() == b.is_sign_negative()
}

fn eq_with(a: &Value, b: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => number_eq(*x, *y),
        (Value::BigInt(x), Value::BigInt(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::RegExp(x), Value::RegExp(y)) => x == y,
        (Value::Url(x), Value::Url(y)) => x == y,
        (Value::Error(x), Value::Error(y)) => x == y,
        (Value::Deferred(x), Value::Deferred(y)) => x.ptr_eq(y),
        (Value::Opaque(x), Value::Opaque(y)) => x.ptr_eq(y),
        (Value::Array(x), Value::Array(y)) | (Value::Set(x), Value::Set(y)) => {
            nodes_eq(x, y, seen, |xs, ys, seen| seq_eq(&xs, &ys, seen))
        }
        (Value::Object(x), Value::Object(y)) => nodes_eq(x, y, seen, object_eq),
        (Value::Map(x), Value::Map(y)) => nodes_eq(x, y, seen, |xs, ys, seen| {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|((xk, xv), (yk, yv))| eq_with(xk, yk, seen) && eq_with(xv, yv, seen))
        }),
        _ => false,
    }
}

fn nodes_eq<T, F>(x: &Node<T>, y: &Node<T>, seen: &mut HashSet<(usize, usize)>, compare: F) -> bool
where
    T: Clone,
    F: FnOnce(T, T, &mut HashSet<(usize, usize)>) -> bool,
{
    if x.ptr_eq(y) {
        return true;
    }
    if !seen.insert((x.addr(), y.addr())) {
        return true;
    }
    compare(x.snapshot(), y.snapshot(), seen)
}

fn seq_eq(xs: &[Value], ys: &[Value], seen: &mut HashSet<(usize, usize)>) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| eq_with(x, y, seen))
}

// Field order is not significant for equality.
fn object_eq(xs: Object, ys: Object, seen: &mut HashSet<(usize, usize)>) -> bool {
    xs.len() == ys.len()
        && xs
            .iter()
            .all(|(k, xv)| ys.get(k).is_some_and(|yv| eq_with(xv, yv, seen)))
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = Vec::new();
        debug_value(self, f, &mut path)
    }
}

fn debug_value(value: &Value, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>) -> fmt::Result {
    match value {
        Value::Undefined => f.write_str("undefined"),
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => write!(f, "{n:?}"),
        Value::BigInt(i) => write!(f, "{i}n"),
        Value::String(s) => write!(f, "{s:?}"),
        Value::Symbol(k) => write!(f, "Symbol({k:?})"),
        Value::Date(d) => write!(f, "Date({})", d.to_rfc3339()),
        Value::RegExp(r) => write!(f, "/{}/{}", r.source, r.flags),
        Value::Url(u) => write!(f, "Url({u})"),
        Value::Error(e) => write!(f, "{}({:?})", e.name, e.message),
        Value::Deferred(d) => write!(f, "{d:?}"),
        Value::Opaque(o) => write!(f, "{o:?}"),
        Value::Array(node) => debug_node(node, f, path, |items, f, path| {
            f.write_str("[")?;
            debug_seq(&items, f, path)?;
            f.write_str("]")
        }),
        Value::Set(node) => debug_node(node, f, path, |items, f, path| {
            f.write_str("Set {")?;
            debug_seq(&items, f, path)?;
            f.write_str("}")
        }),
        Value::Object(node) => debug_node(node, f, path, |object, f, path| {
            f.write_str("{")?;
            for (i, (k, v)) in object.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{k}: ")?;
                debug_value(v, f, path)?;
            }
            f.write_str("}")
        }),
        Value::Map(node) => debug_node(node, f, path, |entries, f, path| {
            f.write_str("Map {")?;
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                debug_value(k, f, path)?;
                f.write_str(" => ")?;
                debug_value(v, f, path)?;
            }
            f.write_str("}")
        }),
    }
}

fn debug_node<T, F>(node: &Node<T>, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>, body: F) -> fmt::Result
where
    T: Clone,
    F: FnOnce(T, &mut fmt::Formatter<'_>, &mut Vec<usize>) -> fmt::Result,
{
    let addr = node.addr();
    if path.contains(&addr) {
        return f.write_str("[Circular]");
    }
    path.push(addr);
    let result = body(node.snapshot(), f, path);
    path.pop();
    result
}

fn debug_seq(items: &[Value], f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        debug_value(item, f, path)?;
    }
    Ok(())
}
