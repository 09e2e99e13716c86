//! # JSON Path Utilities
//!
//! Generic get/set/merge operations over a nested [`serde_json::Value`]
//! using dotted/bracketed path expressions such as `messages[0].content`.
//! These power the declarative request templates in the provider registry:
//! a descriptor says *where* the prompt, model, and parameters live inside
//! its request body, and the transport uses these helpers to put them there.

use serde_json::{Map, Value};

/// One step of a parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

/// Parses a path expression into its segments.
///
/// The empty path parses to no segments, which every operation treats as
/// "operate on the root". Bracket groups that do not contain a numeric index
/// are treated as quoted field names, so `headers[Content-Type]` still
/// resolves.
fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            continue;
        }
        match part.find('[') {
            None => segments.push(Segment::Field(part.to_string())),
            Some(open) => {
                let (name, mut rest) = part.split_at(open);
                if !name.is_empty() {
                    segments.push(Segment::Field(name.to_string()));
                }
                while let Some(close) = rest.find(']') {
                    let inner = &rest[1..close];
                    match inner.parse::<usize>() {
                        Ok(index) => segments.push(Segment::Index(index)),
                        Err(_) => segments.push(Segment::Field(inner.to_string())),
                    }
                    rest = &rest[close + 1..];
                    if !rest.starts_with('[') {
                        break;
                    }
                }
            }
        }
    }
    segments
}

/// Returns the value at `path`, or `None` if any segment is absent.
///
/// Never panics on missing intermediates; a lookup through a scalar simply
/// yields `None`.
pub fn get_value_at_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in parse_path(path) {
        current = match segment {
            Segment::Field(name) => current.get(name.as_str())?,
            Segment::Index(index) => current.get(index)?,
        };
    }
    Some(current)
}

/// Navigates to `segments`, creating intermediate objects and arrays as
/// needed. Arrays are padded with `null` up to the requested index. An
/// intermediate scalar in the way is replaced by the container the path
/// expects.
fn ensure_path_mut<'a>(target: &'a mut Value, segments: &[Segment]) -> &'a mut Value {
    match segments.split_first() {
        None => target,
        Some((Segment::Field(name), rest)) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            // The object check above makes this infallible.
            let map = target.as_object_mut().unwrap();
            let slot = map.entry(name.clone()).or_insert(Value::Null);
            ensure_path_mut(slot, rest)
        }
        Some((Segment::Index(index), rest)) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            let array = target.as_array_mut().unwrap();
            while array.len() <= *index {
                array.push(Value::Null);
            }
            ensure_path_mut(&mut array[*index], rest)
        }
    }
}

/// Places `new_value` at `path`, creating intermediate structure as needed.
///
/// An empty path replaces the root.
pub fn set_value_at_path(target: &mut Value, path: &str, new_value: Value) {
    let segments = parse_path(path);
    *ensure_path_mut(target, &segments) = new_value;
}

/// Shallow-merges `partial`'s keys into the object found at `path`.
///
/// An empty path merges at the root; this is how providers whose parameters
/// sit at the top level of the request body receive them. A non-object value
/// at the path (or a non-object `partial`) falls back to replacement.
pub fn merge_at_path(target: &mut Value, path: &str, partial: &Value) {
    let segments = parse_path(path);
    let node = ensure_path_mut(target, &segments);
    match (node.as_object_mut(), partial.as_object()) {
        (Some(existing), Some(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key.clone(), value.clone());
            }
        }
        _ => *node = partial.clone(),
    }
}
