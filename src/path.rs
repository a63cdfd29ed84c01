//! Deep lookups, field picking and payload merging over JSON state.

use serde_json::{Map, Value};

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Look up the slice of `state` named by `path`.
///
/// A top-level key spelled exactly like `path` wins; otherwise `path` is read
/// as dot-separated keys with optional `[n]` indices (`todos[0].title`).
/// An empty segment (`a..b`) names the key `""`. Anything that cannot be
/// reached yields an empty object.
pub fn select(state: &Value, path: &str) -> Value {
    if let Some(direct) = state.as_object().and_then(|o| o.get(path)) {
        return direct.clone();
    }

    let mut current = state;
    for segment in segments(path) {
        let next = match segment {
            Segment::Key(key) => match current {
                Value::Object(map) => map.get(key),
                Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            },
            Segment::Index(index) => match current {
                Value::Array(items) => items.get(index),
                Value::Object(map) => map.get(&index.to_string()),
                _ => None,
            },
        };
        match next {
            Some(value) => current = value,
            None => return Value::Object(Map::new()),
        }
    }
    current.clone()
}

fn segments(path: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            out.push(Segment::Key(""));
            continue;
        }
        let mut rest = part;
        while !rest.is_empty() {
            match rest.find('[') {
                Some(0) => {
                    let Some(close) = rest.find(']') else {
                        out.push(Segment::Key(rest));
                        break;
                    };
                    let inner = rest[1..close].trim_matches(|c: char| c == '"' || c == '\'');
                    match inner.parse::<usize>() {
                        Ok(index) => out.push(Segment::Index(index)),
                        Err(_) => out.push(Segment::Key(inner)),
                    }
                    rest = &rest[close + 1..];
                }
                Some(open) => {
                    out.push(Segment::Key(&rest[..open]));
                    rest = &rest[open..];
                }
                None => {
                    out.push(Segment::Key(rest));
                    break;
                }
            }
        }
    }
    out
}

/// Keep only the fields of `slice` listed in `values`.
///
/// With no list the whole slice is kept as is. Picking from something that
/// is not an object yields an empty object.
pub fn pick(slice: &Value, values: Option<&[String]>) -> Value {
    let Some(values) = values else {
        return slice.clone();
    };

    let picked = match slice.as_object() {
        Some(fields) => fields
            .iter()
            .filter(|(name, _)| values.iter().any(|v| v == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        None => Map::new(),
    };
    Value::Object(picked)
}

/// Shallow-merge `payload` over `loaded`; payload fields win.
pub fn merge_payload(loaded: Value, payload: Value) -> Value {
    let mut merged = match loaded {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Value::Object(overrides) = payload {
        merged.extend(overrides);
    }
    Value::Object(merged)
}
