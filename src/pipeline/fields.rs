// src/pipeline/fields.rs
//! Lookups into loosely-shaped provider JSON.
use serde_json::Value;

/// Follow a dotted path such as `company.name` or `emails.0`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Text at `path`: non-empty strings, numbers, or the first usable array element.
pub fn text_at(value: &Value, path: &str) -> Option<String> {
    lookup(value, path).and_then(as_text)
}

/// First non-empty text across `paths`, in order.
pub fn first_text<S: AsRef<str>>(value: &Value, paths: &[S]) -> Option<String> {
    paths.iter().find_map(|path| text_at(value, path.as_ref()))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(as_text),
        _ => None,
    }
}
