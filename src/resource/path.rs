//! Field paths into raw JSON resources
//!
//! Paths are dot-separated (`diskEncryptionKey.kmsKeyName`). A segment
//! suffixed with `[]` iterates the array found there
//! (`networkInterfaces[].network`); a trailing `[]` yields the array
//! elements themselves (`users[]`).

use serde_json::Value;

/// Value at a plain dot path, `None` when any segment is missing
pub fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = item;
    for part in path.split('.') {
        current = match part.parse::<usize>() {
            Ok(idx) => current.get(idx)?,
            Err(_) => current.get(part)?,
        };
    }
    Some(current)
}

/// Every value reachable through a path that may iterate arrays
pub fn select<'a>(item: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![item];
    for part in path.split('.') {
        let (key, iterate) = match part.strip_suffix("[]") {
            Some(key) => (key, true),
            None => (part, false),
        };
        current = current
            .into_iter()
            .filter_map(|v| v.get(key))
            .flat_map(|v| {
                if iterate {
                    v.as_array()
                        .map(|arr| arr.iter().collect::<Vec<_>>())
                        .unwrap_or_default()
                } else {
                    vec![v]
                }
            })
            .collect();
        if current.is_empty() {
            break;
        }
    }
    current
}

/// Non-empty strings reachable through a path
pub fn select_strings<'a>(item: &'a Value, path: &str) -> Vec<&'a str> {
    select(item, path)
        .into_iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .collect()
}
