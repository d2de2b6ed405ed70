//! Item Converter
//!
//! Projects a raw API resource into an [`Item`] using its definition's
//! attribute schema, identity rule, tag field and reference table.

use super::path::{lookup, select_strings};
use super::references::{extract_parts, extract_references};
use super::registry::{ResourceDef, UniqueKey};
use crate::error::QueryError;
use crate::item::{join_key_parts, Item};
use crate::scope::Scope;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Project the declared, non-excluded fields of `raw` into an attribute map.
/// Fields absent from the resource (or null) are left out.
pub fn project_attributes(raw: &Value, def: &ResourceDef) -> Result<Map<String, Value>, QueryError> {
    if !raw.is_object() {
        return Err(QueryError::other(format!(
            "cannot project {}: expected an object, got {}",
            def.item_type,
            json_kind(raw)
        )));
    }

    let mut attributes = Map::new();
    for field in def.fields.iter().filter(|f| !f.exclude) {
        match lookup(raw, field.path) {
            Some(Value::Null) | None => {}
            Some(value) => {
                attributes.insert(field.name.to_string(), value.clone());
            }
        }
    }
    Ok(attributes)
}

/// Convert a raw resource found in `scope` into a graph item
pub fn to_item(def: &ResourceDef, raw: &Value, scope: &Scope) -> Result<Item, QueryError> {
    if scope.is_wildcard() {
        return Err(QueryError::other(format!(
            "{} item cannot be placed in the wildcard scope",
            def.item_type
        )));
    }

    let mut attributes = project_attributes(raw, def)?;

    match def.unique {
        UniqueKey::Name => {
            let has_name = attributes
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| !n.is_empty());
            if !has_name {
                return Err(QueryError::other(format!(
                    "{} resource has no name",
                    def.item_type
                )));
            }
        }
        UniqueKey::Composite {
            attribute,
            source,
            anchors,
        } => {
            let key = composite_key(raw, source, anchors).ok_or_else(|| {
                QueryError::other(format!(
                    "{} resource has a malformed '{}': expected segments {:?}",
                    def.item_type, source, anchors
                ))
            })?;
            attributes.insert(attribute.to_string(), Value::String(key));
        }
    }

    let tags = def
        .tags_field
        .map(|field| extract_tags(raw, field))
        .unwrap_or_default();

    Ok(Item {
        item_type: def.item_type.to_string(),
        unique_attribute: def.unique_attribute().to_string(),
        attributes,
        scope: scope.clone(),
        tags,
        linked_queries: extract_references(raw, def.references, scope),
    })
}

/// `|`-joined identity taken from the path stored in `source`
fn composite_key(raw: &Value, source: &str, anchors: &[&str]) -> Option<String> {
    let value = select_strings(raw, source).into_iter().next()?;
    let segments: Vec<&str> = value.split('/').collect();
    extract_parts(&segments, anchors).map(|parts| join_key_parts(&parts))
}

/// Label-like map copied into tags; non-string values are stringified
fn extract_tags(raw: &Value, field: &str) -> BTreeMap<String, String> {
    lookup(raw, field)
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
