//! Graph items and the edges between them

use crate::scope::Scope;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Delimiter between the parts of a composite query key
pub const QUERY_KEY_DELIMITER: &str = "|";

/// Join key parts into one composite query key
pub fn join_key_parts<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(QUERY_KEY_DELIMITER)
}

/// Split a composite query key back into its parts
pub fn split_key(key: &str) -> Vec<&str> {
    key.split(QUERY_KEY_DELIMITER).collect()
}

/// Whether change or failure propagates along an edge.
///
/// `propagates_in`: a change to the target affects this item.
/// `propagates_out`: a change to this item affects the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlastPropagation {
    #[serde(rename = "in")]
    pub propagates_in: bool,
    #[serde(rename = "out")]
    pub propagates_out: bool,
}

impl BlastPropagation {
    /// This item depends on the target
    pub const IN: Self = Self::new(true, false);
    /// The target depends on this item
    pub const OUT: Self = Self::new(false, true);
    /// Both sides affect each other
    pub const BOTH: Self = Self::new(true, true);

    pub const fn new(propagates_in: bool, propagates_out: bool) -> Self {
        Self {
            propagates_in,
            propagates_out,
        }
    }
}

/// How a linked query looks up its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryMethod {
    Get,
}

/// Directed edge from an item to another resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedQuery {
    pub target_type: String,
    pub method: QueryMethod,
    pub query: String,
    pub scope: Scope,
    pub blast_propagation: BlastPropagation,
}

/// A node of the resource graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "type")]
    pub item_type: String,
    pub unique_attribute: String,
    pub attributes: Map<String, Value>,
    pub scope: Scope,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub linked_queries: Vec<LinkedQuery>,
}

impl Item {
    /// Value of the unique attribute
    pub fn unique_value(&self) -> Option<&str> {
        self.attributes
            .get(&self.unique_attribute)
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Globally unique identifier: `<type>.<scope>.<unique value>`
    pub fn global_unique_name(&self) -> String {
        format!(
            "{}.{}.{}",
            self.item_type,
            self.scope,
            self.unique_value().unwrap_or_default()
        )
    }

    /// Linked queries that target the given item type
    pub fn linked_queries_to<'a>(
        &'a self,
        target_type: &'a str,
    ) -> impl Iterator<Item = &'a LinkedQuery> + 'a {
        self.linked_queries
            .iter()
            .filter(move |q| q.target_type == target_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_item() -> Item {
        let mut attributes = Map::new();
        attributes.insert("name".into(), json!("disk-1"));
        Item {
            item_type: "compute-disk".into(),
            unique_attribute: "name".into(),
            attributes,
            scope: Scope::zonal("p", "us-central1-a"),
            tags: BTreeMap::new(),
            linked_queries: vec![LinkedQuery {
                target_type: "compute-image".into(),
                method: QueryMethod::Get,
                query: "debian-12".into(),
                scope: Scope::global("debian-cloud"),
                blast_propagation: BlastPropagation::IN,
            }],
        }
    }

    #[test]
    fn test_join_and_split() {
        let key = join_key_parts(&["global", "ring", "key"]);
        assert_eq!(key, "global|ring|key");
        assert_eq!(split_key(&key), vec!["global", "ring", "key"]);
        assert_eq!(join_key_parts(&["only"]), "only");
    }

    #[test]
    fn test_unique_value() {
        let item = sample_item();
        assert_eq!(item.unique_value(), Some("disk-1"));
        assert_eq!(item.global_unique_name(), "compute-disk.p.us-central1-a.disk-1");
    }

    #[test]
    fn test_linked_query_wire_shape() {
        let item = sample_item();
        let value = serde_json::to_value(&item.linked_queries[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "targetType": "compute-image",
                "method": "GET",
                "query": "debian-12",
                "scope": "debian-cloud",
                "blastPropagation": {"in": true, "out": false}
            })
        );
    }

    #[test]
    fn test_linked_queries_to() {
        let item = sample_item();
        assert_eq!(item.linked_queries_to("compute-image").count(), 1);
        assert_eq!(item.linked_queries_to("compute-network").count(), 0);
    }
}
