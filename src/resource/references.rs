//! Reference Extractor
//!
//! Turns reference fields of a raw resource into [`LinkedQuery`] edges.
//! A reference value is a slash-delimited path or URL such as
//! `https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a/disks/foo`.
//! Each anchor of the field's table row picks the segment that follows it;
//! the picked segments, `|`-joined, form the query key.
//!
//! Values that don't carry every anchor, or leave an anchor without a
//! value, produce no edge. That is not an error.

use super::path::select_strings;
use super::registry::{ReferenceField, ScopeRule};
use crate::item::{join_key_parts, LinkedQuery, QueryMethod};
use crate::scope::Scope;
use serde_json::Value;

/// Edges for every populated reference field of `raw`, in table order and
/// then in array order for repeated fields
pub fn extract_references(raw: &Value, table: &[ReferenceField], source: &Scope) -> Vec<LinkedQuery> {
    table
        .iter()
        .flat_map(|field| {
            select_strings(raw, field.path)
                .into_iter()
                .filter_map(move |value| extract_reference(value, field, source))
        })
        .collect()
}

/// Edge for a single reference value
pub fn extract_reference(value: &str, field: &ReferenceField, source: &Scope) -> Option<LinkedQuery> {
    let segments: Vec<&str> = value.split('/').collect();

    let Some(parts) = extract_parts(&segments, field.anchors) else {
        tracing::trace!(
            "Dropping reference {} = {:?}: anchors {:?} not found",
            field.path,
            value,
            field.anchors
        );
        return None;
    };

    let source_project = source.project_id()?;
    let scope = match field.scope {
        ScopeRule::FromUrl => infer_scope(&segments, source_project),
        ScopeRule::SourceProject => Scope::global(source_project),
    };

    Some(LinkedQuery {
        target_type: field.target_type.to_string(),
        method: QueryMethod::Get,
        query: join_key_parts(&parts),
        scope,
        blast_propagation: field.blast,
    })
}

/// Segment following each anchor, in anchor order.
/// Each anchor is searched for after the previous anchor's value.
pub fn extract_parts<'a>(segments: &[&'a str], anchors: &[&str]) -> Option<Vec<&'a str>> {
    let mut parts = Vec::with_capacity(anchors.len());
    let mut from = 0;
    for anchor in anchors {
        let idx = from + segments.get(from..)?.iter().position(|s| s == anchor)?;
        let value = segments.get(idx + 1).filter(|v| !v.is_empty())?;
        parts.push(*value);
        from = idx + 2;
    }
    Some(parts)
}

/// Scope a reference points into: `zones/<z>` wins over `regions/<r>`,
/// anything else is global. The project comes from `projects/<p>` when the
/// value carries one.
pub fn infer_scope(segments: &[&str], fallback_project: &str) -> Scope {
    let following = |anchor: &str| {
        segments
            .iter()
            .position(|s| *s == anchor)
            .and_then(|idx| segments.get(idx + 1))
            .copied()
            .filter(|v| !v.is_empty())
    };

    let project = following("projects").unwrap_or(fallback_project);

    if let Some(zone) = following("zones") {
        Scope::zonal(project, zone)
    } else if let Some(region) = following("regions") {
        Scope::regional(project, region)
    } else {
        Scope::global(project)
    }
}
