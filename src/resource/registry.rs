//! Resource Registry - static resource definitions
//!
//! Every resource kind the crate can discover is described by a
//! [`ResourceDef`]: where its API lives, how its identity is built, which
//! fields become attributes, and which fields reference other resources.
//! Definitions are immutable `'static` data, checked by
//! [`ResourceDef::validate`] before an adapter is built on top of them.

use super::definitions::{compute, kms, storage};
use crate::error::{DefinitionError, QueryError};
use crate::item::BlastPropagation;
use crate::scope::{region_of_zone, LocationKind, Scope};
use std::collections::HashSet;

/// GCP API a resource is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Compute,
    CloudKms,
    Storage,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::Compute => "compute",
            Service::CloudKms => "cloudkms",
            Service::Storage => "storage",
        }
    }
}

/// Path templates for one location level of a resource.
///
/// Templates are relative to the service base URL and may contain
/// `{project}`, `{region}`, `{zone}` and positional key parts `{0}`, `{1}`...
#[derive(Debug)]
pub struct Endpoint {
    pub location: LocationKind,
    pub get: &'static str,
    pub list: Option<&'static str>,
    pub search: Option<&'static str>,
    /// Extra query parameters of list and search requests (values are
    /// templates too)
    pub query: &'static [(&'static str, &'static str)],
}

impl Endpoint {
    pub const fn global(get: &'static str, list: &'static str) -> Self {
        Self {
            location: LocationKind::Global,
            get,
            list: Some(list),
            search: None,
            query: &[],
        }
    }

    pub const fn regional(get: &'static str, list: &'static str) -> Self {
        Self {
            location: LocationKind::Regional,
            get,
            list: Some(list),
            search: None,
            query: &[],
        }
    }

    pub const fn zonal(get: &'static str, list: &'static str) -> Self {
        Self {
            location: LocationKind::Zonal,
            get,
            list: Some(list),
            search: None,
            query: &[],
        }
    }

    /// Query parameters rendered for a scope
    pub fn render_query(&self, scope: &Scope) -> Result<Vec<(String, String)>, QueryError> {
        self.query
            .iter()
            .map(|(k, v)| Ok((k.to_string(), render_template(v, scope, &[])?)))
            .collect()
    }
}

/// How an item's unique attribute is determined
#[derive(Debug)]
pub enum UniqueKey {
    /// The `name` attribute
    Name,
    /// A `|`-joined key extracted from `source` by following `anchors`,
    /// written into `attribute`
    Composite {
        attribute: &'static str,
        source: &'static str,
        anchors: &'static [&'static str],
    },
}

/// One attribute of the projection schema
#[derive(Debug)]
pub struct FieldSpec {
    /// Attribute name on the item
    pub name: &'static str,
    /// Dot-separated path into the raw resource
    pub path: &'static str,
    /// Declared but kept out of the attributes
    pub exclude: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            path: name,
            exclude: false,
        }
    }

    pub const fn at(name: &'static str, path: &'static str) -> Self {
        Self {
            name,
            path,
            exclude: false,
        }
    }

    pub const fn excluded(name: &'static str) -> Self {
        Self {
            name,
            path: name,
            exclude: true,
        }
    }
}

/// Where the target of a reference lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    /// Read `projects/`, `zones/` and `regions/` segments from the URL
    FromUrl,
    /// The project of the referencing item
    SourceProject,
}

/// A field that may point at another resource
#[derive(Debug)]
pub struct ReferenceField {
    /// Path to the field; `[]` after a segment iterates an array
    pub path: &'static str,
    /// Segments whose followers make up the query key, in order
    pub anchors: &'static [&'static str],
    pub target_type: &'static str,
    pub scope: ScopeRule,
    pub blast: BlastPropagation,
}

impl ReferenceField {
    pub const fn new(
        path: &'static str,
        anchors: &'static [&'static str],
        target_type: &'static str,
        blast: BlastPropagation,
    ) -> Self {
        Self {
            path,
            anchors,
            target_type,
            scope: ScopeRule::FromUrl,
            blast,
        }
    }

    pub const fn in_source_project(
        path: &'static str,
        anchors: &'static [&'static str],
        target_type: &'static str,
        blast: BlastPropagation,
    ) -> Self {
        Self {
            path,
            anchors,
            target_type,
            scope: ScopeRule::SourceProject,
            blast,
        }
    }
}

/// Resource definition
#[derive(Debug)]
pub struct ResourceDef {
    pub item_type: &'static str,
    pub display_name: &'static str,
    pub service: Service,
    pub endpoints: &'static [Endpoint],
    /// Field of a list response holding the resources
    pub items_field: &'static str,
    /// Collection name for the compute aggregated list API
    pub aggregated: Option<&'static str>,
    /// Number of query parts a `get` takes
    pub key_parts: usize,
    /// Number of query parts a `search` takes, 0 when search is unsupported
    pub search_parts: usize,
    pub unique: UniqueKey,
    pub fields: &'static [FieldSpec],
    pub tags_field: Option<&'static str>,
    pub references: &'static [ReferenceField],
}

impl ResourceDef {
    /// Name of the attribute identifying an item
    pub fn unique_attribute(&self) -> &'static str {
        match self.unique {
            UniqueKey::Name => "name",
            UniqueKey::Composite { attribute, .. } => attribute,
        }
    }

    pub fn endpoint_for(&self, location: LocationKind) -> Option<&'static Endpoint> {
        self.endpoints.iter().find(|e| e.location == location)
    }

    pub fn serves(&self, scope: &Scope) -> bool {
        scope
            .location_kind()
            .is_some_and(|kind| self.endpoint_for(kind).is_some())
    }

    pub fn supports_wildcard(&self) -> bool {
        self.aggregated.is_some()
    }

    pub fn supports_search(&self) -> bool {
        self.search_parts > 0 && self.endpoints.iter().any(|e| e.search.is_some())
    }

    /// Check the definition is internally consistent
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let item_type = self.item_type.to_string();

        if self.fields.is_empty() {
            return Err(DefinitionError::EmptySchema { item_type });
        }

        let mut seen = HashSet::new();
        for field in self.fields {
            if !seen.insert(field.name) {
                return Err(DefinitionError::DuplicateAttribute {
                    item_type,
                    name: field.name.to_string(),
                });
            }
        }

        match self.unique {
            UniqueKey::Name => {
                let projected = self.fields.iter().any(|f| f.name == "name" && !f.exclude);
                if !projected {
                    return Err(DefinitionError::UniqueAttributeNotProjected {
                        item_type,
                        name: "name".to_string(),
                    });
                }
            }
            UniqueKey::Composite {
                attribute, anchors, ..
            } => {
                if anchors.len() != self.key_parts {
                    return Err(DefinitionError::InvalidEndpoint {
                        item_type,
                        template: attribute.to_string(),
                        reason: format!(
                            "composite identity has {} parts but get takes {}",
                            anchors.len(),
                            self.key_parts
                        ),
                    });
                }
                if seen.contains(attribute) {
                    return Err(DefinitionError::DuplicateAttribute {
                        item_type,
                        name: attribute.to_string(),
                    });
                }
            }
        }

        for reference in self.references {
            let reason = if reference.path.is_empty() {
                Some("empty path")
            } else if reference.anchors.is_empty() {
                Some("no anchors")
            } else if reference.anchors.iter().any(|a| a.is_empty() || a.contains('/')) {
                Some("anchors must be single path segments")
            } else if reference.target_type.is_empty() {
                Some("no target type")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(DefinitionError::InvalidReference {
                    item_type,
                    path: reference.path.to_string(),
                    reason: reason.to_string(),
                });
            }
        }

        for endpoint in self.endpoints {
            check_template(self, endpoint, endpoint.get, self.key_parts)?;
            if let Some(list) = endpoint.list {
                check_template(self, endpoint, list, 0)?;
            }
            if let Some(search) = endpoint.search {
                check_template(self, endpoint, search, self.search_parts)?;
            }
            for (_, value) in endpoint.query {
                check_template(self, endpoint, value, 0)?;
            }
        }

        Ok(())
    }
}

fn check_template(
    def: &ResourceDef,
    endpoint: &Endpoint,
    template: &'static str,
    parts: usize,
) -> Result<(), DefinitionError> {
    let invalid = |reason: String| DefinitionError::InvalidEndpoint {
        item_type: def.item_type.to_string(),
        template: template.to_string(),
        reason,
    };

    let names = placeholders(template).ok_or_else(|| invalid("unbalanced braces".into()))?;
    for name in names {
        match name {
            "project" => {}
            "region" if endpoint.location != LocationKind::Global => {}
            "zone" if endpoint.location == LocationKind::Zonal => {}
            _ => match name.parse::<usize>() {
                Ok(idx) if idx < parts => {}
                Ok(idx) => {
                    return Err(invalid(format!(
                        "part {{{}}} exceeds the {} available parts",
                        idx, parts
                    )))
                }
                Err(_) => return Err(invalid(format!("unknown placeholder {{{}}}", name))),
            },
        }
    }
    Ok(())
}

/// Names between braces in a template, `None` if braces don't balance
fn placeholders(template: &str) -> Option<Vec<&str>> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        let name = &after[..end];
        if name.contains('{') {
            return None;
        }
        names.push(name);
        rest = &after[end + 1..];
    }
    if rest.contains('}') {
        return None;
    }
    Some(names)
}

/// Render a path template for a scope and key parts.
/// Key parts are percent-encoded.
pub fn render_template(template: &str, scope: &Scope, parts: &[&str]) -> Result<String, QueryError> {
    let names =
        placeholders(template).ok_or_else(|| QueryError::other(format!("bad template '{}'", template)))?;

    let mut rendered = template.to_string();
    for name in names {
        let value = match name {
            "project" => scope.project_id().map(str::to_string),
            "region" => match scope {
                Scope::Regional { region, .. } => Some(region.clone()),
                Scope::Zonal { zone, .. } => Some(region_of_zone(zone).to_string()),
                _ => None,
            },
            "zone" => match scope {
                Scope::Zonal { zone, .. } => Some(zone.clone()),
                _ => None,
            },
            _ => name
                .parse::<usize>()
                .ok()
                .and_then(|idx| parts.get(idx))
                .map(|p| urlencoding::encode(p).into_owned()),
        };
        let value = value.ok_or_else(|| {
            QueryError::other(format!("cannot fill {{{}}} in '{}' for scope {}", name, template, scope))
        })?;
        rendered = rendered.replacen(&format!("{{{}}}", name), &value, 1);
    }
    Ok(rendered)
}

/// Every resource definition
static RESOURCES: &[&ResourceDef] = &[
    &compute::INSTANCE,
    &compute::DISK,
    &compute::IMAGE,
    &compute::SNAPSHOT,
    &compute::NETWORK,
    &compute::SUBNETWORK,
    &compute::ADDRESS,
    &compute::FORWARDING_RULE,
    &compute::BACKEND_SERVICE,
    &compute::HEALTH_CHECK,
    &kms::KEY_RING,
    &kms::CRYPTO_KEY,
    &storage::BUCKET,
];

/// All resource definitions
pub fn all_resources() -> &'static [&'static ResourceDef] {
    RESOURCES
}

/// Get a resource definition by item type
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    RESOURCES.iter().copied().find(|def| def.item_type == key)
}

/// Get all item types (for autocomplete)
pub fn get_all_resource_keys() -> Vec<&'static str> {
    RESOURCES.iter().map(|def| def.item_type).collect()
}
