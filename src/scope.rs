//! Scope Model
//!
//! A scope says where a resource lives: a whole project (global), a region
//! or a zone of a project, or the wildcard `*` standing for every scope an
//! adapter is configured with.
//!
//! Text form:
//!
//! | Scope    | Text                     |
//! |----------|--------------------------|
//! | Global   | `my-project`             |
//! | Regional | `my-project.us-central1` |
//! | Zonal    | `my-project.us-central1-a` |
//! | Wildcard | `*`                      |

use crate::error::QueryError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Text form of the wildcard scope
pub const WILDCARD: &str = "*";

/// Zones known ahead of time. Names outside this list are still accepted
/// when they follow the `<region>-<letter>` shape.
pub const KNOWN_ZONES: &[&str] = &[
    // US
    "us-central1-a",
    "us-central1-b",
    "us-central1-c",
    "us-central1-f",
    "us-east1-b",
    "us-east1-c",
    "us-east1-d",
    "us-east4-a",
    "us-east4-b",
    "us-east4-c",
    "us-west1-a",
    "us-west1-b",
    "us-west1-c",
    "us-west2-a",
    "us-west2-b",
    "us-west2-c",
    "us-west3-a",
    "us-west3-b",
    "us-west3-c",
    "us-west4-a",
    "us-west4-b",
    "us-west4-c",
    // Europe
    "europe-west1-b",
    "europe-west1-c",
    "europe-west1-d",
    "europe-west2-a",
    "europe-west2-b",
    "europe-west2-c",
    "europe-west3-a",
    "europe-west3-b",
    "europe-west3-c",
    "europe-west4-a",
    "europe-west4-b",
    "europe-west4-c",
    "europe-north1-a",
    "europe-north1-b",
    "europe-north1-c",
    // Asia
    "asia-east1-a",
    "asia-east1-b",
    "asia-east1-c",
    "asia-east2-a",
    "asia-east2-b",
    "asia-east2-c",
    "asia-northeast1-a",
    "asia-northeast1-b",
    "asia-northeast1-c",
    "asia-southeast1-a",
    "asia-southeast1-b",
    "asia-southeast1-c",
    // Australia
    "australia-southeast1-a",
    "australia-southeast1-b",
    "australia-southeast1-c",
    // South America
    "southamerica-east1-a",
    "southamerica-east1-b",
    "southamerica-east1-c",
];

/// Which level of the location hierarchy a scope sits at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    Global,
    Regional,
    Zonal,
}

/// A parsed scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Wildcard,
    Global { project: String },
    Regional { project: String, region: String },
    Zonal { project: String, zone: String },
}

impl Scope {
    pub fn global(project: impl Into<String>) -> Self {
        Scope::Global {
            project: project.into(),
        }
    }

    pub fn regional(project: impl Into<String>, region: impl Into<String>) -> Self {
        Scope::Regional {
            project: project.into(),
            region: region.into(),
        }
    }

    pub fn zonal(project: impl Into<String>, zone: impl Into<String>) -> Self {
        Scope::Zonal {
            project: project.into(),
            zone: zone.into(),
        }
    }

    /// Parse the text form of a scope
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        let text = text.trim();
        if text == WILDCARD {
            return Ok(Scope::Wildcard);
        }

        let invalid = || QueryError::no_scope(format!("invalid scope '{}'", text));

        let mut tokens = text.split('.');
        let project = tokens.next().filter(|p| is_project_id(p)).ok_or_else(invalid)?;

        let scope = match tokens.next() {
            None => Scope::global(project),
            Some(location) if is_zone(location) => Scope::zonal(project, location),
            Some(location) if is_region(location) => Scope::regional(project, location),
            Some(_) => return Err(invalid()),
        };

        if tokens.next().is_some() {
            return Err(invalid());
        }

        Ok(scope)
    }

    /// Build a scope from the key of an aggregated list response entry
    /// (`zones/<zone>`, `regions/<region>` or `global`)
    pub fn from_aggregated_key(project: &str, key: &str) -> Option<Self> {
        if key == "global" {
            return Some(Scope::global(project));
        }
        match key.split_once('/') {
            Some(("zones", zone)) if !zone.is_empty() => Some(Scope::zonal(project, zone)),
            Some(("regions", region)) if !region.is_empty() => {
                Some(Scope::regional(project, region))
            }
            _ => None,
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            Scope::Wildcard => None,
            Scope::Global { project }
            | Scope::Regional { project, .. }
            | Scope::Zonal { project, .. } => Some(project),
        }
    }

    /// Region or zone name, `None` for global and wildcard scopes
    pub fn location(&self) -> Option<&str> {
        match self {
            Scope::Regional { region, .. } => Some(region),
            Scope::Zonal { zone, .. } => Some(zone),
            Scope::Global { .. } | Scope::Wildcard => None,
        }
    }

    pub fn location_kind(&self) -> Option<LocationKind> {
        match self {
            Scope::Wildcard => None,
            Scope::Global { .. } => Some(LocationKind::Global),
            Scope::Regional { .. } => Some(LocationKind::Regional),
            Scope::Zonal { .. } => Some(LocationKind::Zonal),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Scope::Wildcard)
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global { .. })
    }

    pub fn is_regional(&self) -> bool {
        matches!(self, Scope::Regional { .. })
    }

    pub fn is_zonal(&self) -> bool {
        matches!(self, Scope::Zonal { .. })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Wildcard => f.write_str(WILDCARD),
            Scope::Global { project } => f.write_str(project),
            Scope::Regional { project, region } => write!(f, "{}.{}", project, region),
            Scope::Zonal { project, zone } => write!(f, "{}.{}", project, zone),
        }
    }
}

impl FromStr for Scope {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::parse(s)
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Scope::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Get the region a zone belongs to (`us-central1-a` -> `us-central1`)
pub fn region_of_zone(zone: &str) -> &str {
    match zone.rsplit_once('-') {
        Some((region, _)) => region,
        None => zone,
    }
}

/// Regions implied by [`KNOWN_ZONES`]
pub fn known_regions() -> Vec<&'static str> {
    let mut regions: Vec<&str> = KNOWN_ZONES.iter().map(|z| region_of_zone(z)).collect();
    regions.dedup();
    regions
}

/// Project ids: lowercase letters, digits and hyphens
fn is_project_id(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !token.starts_with('-')
        && !token.ends_with('-')
}

/// Region names look like `us-central1`: hyphenated, ending in a digit
fn has_region_shape(token: &str) -> bool {
    token.contains('-')
        && token.starts_with(|c: char| c.is_ascii_lowercase())
        && token.ends_with(|c: char| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_region(token: &str) -> bool {
    known_regions().contains(&token) || has_region_shape(token)
}

/// Zones are a region followed by a single-letter suffix
fn is_zone(token: &str) -> bool {
    if KNOWN_ZONES.contains(&token) {
        return true;
    }
    match token.rsplit_once('-') {
        Some((region, suffix)) => {
            suffix.len() == 1
                && suffix.chars().all(|c| c.is_ascii_lowercase())
                && has_region_shape(region)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_global() {
        assert_eq!(Scope::parse("my-project").unwrap(), Scope::global("my-project"));
    }

    #[test]
    fn test_parse_zonal_and_regional() {
        assert_eq!(
            Scope::parse("my-project.us-central1-a").unwrap(),
            Scope::zonal("my-project", "us-central1-a")
        );
        assert_eq!(
            Scope::parse("my-project.us-central1").unwrap(),
            Scope::regional("my-project", "us-central1")
        );
    }

    #[test]
    fn test_parse_unknown_zone_by_shape() {
        let scope = Scope::parse("p1.me-central2-c").unwrap();
        assert!(scope.is_zonal());
        let scope = Scope::parse("p1.me-central2").unwrap();
        assert!(scope.is_regional());
    }

    #[test]
    fn test_parse_wildcard() {
        assert!(Scope::parse("*").unwrap().is_wildcard());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["", ".", "p.", ".us-central1", "p.us-central1.extra", "p.nowhere", "P", "p.us-central1-ab"] {
            let err = Scope::parse(text).unwrap_err();
            assert_eq!(err.kind, ErrorKind::NoScope, "input {:?}", text);
        }
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["p", "p.us-east4", "p.us-east4-b", "*"] {
            assert_eq!(Scope::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_from_aggregated_key() {
        assert_eq!(
            Scope::from_aggregated_key("p", "zones/us-central1-a"),
            Some(Scope::zonal("p", "us-central1-a"))
        );
        assert_eq!(
            Scope::from_aggregated_key("p", "regions/europe-west1"),
            Some(Scope::regional("p", "europe-west1"))
        );
        assert_eq!(Scope::from_aggregated_key("p", "global"), Some(Scope::global("p")));
        assert_eq!(Scope::from_aggregated_key("p", "zones/"), None);
        assert_eq!(Scope::from_aggregated_key("p", "locations/x"), None);
    }

    #[test]
    fn test_region_of_zone() {
        assert_eq!(region_of_zone("us-central1-a"), "us-central1");
        assert_eq!(region_of_zone("global"), "global");
    }

    #[test]
    fn test_known_regions_contains_zone_regions() {
        let regions = known_regions();
        assert!(regions.contains(&"us-central1"));
        assert!(regions.contains(&"southamerica-east1"));
        assert!(!regions.contains(&"us-central1-a"));
    }

    #[test]
    fn test_serde_as_string() {
        let scope = Scope::zonal("p", "us-central1-a");
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, "\"p.us-central1-a\"");
        let back: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scope);
    }
}
