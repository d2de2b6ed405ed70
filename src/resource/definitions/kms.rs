//! Cloud KMS resources
//!
//! KMS identities span several hierarchy levels (location, key ring, key),
//! so items carry a composite `uniqueAttr` such as `global|my-ring|my-key`.
//! Listing requires a parent, which makes these kinds search-only.

use crate::item::BlastPropagation;
use crate::resource::registry::{
    Endpoint, FieldSpec, ReferenceField, ResourceDef, Service, UniqueKey,
};
use crate::scope::LocationKind;

pub static KEY_RING: ResourceDef = ResourceDef {
    item_type: "cloud-kms-key-ring",
    display_name: "KMS Key Rings",
    service: Service::CloudKms,
    endpoints: &[Endpoint {
        location: LocationKind::Global,
        get: "projects/{project}/locations/{0}/keyRings/{1}",
        list: None,
        search: Some("projects/{project}/locations/{0}/keyRings"),
        query: &[],
    }],
    items_field: "keyRings",
    aggregated: None,
    key_parts: 2,
    search_parts: 1,
    unique: UniqueKey::Composite {
        attribute: "uniqueAttr",
        source: "name",
        anchors: &["locations", "keyRings"],
    },
    fields: &[FieldSpec::new("name"), FieldSpec::new("createTime")],
    tags_field: None,
    references: &[],
};

pub static CRYPTO_KEY: ResourceDef = ResourceDef {
    item_type: "cloud-kms-crypto-key",
    display_name: "KMS Crypto Keys",
    service: Service::CloudKms,
    endpoints: &[Endpoint {
        location: LocationKind::Global,
        get: "projects/{project}/locations/{0}/keyRings/{1}/cryptoKeys/{2}",
        list: None,
        search: Some("projects/{project}/locations/{0}/keyRings/{1}/cryptoKeys"),
        query: &[],
    }],
    items_field: "cryptoKeys",
    aggregated: None,
    key_parts: 3,
    search_parts: 2,
    unique: UniqueKey::Composite {
        attribute: "uniqueAttr",
        source: "name",
        anchors: &["locations", "keyRings", "cryptoKeys"],
    },
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("purpose"),
        FieldSpec::new("createTime"),
        FieldSpec::new("nextRotationTime"),
        FieldSpec::new("rotationPeriod"),
        FieldSpec::at("primaryState", "primary.state"),
        FieldSpec::at("algorithm", "versionTemplate.algorithm"),
        FieldSpec::at("protectionLevel", "versionTemplate.protectionLevel"),
        FieldSpec::new("importOnly"),
        FieldSpec::new("destroyScheduledDuration"),
        FieldSpec::excluded("labels"),
    ],
    tags_field: Some("labels"),
    references: &[
        ReferenceField::in_source_project(
            "name",
            &["locations", "keyRings"],
            "cloud-kms-key-ring",
            BlastPropagation::IN,
        ),
        ReferenceField::in_source_project(
            "primary.name",
            &["locations", "keyRings", "cryptoKeys", "cryptoKeyVersions"],
            "cloud-kms-crypto-key-version",
            BlastPropagation::BOTH,
        ),
    ],
};
