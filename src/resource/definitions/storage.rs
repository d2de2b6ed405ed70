//! Cloud Storage resources

use crate::item::BlastPropagation;
use crate::resource::registry::{
    Endpoint, FieldSpec, ReferenceField, ResourceDef, Service, UniqueKey,
};
use crate::scope::LocationKind;

pub static BUCKET: ResourceDef = ResourceDef {
    item_type: "storage-bucket",
    display_name: "Buckets",
    service: Service::Storage,
    endpoints: &[Endpoint {
        location: LocationKind::Global,
        get: "b/{0}",
        list: Some("b"),
        search: None,
        query: &[("project", "{project}")],
    }],
    items_field: "items",
    aggregated: None,
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("location"),
        FieldSpec::new("locationType"),
        FieldSpec::new("storageClass"),
        FieldSpec::new("timeCreated"),
        FieldSpec::new("updated"),
        FieldSpec::at("versioningEnabled", "versioning.enabled"),
        FieldSpec::at(
            "uniformBucketLevelAccess",
            "iamConfiguration.uniformBucketLevelAccess.enabled",
        ),
        FieldSpec::new("lifecycle"),
        FieldSpec::new("retentionPolicy"),
        FieldSpec::at("defaultKmsKeyName", "encryption.defaultKmsKeyName"),
        FieldSpec::at("logBucket", "logging.logBucket"),
        FieldSpec::excluded("labels"),
        FieldSpec::excluded("etag"),
    ],
    tags_field: Some("labels"),
    references: &[ReferenceField::new(
        "encryption.defaultKmsKeyName",
        &["locations", "keyRings", "cryptoKeys"],
        "cloud-kms-crypto-key",
        BlastPropagation::IN,
    )],
};
