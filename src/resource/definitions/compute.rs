//! Compute Engine resources

use crate::item::BlastPropagation;
use crate::resource::registry::{
    Endpoint, FieldSpec, ReferenceField, ResourceDef, Service, UniqueKey,
};

/// Anchors of a Cloud KMS crypto key path, matching the key's own identity
const KMS_KEY_ANCHORS: &[&str] = &["locations", "keyRings", "cryptoKeys"];

pub static INSTANCE: ResourceDef = ResourceDef {
    item_type: "compute-instance",
    display_name: "VM Instances",
    service: Service::Compute,
    endpoints: &[Endpoint::zonal(
        "projects/{project}/zones/{zone}/instances/{0}",
        "projects/{project}/zones/{zone}/instances",
    )],
    items_field: "items",
    aggregated: Some("instances"),
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("status"),
        FieldSpec::new("machineType"),
        FieldSpec::new("zone"),
        FieldSpec::new("cpuPlatform"),
        FieldSpec::new("creationTimestamp"),
        FieldSpec::new("deletionProtection"),
        FieldSpec::new("networkInterfaces"),
        FieldSpec::new("disks"),
        FieldSpec::new("serviceAccounts"),
        FieldSpec::new("scheduling"),
        FieldSpec::new("resourcePolicies"),
        FieldSpec::new("selfLink"),
        FieldSpec::excluded("labels"),
        FieldSpec::excluded("fingerprint"),
        FieldSpec::excluded("metadata"),
    ],
    tags_field: Some("labels"),
    references: &[
        ReferenceField::new("disks[].source", &["disks"], "compute-disk", BlastPropagation::BOTH),
        ReferenceField::new(
            "networkInterfaces[].network",
            &["networks"],
            "compute-network",
            BlastPropagation::IN,
        ),
        ReferenceField::new(
            "networkInterfaces[].subnetwork",
            &["subnetworks"],
            "compute-subnetwork",
            BlastPropagation::IN,
        ),
        ReferenceField::new(
            "resourcePolicies[]",
            &["resourcePolicies"],
            "compute-resource-policy",
            BlastPropagation::IN,
        ),
    ],
};

pub static DISK: ResourceDef = ResourceDef {
    item_type: "compute-disk",
    display_name: "Persistent Disks",
    service: Service::Compute,
    endpoints: &[
        Endpoint::zonal(
            "projects/{project}/zones/{zone}/disks/{0}",
            "projects/{project}/zones/{zone}/disks",
        ),
        Endpoint::regional(
            "projects/{project}/regions/{region}/disks/{0}",
            "projects/{project}/regions/{region}/disks",
        ),
    ],
    items_field: "items",
    aggregated: Some("disks"),
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("status"),
        FieldSpec::new("sizeGb"),
        FieldSpec::new("type"),
        FieldSpec::new("zone"),
        FieldSpec::new("region"),
        FieldSpec::new("sourceImage"),
        FieldSpec::new("sourceSnapshot"),
        FieldSpec::new("users"),
        FieldSpec::new("physicalBlockSizeBytes"),
        FieldSpec::new("creationTimestamp"),
        FieldSpec::new("lastAttachTimestamp"),
        FieldSpec::at("kmsKeyName", "diskEncryptionKey.kmsKeyName"),
        FieldSpec::excluded("labels"),
        FieldSpec::excluded("labelFingerprint"),
    ],
    tags_field: Some("labels"),
    references: &[
        ReferenceField::new("sourceImage", &["images"], "compute-image", BlastPropagation::IN),
        ReferenceField::new(
            "sourceSnapshot",
            &["snapshots"],
            "compute-snapshot",
            BlastPropagation::IN,
        ),
        ReferenceField::new("users[]", &["instances"], "compute-instance", BlastPropagation::BOTH),
        ReferenceField::new(
            "diskEncryptionKey.kmsKeyName",
            KMS_KEY_ANCHORS,
            "cloud-kms-crypto-key",
            BlastPropagation::IN,
        ),
    ],
};

pub static IMAGE: ResourceDef = ResourceDef {
    item_type: "compute-image",
    display_name: "Images",
    service: Service::Compute,
    endpoints: &[Endpoint::global(
        "projects/{project}/global/images/{0}",
        "projects/{project}/global/images",
    )],
    items_field: "items",
    aggregated: None,
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("status"),
        FieldSpec::new("family"),
        FieldSpec::new("diskSizeGb"),
        FieldSpec::new("archiveSizeBytes"),
        FieldSpec::new("sourceType"),
        FieldSpec::new("sourceDisk"),
        FieldSpec::new("sourceImage"),
        FieldSpec::new("sourceSnapshot"),
        FieldSpec::new("storageLocations"),
        FieldSpec::new("licenses"),
        FieldSpec::new("creationTimestamp"),
        FieldSpec::excluded("labels"),
        FieldSpec::excluded("labelFingerprint"),
    ],
    tags_field: Some("labels"),
    references: &[
        ReferenceField::new("sourceDisk", &["disks"], "compute-disk", BlastPropagation::IN),
        ReferenceField::new("sourceImage", &["images"], "compute-image", BlastPropagation::IN),
        ReferenceField::new(
            "sourceSnapshot",
            &["snapshots"],
            "compute-snapshot",
            BlastPropagation::IN,
        ),
        ReferenceField::new(
            "imageEncryptionKey.kmsKeyName",
            KMS_KEY_ANCHORS,
            "cloud-kms-crypto-key",
            BlastPropagation::IN,
        ),
    ],
};

pub static SNAPSHOT: ResourceDef = ResourceDef {
    item_type: "compute-snapshot",
    display_name: "Snapshots",
    service: Service::Compute,
    endpoints: &[Endpoint::global(
        "projects/{project}/global/snapshots/{0}",
        "projects/{project}/global/snapshots",
    )],
    items_field: "items",
    aggregated: None,
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("status"),
        FieldSpec::new("diskSizeGb"),
        FieldSpec::new("storageBytes"),
        FieldSpec::new("sourceDisk"),
        FieldSpec::new("storageLocations"),
        FieldSpec::new("creationTimestamp"),
        FieldSpec::excluded("labels"),
    ],
    tags_field: Some("labels"),
    references: &[
        ReferenceField::new("sourceDisk", &["disks"], "compute-disk", BlastPropagation::IN),
        ReferenceField::new(
            "snapshotEncryptionKey.kmsKeyName",
            KMS_KEY_ANCHORS,
            "cloud-kms-crypto-key",
            BlastPropagation::IN,
        ),
    ],
};

pub static NETWORK: ResourceDef = ResourceDef {
    item_type: "compute-network",
    display_name: "VPC Networks",
    service: Service::Compute,
    endpoints: &[Endpoint::global(
        "projects/{project}/global/networks/{0}",
        "projects/{project}/global/networks",
    )],
    items_field: "items",
    aggregated: None,
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("autoCreateSubnetworks"),
        FieldSpec::at("routingMode", "routingConfig.routingMode"),
        FieldSpec::new("mtu"),
        FieldSpec::new("subnetworks"),
        FieldSpec::new("peerings"),
        FieldSpec::new("creationTimestamp"),
    ],
    tags_field: None,
    references: &[
        ReferenceField::new(
            "subnetworks[]",
            &["subnetworks"],
            "compute-subnetwork",
            BlastPropagation::OUT,
        ),
        ReferenceField::new(
            "peerings[].network",
            &["networks"],
            "compute-network",
            BlastPropagation::BOTH,
        ),
    ],
};

pub static SUBNETWORK: ResourceDef = ResourceDef {
    item_type: "compute-subnetwork",
    display_name: "Subnets",
    service: Service::Compute,
    endpoints: &[Endpoint::regional(
        "projects/{project}/regions/{region}/subnetworks/{0}",
        "projects/{project}/regions/{region}/subnetworks",
    )],
    items_field: "items",
    aggregated: Some("subnetworks"),
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("ipCidrRange"),
        FieldSpec::new("gatewayAddress"),
        FieldSpec::new("network"),
        FieldSpec::new("region"),
        FieldSpec::new("privateIpGoogleAccess"),
        FieldSpec::new("purpose"),
        FieldSpec::new("stackType"),
        FieldSpec::new("secondaryIpRanges"),
        FieldSpec::new("creationTimestamp"),
        FieldSpec::excluded("fingerprint"),
    ],
    tags_field: None,
    references: &[ReferenceField::new(
        "network",
        &["networks"],
        "compute-network",
        BlastPropagation::IN,
    )],
};

pub static ADDRESS: ResourceDef = ResourceDef {
    item_type: "compute-address",
    display_name: "IP Addresses",
    service: Service::Compute,
    endpoints: &[
        Endpoint::global(
            "projects/{project}/global/addresses/{0}",
            "projects/{project}/global/addresses",
        ),
        Endpoint::regional(
            "projects/{project}/regions/{region}/addresses/{0}",
            "projects/{project}/regions/{region}/addresses",
        ),
    ],
    items_field: "items",
    aggregated: Some("addresses"),
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("address"),
        FieldSpec::new("addressType"),
        FieldSpec::new("purpose"),
        FieldSpec::new("status"),
        FieldSpec::new("region"),
        FieldSpec::new("network"),
        FieldSpec::new("subnetwork"),
        FieldSpec::new("users"),
        FieldSpec::new("ipVersion"),
        FieldSpec::new("networkTier"),
        FieldSpec::excluded("labels"),
    ],
    tags_field: Some("labels"),
    references: &[
        ReferenceField::new("network", &["networks"], "compute-network", BlastPropagation::IN),
        ReferenceField::new(
            "subnetwork",
            &["subnetworks"],
            "compute-subnetwork",
            BlastPropagation::IN,
        ),
        // A user is either a forwarding rule or an instance; the row whose
        // anchor is absent yields nothing.
        ReferenceField::new(
            "users[]",
            &["forwardingRules"],
            "compute-forwarding-rule",
            BlastPropagation::BOTH,
        ),
        ReferenceField::new("users[]", &["instances"], "compute-instance", BlastPropagation::BOTH),
    ],
};

pub static FORWARDING_RULE: ResourceDef = ResourceDef {
    item_type: "compute-forwarding-rule",
    display_name: "Forwarding Rules",
    service: Service::Compute,
    endpoints: &[
        Endpoint::regional(
            "projects/{project}/regions/{region}/forwardingRules/{0}",
            "projects/{project}/regions/{region}/forwardingRules",
        ),
        Endpoint::global(
            "projects/{project}/global/forwardingRules/{0}",
            "projects/{project}/global/forwardingRules",
        ),
    ],
    items_field: "items",
    aggregated: Some("forwardingRules"),
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("IPAddress"),
        FieldSpec::new("IPProtocol"),
        FieldSpec::new("portRange"),
        FieldSpec::new("ports"),
        FieldSpec::new("loadBalancingScheme"),
        FieldSpec::new("network"),
        FieldSpec::new("subnetwork"),
        FieldSpec::new("backendService"),
        FieldSpec::new("target"),
        FieldSpec::new("region"),
        FieldSpec::new("networkTier"),
        FieldSpec::excluded("labels"),
        FieldSpec::excluded("fingerprint"),
    ],
    tags_field: Some("labels"),
    references: &[
        ReferenceField::new("network", &["networks"], "compute-network", BlastPropagation::IN),
        ReferenceField::new(
            "subnetwork",
            &["subnetworks"],
            "compute-subnetwork",
            BlastPropagation::IN,
        ),
        ReferenceField::new(
            "backendService",
            &["backendServices"],
            "compute-backend-service",
            BlastPropagation::BOTH,
        ),
    ],
};

pub static BACKEND_SERVICE: ResourceDef = ResourceDef {
    item_type: "compute-backend-service",
    display_name: "Backend Services",
    service: Service::Compute,
    endpoints: &[
        Endpoint::global(
            "projects/{project}/global/backendServices/{0}",
            "projects/{project}/global/backendServices",
        ),
        Endpoint::regional(
            "projects/{project}/regions/{region}/backendServices/{0}",
            "projects/{project}/regions/{region}/backendServices",
        ),
    ],
    items_field: "items",
    aggregated: Some("backendServices"),
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("protocol"),
        FieldSpec::new("port"),
        FieldSpec::new("portName"),
        FieldSpec::new("loadBalancingScheme"),
        FieldSpec::new("timeoutSec"),
        FieldSpec::new("backends"),
        FieldSpec::new("healthChecks"),
        FieldSpec::new("securityPolicy"),
        FieldSpec::new("network"),
        FieldSpec::new("region"),
        FieldSpec::new("creationTimestamp"),
        FieldSpec::excluded("fingerprint"),
    ],
    tags_field: None,
    references: &[
        ReferenceField::new(
            "backends[].group",
            &["instanceGroups"],
            "compute-instance-group",
            BlastPropagation::BOTH,
        ),
        ReferenceField::new(
            "backends[].group",
            &["networkEndpointGroups"],
            "compute-network-endpoint-group",
            BlastPropagation::BOTH,
        ),
        ReferenceField::new(
            "healthChecks[]",
            &["healthChecks"],
            "compute-health-check",
            BlastPropagation::IN,
        ),
        ReferenceField::new(
            "securityPolicy",
            &["securityPolicies"],
            "compute-security-policy",
            BlastPropagation::IN,
        ),
        ReferenceField::new("network", &["networks"], "compute-network", BlastPropagation::IN),
    ],
};

pub static HEALTH_CHECK: ResourceDef = ResourceDef {
    item_type: "compute-health-check",
    display_name: "Health Checks",
    service: Service::Compute,
    endpoints: &[
        Endpoint::global(
            "projects/{project}/global/healthChecks/{0}",
            "projects/{project}/global/healthChecks",
        ),
        Endpoint::regional(
            "projects/{project}/regions/{region}/healthChecks/{0}",
            "projects/{project}/regions/{region}/healthChecks",
        ),
    ],
    items_field: "items",
    aggregated: Some("healthChecks"),
    key_parts: 1,
    search_parts: 0,
    unique: UniqueKey::Name,
    fields: &[
        FieldSpec::new("name"),
        FieldSpec::new("id"),
        FieldSpec::new("description"),
        FieldSpec::new("type"),
        FieldSpec::new("checkIntervalSec"),
        FieldSpec::new("timeoutSec"),
        FieldSpec::new("healthyThreshold"),
        FieldSpec::new("unhealthyThreshold"),
        FieldSpec::new("tcpHealthCheck"),
        FieldSpec::new("httpHealthCheck"),
        FieldSpec::new("httpsHealthCheck"),
        FieldSpec::new("region"),
        FieldSpec::new("creationTimestamp"),
    ],
    tags_field: None,
    references: &[],
};
