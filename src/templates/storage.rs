// Copyright (c) 2025 - Cowboy AI, Inc.
//! Capture Storage Template
//!
//! A private bucket in the storage location nearest the compute region, with
//! an age-based delete rule and a matching retention lock, plus a custom role
//! that lets sensors confirm the bucket is private before writing to it.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::Template;
use crate::domain::{
    nearest_storage_location, DeploymentHash, Environment, Features, GlobalProperties, Ref,
    ResourceKind, TemplateKind,
};
use crate::errors::QuickstartResult;
use crate::graph::{Fragment, OutputMap, ResourceNode};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Inputs of the storage template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageInputs {
    pub vpc_ref: Ref,
    pub global: GlobalProperties,
    pub service_account_email: Ref,
    pub deployment_hash: DeploymentHash,
}

/// Resources the storage template emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageResource {
    BucketRole,
    Bucket,
}

impl StorageResource {
    /// Resources emitted under `features`, in emission order
    ///
    /// The bucket exists even with zero retention; only the fleet's upload
    /// step is dropped then.
    pub fn planned(_features: &Features) -> Vec<Self> {
        vec![Self::BucketRole, Self::Bucket]
    }
}

/// Storage template generator
pub struct Storage;

impl Template for Storage {
    type Inputs = StorageInputs;
    const KIND: TemplateKind = TemplateKind::Storage;

    fn generate(env: &Environment, inputs: &StorageInputs) -> QuickstartResult<Fragment> {
        let features = Features::from_properties(&inputs.global);
        let bucket = format!("{}-bucket", env.name);
        let role = format!("{}_vsensor_storage", inputs.deployment_hash);

        let resources: Vec<ResourceNode> = StorageResource::planned(&features)
            .into_iter()
            .map(|resource| match resource {
                StorageResource::BucketRole => bucket_role(&env.project, &role),
                StorageResource::Bucket => bucket_node(env, inputs, &bucket, &role),
            })
            .collect();

        debug!(
            template = %env.name,
            bucket = %bucket,
            retention_days = inputs.global.pcap_retention_time_days,
            "generated storage template"
        );

        Ok(Fragment::new(resources, OutputMap::new().with("bucket-name", bucket)))
    }
}

fn bucket_role(project: &str, role: &str) -> ResourceNode {
    ResourceNode::new(
        role,
        ResourceKind::ProjectRole,
        json!({
            "parent": format!("projects/{project}"),
            "roleId": role,
            "role": {
                "title": "vSensor IAM Role",
                "description": "Gives the vSensor permission to check the GCP bucket is private before use.",
                "includedPermissions": ["storage.buckets.get"],
                "stage": "GA",
            },
        }),
    )
}

fn bucket_node(
    env: &Environment,
    inputs: &StorageInputs,
    bucket: &str,
    role: &str,
) -> ResourceNode {
    let project = &env.project;
    let days = inputs.global.pcap_retention_time_days;
    let sensor = format!("serviceAccount:{}", inputs.service_account_email);
    let owner = format!("projectOwner:{project}");

    ResourceNode::new(
        bucket,
        ResourceKind::Bucket,
        json!({
            "iamConfiguration": {
                "publicAccessPrevention": "enforced",
                "uniformBucketLevelAccess": {"enabled": true},
            },
            "location": nearest_storage_location(&inputs.global.region),
            "lifecycle": {
                "rule": [{
                    "action": {"type": "Delete"},
                    "condition": {"age": days},
                }]
            },
            "retentionPolicy": {"retentionPeriod": u64::from(days) * SECONDS_PER_DAY},
            "storageClass": "STANDARD",
        }),
    )
    .with_access_control(json!({
        "gcpIamPolicy": {
            "bindings": [
                {"role": "roles/storage.objectAdmin", "members": [sensor]},
                {"role": "roles/storage.legacyBucketOwner", "members": [owner]},
                {"role": "roles/storage.objectAdmin", "members": [owner]},
                {"role": format!("projects/{project}/roles/{role}"), "members": [sensor]},
            ]
        }
    }))
    .depends_on_ref(&inputs.service_account_email)
    .depends_on(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeploymentIdentity;
    use crate::graph::DeploymentGraph;

    fn generate(region: &str, days: u32) -> Fragment {
        let mut global = GlobalProperties::from_yaml_str(
            r#"
region: europe-west2
zone1: europe-west2-a
zone2: europe-west2-b
mig-subnet-cidr: 10.0.0.0/24
mig-min-size: 1
mig-max-size: 3
mig-instance-type: e2-standard-2
vsensor-update-key: k
appliance-push-token: t
appliance-hostname: appliance.example.com
appliance-port: 443
pcap-retention-time-days: 7
"#,
        )
        .unwrap();
        global.region = region.to_string();
        global.pcap_retention_time_days = days;

        let identity = DeploymentIdentity::new("demo");
        let inputs = StorageInputs {
            vpc_ref: Ref::new("demo-net", "vpc-ref"),
            global,
            service_account_email: Ref::new("demo-sa", "email"),
            deployment_hash: identity.hash().clone(),
        };
        let env = Environment::new("demo", "proj").for_template("demo-storage");
        Storage::generate(&env, &inputs).unwrap()
    }

    #[test]
    fn test_bucket_payload() {
        let fragment = generate("europe-west2", 7);
        let bucket = fragment.resource("demo-storage-bucket").unwrap();

        assert_eq!(bucket.properties["location"], "EUROPE-WEST2");
        assert_eq!(bucket.properties["lifecycle"]["rule"][0]["condition"]["age"], 7);
        assert_eq!(bucket.properties["retentionPolicy"]["retentionPeriod"], 604_800);
        assert_eq!(
            bucket.properties["iamConfiguration"]["publicAccessPrevention"],
            "enforced"
        );
        assert_eq!(
            fragment.outputs.get("bucket-name").and_then(|v| v.as_literal_str()),
            Some("demo-storage-bucket")
        );
    }

    #[test]
    fn test_zero_retention_still_emits_bucket() {
        let fragment = generate("europe-west2", 0);
        let bucket = fragment.resource("demo-storage-bucket").unwrap();
        assert_eq!(bucket.properties["lifecycle"]["rule"][0]["condition"]["age"], 0);
        assert_eq!(bucket.properties["retentionPolicy"]["retentionPeriod"], 0);
        assert_eq!(fragment.resources.len(), 2);
    }

    #[test]
    fn test_bucket_location_falls_back() {
        let fragment = generate("europe-south1", 1);
        let bucket = fragment.resource("demo-storage-bucket").unwrap();
        assert_eq!(bucket.properties["location"], "EUROPE-SOUTHWEST1");
    }

    #[test]
    fn test_access_policy_and_role() {
        let fragment = generate("us-east1", 30);
        let hash = DeploymentIdentity::new("demo").hash().to_string();
        let role_name = format!("{hash}_vsensor_storage");

        let role = fragment.resource(&role_name).unwrap();
        assert_eq!(role.kind, ResourceKind::ProjectRole);
        assert_eq!(role.properties["parent"], "projects/proj");
        assert_eq!(role.properties["role"]["includedPermissions"], json!(["storage.buckets.get"]));

        let bucket = fragment.resource("demo-storage-bucket").unwrap();
        let bindings = &bucket.access_control.as_ref().unwrap()["gcpIamPolicy"]["bindings"];
        assert_eq!(bindings[0]["members"][0], "serviceAccount:$(ref.demo-sa.email)");
        assert_eq!(bindings[1]["role"], "roles/storage.legacyBucketOwner");
        assert_eq!(bindings[2]["members"][0], "projectOwner:proj");
        assert_eq!(bindings[3]["role"], format!("projects/proj/roles/{role_name}"));
    }

    #[test]
    fn test_every_embedded_ref_is_declared() {
        let mut resources = generate("us-east1", 30).resources;
        resources.push(ResourceNode::new("demo-sa", ResourceKind::ServiceAccount, json!({})));
        let graph = DeploymentGraph {
            resources,
            outputs: OutputMap::new(),
        };
        assert!(graph.audit().is_clean(), "{}", graph.audit());
    }
}
