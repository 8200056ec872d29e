// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Assembler
//!
//! Validates the property set, computes the deployment identity, decides the
//! optional features and composes the templates into one graph. Outputs of
//! one template reach another only as refs; nothing is resolved locally.
//!
//! ```text
//! <deployment>-net ──► <deployment>-vsensor-mig ◄──► <deployment>-storage
//!        │                      │
//!        ├──► <deployment>-bastion (optional)
//!        │                      │
//!        └──────────────► <deployment>-ingestion
//! ```

use serde_json::json;
use tracing::info;

use crate::domain::{
    validate_deployment, DeploymentIdentity, Environment, Features, GlobalProperties, Ref,
    ResourceKind,
};
use crate::errors::QuickstartResult;
use crate::graph::{DeploymentGraph, OutputMap, ResourceNode};
use crate::templates::{
    iam_member_bindings, instantiate, service_account, AutoscaledGroup, Bastion, BastionInputs,
    FleetInputs, LoadBalancer, LoadBalancerInputs, Network, NetworkInputs, Storage,
    StorageInputs,
};

/// Project roles granted to the fleet service account
pub const FLEET_ROLES: [&str; 3] = [
    "roles/storage.hmacKeyAdmin",
    "roles/monitoring.metricWriter",
    "roles/logging.logWriter",
];

/// Top-level nodes of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentResource {
    Network,
    FleetServiceAccount,
    FleetIamBindings,
    Storage,
    Fleet,
    HealthCheck,
    Bastion,
    Ingestion,
}

impl DeploymentResource {
    /// Top-level nodes emitted under `features`, in emission order
    pub fn planned(features: &Features) -> Vec<Self> {
        let mut plan = vec![
            Self::Network,
            Self::FleetServiceAccount,
            Self::FleetIamBindings,
            Self::Storage,
            Self::Fleet,
            Self::HealthCheck,
        ];
        if features.bastion {
            plan.push(Self::Bastion);
        }
        plan.push(Self::Ingestion);
        plan
    }
}

/// Names of the top-level nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentNames {
    pub network: String,
    pub fleet: String,
    pub storage: String,
    pub bastion: String,
    pub ingestion: String,
    pub healthcheck: String,
    pub service_account: String,
}

impl DeploymentNames {
    /// Derive every top-level name from the deployment identity
    pub fn new(identity: &DeploymentIdentity) -> Self {
        let deployment = identity.name();
        Self {
            network: format!("{deployment}-net"),
            fleet: format!("{deployment}-vsensor-mig"),
            storage: format!("{deployment}-storage"),
            bastion: format!("{deployment}-bastion"),
            ingestion: format!("{deployment}-ingestion"),
            healthcheck: format!("{deployment}-healthcheck"),
            service_account: identity.fleet_service_account_id(),
        }
    }

    /// Name of the subnet the bastion template creates
    pub fn bastion_subnet(&self) -> String {
        format!("{}-subnet", self.bastion)
    }
}

/// Generate the complete deployment graph
///
/// Every validation rule runs before anything is generated; on failure the
/// error carries all violations and no graph is produced.
pub fn generate(env: &Environment, props: &GlobalProperties) -> QuickstartResult<DeploymentGraph> {
    validate_deployment(&env.deployment, props)?;

    let identity = DeploymentIdentity::new(env.deployment.as_str());
    let features = Features::from_properties(props);
    let names = DeploymentNames::new(&identity);

    info!(
        deployment = %identity.name(),
        hash = %identity.hash(),
        ipv6 = features.ipv6,
        existing_vpc = features.existing_vpc,
        bastion = features.bastion,
        ossensor_ingest = features.ossensor_ingest,
        pcap_storage = features.pcap_storage,
        "generating deployment"
    );

    let vpc_ref = Ref::new(&names.network, "vpc-ref");
    let subnet_ref = Ref::new(&names.network, "subnet-ref");
    let email = Ref::new(&names.service_account, "email");
    let bucket_name = Ref::new(&names.storage, "bucket-name");

    let mut resources = Vec::new();
    for resource in DeploymentResource::planned(&features) {
        match resource {
            DeploymentResource::Network => resources.push(instantiate::<Network>(
                env,
                &names.network,
                &NetworkInputs {
                    global: props.clone(),
                },
            )?),
            DeploymentResource::FleetServiceAccount => resources.push(service_account(
                &names.service_account,
                "Darktrace vSensor Quickstart",
                "Allows Darktrace vSensors to read/write PCAPs to Storage Bucket",
            )),
            DeploymentResource::FleetIamBindings => resources.extend(iam_member_bindings(
                &names.service_account,
                &env.project,
                &email,
                &FLEET_ROLES,
            )),
            // The first sensor creates the shared storage key the bucket
            // access relies on.
            DeploymentResource::Storage => resources.push(
                instantiate::<Storage>(
                    env,
                    &names.storage,
                    &StorageInputs {
                        vpc_ref: vpc_ref.clone(),
                        global: props.clone(),
                        service_account_email: email.clone(),
                        deployment_hash: identity.hash().clone(),
                    },
                )?
                .depends_on(names.fleet.clone()),
            ),
            DeploymentResource::Fleet => resources.push(instantiate::<AutoscaledGroup>(
                env,
                &names.fleet,
                &FleetInputs {
                    vpc_ref: vpc_ref.clone(),
                    subnet_ref: subnet_ref.clone(),
                    healthcheck_name: names.healthcheck.clone(),
                    global: props.clone(),
                    deployment_hash: identity.hash().clone(),
                    service_account_email: email.clone(),
                    pcap_bucket_name: features.pcap_storage.then(|| bucket_name.clone()),
                },
            )?),
            DeploymentResource::HealthCheck => resources.push(ResourceNode::new(
                &names.healthcheck,
                ResourceKind::HealthCheck,
                json!({
                    "httpsHealthCheck": {"port": 443, "requestPath": "/"},
                    "type": "HTTPS",
                }),
            )),
            DeploymentResource::Bastion => resources.push(instantiate::<Bastion>(
                env,
                &names.bastion,
                &BastionInputs {
                    vpc_ref: vpc_ref.clone(),
                    global: props.clone(),
                    deployment_hash: identity.hash().clone(),
                },
            )?),
            DeploymentResource::Ingestion => {
                let mut node = instantiate::<LoadBalancer>(
                    env,
                    &names.ingestion,
                    &LoadBalancerInputs {
                        vpc_ref: vpc_ref.clone(),
                        mig_ig_ref: Ref::new(&names.fleet, "mig-ig-ref"),
                        mig_subnet_ref: subnet_ref.clone(),
                        bastion_subnet_name: features.bastion.then(|| names.bastion_subnet()),
                        mirrored_subnet_names: props.mirrored_subnet_names(),
                        // The sensor subnet is never mirrored and the bastion
                        // subnet is addressed by link.
                        generated_subnet_names: Vec::new(),
                        healthcheck_name: names.healthcheck.clone(),
                        global: props.clone(),
                    },
                )?
                .depends_on(names.fleet.clone());
                if features.bastion {
                    node = node.depends_on(names.bastion.clone());
                }
                resources.push(node);
            }
        }
    }

    let outputs = combined_outputs(&names, &features, props);
    let graph = DeploymentGraph { resources, outputs };

    info!(
        deployment = %identity.name(),
        nodes = graph.nodes().len(),
        outputs = graph.outputs.len(),
        "deployment generated"
    );
    Ok(graph)
}

fn combined_outputs(
    names: &DeploymentNames,
    features: &Features,
    props: &GlobalProperties,
) -> OutputMap {
    let mut outputs = OutputMap::new()
        .with("vpc-name", Ref::new(&names.network, "vpc-name"))
        .with("nat-external-ip", Ref::new(&names.network, "nat-ip"))
        .with("pcap-bucket-name", Ref::new(&names.storage, "bucket-name"))
        .with("vsensor-subnet-name", Ref::new(&names.network, "subnet-name"));
    if features.bastion {
        outputs.insert("bastion-subnet-name", Ref::new(&names.bastion, "subnet-name"));
    }
    if features.ossensor_ingest {
        outputs.insert(
            "ossensor-vsensor-ip",
            Ref::new(&names.ingestion, "ossensor-loadbalancer-ip"),
        );
        outputs.insert("ossensor-vsensor-cidr", props.mig_subnet_cidr.clone());
    }
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QuickstartError;

    fn props() -> GlobalProperties {
        GlobalProperties::from_yaml_str(
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
        .unwrap()
    }

    #[test]
    fn test_plan_by_features() {
        let plan = DeploymentResource::planned(&Features::default());
        assert!(plan.contains(&DeploymentResource::Storage));
        assert!(!plan.contains(&DeploymentResource::Bastion));
        assert_eq!(plan.last(), Some(&DeploymentResource::Ingestion));

        let all = Features {
            pcap_storage: true,
            bastion: true,
            ..Features::default()
        };
        assert_eq!(DeploymentResource::planned(&all).len(), 8);
    }

    #[test]
    fn test_top_level_names() {
        let graph = generate(&Environment::new("demo", "proj"), &props()).unwrap();
        let top: Vec<&str> = graph.resources.iter().map(|r| r.name.as_str()).collect();
        let sa = DeploymentIdentity::new("demo").fleet_service_account_id();

        assert_eq!(top[0], "demo-net");
        assert_eq!(top[1], sa);
        assert!(top.contains(&"demo-storage"));
        assert!(top.contains(&"demo-vsensor-mig"));
        assert!(top.contains(&"demo-healthcheck"));
        assert_eq!(top.last(), Some(&"demo-ingestion"));
    }

    #[test]
    fn test_storage_depends_on_fleet() {
        let graph = generate(&Environment::new("demo", "proj"), &props()).unwrap();
        let storage = graph.find("demo-storage").unwrap();
        assert!(storage.declares_dependency_on("demo-vsensor-mig"));
        assert_eq!(
            storage.properties["deployment-hash"],
            DeploymentIdentity::new("demo").hash().as_str()
        );
    }

    #[test]
    fn test_storage_without_capture_retention() {
        let mut props = props();
        props.pcap_retention_time_days = 0;
        let graph = generate(&Environment::new("demo", "proj"), &props).unwrap();

        let storage = graph.find("demo-storage").unwrap();
        assert!(storage.declares_dependency_on("demo-vsensor-mig"));
        assert_eq!(
            graph.outputs.get("pcap-bucket-name").and_then(|v| v.as_ref_token()),
            Some(&Ref::new("demo-storage", "bucket-name"))
        );

        let fleet = graph.find("demo-vsensor-mig").unwrap();
        assert!(fleet.properties.get("pcap-bucket-name").is_none());
        assert!(graph.audit().is_clean(), "{}", graph.audit());
    }

    #[test]
    fn test_validation_blocks_generation() {
        let mut props = props();
        props.mig_min_size = 5;
        props.mig_max_size = 2;
        let err = generate(&Environment::new("demo", "proj"), &props).unwrap_err();
        assert!(matches!(
            err,
            QuickstartError::Validation(ref report) if report.errors().len() == 1
        ));
    }
}
