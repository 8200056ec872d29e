// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bastion Template
//!
//! A single externally reachable instance in its own public subnet, giving
//! SSH access to the private sensors from one configured external range.
//! The instance runs under its own service account with log and metric
//! writer roles only.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{
    boot_disk, distribution_policy, iam_member_bindings, service_account, Template,
    CLOUD_PLATFORM_SCOPE,
};
use crate::bootstrap::{bastion_startup_script, instance_metadata};
use crate::domain::{
    service_account_id, DeploymentHash, Environment, Features, GlobalProperties, Ref,
    ResourceKind, TemplateKind, ValidationError,
};
use crate::errors::QuickstartResult;
use crate::graph::{Fragment, OutputMap, ResourceNode};

/// Network tag of the bastion instance
pub const BASTION_TAG: &str = "darktrace-vsensor-bastion";

/// Machine type of the bastion instance
pub const BASTION_MACHINE_TYPE: &str = "e2-micro";

/// Project roles granted to the bastion service account
pub const BASTION_ROLES: [&str; 2] = ["roles/monitoring.metricWriter", "roles/logging.logWriter"];

/// Inputs of the bastion template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BastionInputs {
    pub vpc_ref: Ref,
    pub global: GlobalProperties,
    pub deployment_hash: DeploymentHash,
}

/// Resources the bastion template emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BastionResource {
    Subnet,
    ExternalFirewall,
    ServiceAccount,
    IamBindings,
    InstanceGroup,
    InstanceTemplate,
}

impl BastionResource {
    /// Resources emitted under `features`, in emission order
    ///
    /// Empty when the bastion is disabled.
    pub fn planned(features: &Features) -> Vec<Self> {
        if !features.bastion {
            return Vec::new();
        }
        vec![
            Self::Subnet,
            Self::ExternalFirewall,
            Self::ServiceAccount,
            Self::IamBindings,
            Self::InstanceGroup,
            Self::InstanceTemplate,
        ]
    }
}

/// Bastion template generator
pub struct Bastion;

struct BastionNames {
    subnet: String,
    instance_template: String,
    account_id: String,
}

impl Template for Bastion {
    type Inputs = BastionInputs;
    const KIND: TemplateKind = TemplateKind::Bastion;

    fn generate(env: &Environment, inputs: &BastionInputs) -> QuickstartResult<Fragment> {
        let global = &inputs.global;
        let (Some(subnet_cidr), Some(external_cidr)) = (
            global.bastion_subnet_cidr.as_deref(),
            global.bastion_external_cidr.as_deref(),
        ) else {
            return Err(ValidationError::BastionCidrsMissing.into());
        };

        let features = Features::from_properties(global);
        let names = BastionNames {
            subnet: format!("{}-subnet", env.name),
            instance_template: format!("{}-template", env.name),
            account_id: service_account_id(&env.name, 17, &inputs.deployment_hash, "bsa"),
        };
        let email = Ref::new(&names.account_id, "email");
        let network = &inputs.vpc_ref;

        let mut resources = Vec::new();
        for resource in BastionResource::planned(&features) {
            match resource {
                BastionResource::Subnet => resources.push(
                    ResourceNode::new(
                        &names.subnet,
                        ResourceKind::Subnetwork,
                        json!({
                            "description": "Public subnet containing bastion for Darktrace vSensors",
                            "network": network,
                            "ipCidrRange": subnet_cidr,
                            "region": global.region,
                            "privateIpGoogleAccess": true,
                        }),
                    )
                    .depends_on_ref(network),
                ),
                BastionResource::ExternalFirewall => resources.push(
                    ResourceNode::new(
                        format!("{}-firewall-internal", env.name),
                        ResourceKind::Firewall,
                        json!({
                            "description": "vSensor Quickstart bastion public firewall policy. This allows access to the bastion (and therefore vSensors) from an external CIDR range.",
                            "name": "External SSH Access",
                            "priority": 1000,
                            "network": network,
                            "sourceRanges": [external_cidr],
                            "direction": "INGRESS",
                            "allowed": [
                                {"IPProtocol": "TCP", "ports": ["22"]},
                                {"IPProtocol": "icmp"},
                            ],
                        }),
                    )
                    .depends_on_ref(network),
                ),
                BastionResource::ServiceAccount => resources.push(service_account(
                    &names.account_id,
                    "Darktrace vSensor Quickstart Bastion",
                    "Allows Bastion to send logs / metrics from Monitoring Ops Agent",
                )),
                BastionResource::IamBindings => resources.extend(iam_member_bindings(
                    &names.account_id,
                    &env.project,
                    &email,
                    &BASTION_ROLES,
                )),
                BastionResource::InstanceGroup => {
                    resources.push(instance_group(env, global, &names.instance_template))
                }
                BastionResource::InstanceTemplate => {
                    resources.push(instance_template(inputs, &names, &email))
                }
            }
        }

        debug!(
            template = %env.name,
            resources = resources.len(),
            service_account = %names.account_id,
            "generated bastion template"
        );

        let outputs = OutputMap::new()
            .with("subnet-ref", Ref::self_link(&names.subnet))
            .with("subnet-name", names.subnet.clone());

        Ok(Fragment::new(resources, outputs))
    }
}

fn instance_group(
    env: &Environment,
    global: &GlobalProperties,
    instance_template: &str,
) -> ResourceNode {
    let template_ref = Ref::self_link(instance_template);
    ResourceNode::new(
        format!("{}-mig", env.name),
        ResourceKind::RegionInstanceGroupManager,
        json!({
            "description": "Managed Instance Group for Bastion in vSensor Quickstart.",
            "project": env.project,
            "distributionPolicy": distribution_policy(&env.project, &global.zone1, &global.zone2),
            "region": global.region,
            "targetSize": 1,
            "baseInstanceName": format!("{}-vm", env.name),
            "instanceTemplate": template_ref,
            "updatePolicy": {"type": "PROACTIVE"},
        }),
    )
    .depends_on_ref(&template_ref)
}

fn instance_template(inputs: &BastionInputs, names: &BastionNames, email: &Ref) -> ResourceNode {
    let subnet = Ref::self_link(&names.subnet);
    ResourceNode::new(
        &names.instance_template,
        ResourceKind::InstanceTemplate,
        json!({
            "properties": {
                "tags": {"items": [BASTION_TAG]},
                "machineType": BASTION_MACHINE_TYPE,
                "disks": [boot_disk(10, "pd-standard", None)],
                "networkInterfaces": [{
                    "network": inputs.vpc_ref,
                    "subnetwork": subnet,
                    "accessConfigs": [{
                        "name": "External NAT",
                        "type": "ONE_TO_ONE_NAT",
                        "networkTier": "PREMIUM",
                    }],
                }],
                "serviceAccounts": [{
                    "email": email,
                    "scopes": [CLOUD_PLATFORM_SCOPE],
                }],
                "metadata": instance_metadata(
                    bastion_startup_script(),
                    inputs.global.bastion_ssh_user_key(),
                ),
            }
        }),
    )
    .depends_on_ref(&inputs.vpc_ref)
    .depends_on_ref(&subnet)
    .depends_on_ref(email)
}
