// Copyright (c) 2025 - Cowboy AI, Inc.
//! Autoscaled Fleet Template
//!
//! Instance template, regional managed instance group over two zones and a
//! CPU-driven autoscaler. The group starts at one instance: the first sensor
//! performs the one-time shared storage key setup before the autoscaler adds
//! more.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{
    boot_disk, distribution_policy, stack_type, Template, CLOUD_PLATFORM_SCOPE, MIRRORING_TAG,
    SSH_IAP_TAG,
};
use crate::bootstrap::{instance_metadata, OsSensorIngest, PcapUpload, SensorBootstrap};
use crate::domain::{
    select_ingest_frontend_ip, DeploymentHash, Environment, Features, GlobalProperties, Ref,
    ResourceKind, TemplateKind,
};
use crate::errors::QuickstartResult;
use crate::graph::{Fragment, OutputMap, ResourceNode};

/// Seconds a new instance must be healthy before the rollout continues
pub const MIN_READY_SEC: u32 = 180;

/// Grace period before auto-healing acts on a new instance
pub const AUTO_HEAL_INITIAL_DELAY_SEC: u32 = 300;

/// CPU utilisation the autoscaler aims for
pub const CPU_UTILIZATION_TARGET: f64 = 0.75;

/// Inputs of the autoscaled fleet template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FleetInputs {
    pub vpc_ref: Ref,
    pub subnet_ref: Ref,
    pub healthcheck_name: String,
    pub global: GlobalProperties,
    pub deployment_hash: DeploymentHash,
    pub service_account_email: Ref,
    /// Present only when capture storage is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcap_bucket_name: Option<Ref>,
}

/// Resources the fleet template emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetResource {
    InstanceGroup,
    Autoscaler,
    InstanceTemplate,
}

impl FleetResource {
    /// Resources emitted under `features`, in emission order
    ///
    /// Optional features only change the instance template payload.
    pub fn planned(_features: &Features) -> Vec<Self> {
        vec![Self::InstanceGroup, Self::Autoscaler, Self::InstanceTemplate]
    }
}

/// Autoscaled fleet template generator
pub struct AutoscaledGroup;

impl Template for AutoscaledGroup {
    type Inputs = FleetInputs;
    const KIND: TemplateKind = TemplateKind::AutoscaledGroup;

    fn generate(env: &Environment, inputs: &FleetInputs) -> QuickstartResult<Fragment> {
        let features = Features::from_properties(&inputs.global);
        let group = format!("{}-group", env.name);
        let instance_template = format!("{}-template", env.name);

        let mut resources = Vec::new();
        for resource in FleetResource::planned(&features) {
            let node = match resource {
                FleetResource::InstanceGroup => {
                    instance_group(env, inputs, &group, &instance_template)
                }
                FleetResource::Autoscaler => autoscaler(env, &inputs.global, &group),
                FleetResource::InstanceTemplate => {
                    sensor_instance_template(inputs, &features, &instance_template)?
                }
            };
            resources.push(node);
        }

        debug!(
            template = %env.name,
            resources = resources.len(),
            pcap_storage = features.pcap_storage,
            ossensor_ingest = features.ossensor_ingest,
            "generated autoscaled fleet template"
        );

        let outputs = OutputMap::new()
            .with("mig-name", group.clone())
            .with("mig-ref", Ref::self_link(&group))
            .with("mig-ig-ref", Ref::new(&group, "instanceGroup"));

        Ok(Fragment::new(resources, outputs))
    }
}

fn instance_group(
    env: &Environment,
    inputs: &FleetInputs,
    group: &str,
    instance_template: &str,
) -> ResourceNode {
    let global = &inputs.global;
    let template_ref = Ref::self_link(instance_template);
    let health_check = Ref::self_link(&inputs.healthcheck_name);

    ResourceNode::new(
        group,
        ResourceKind::RegionInstanceGroupManagerBeta,
        json!({
            "description": "Managed Instance Group for Darktrace vSensor.",
            "project": env.project,
            "distributionPolicy": distribution_policy(&env.project, &global.zone1, &global.zone2),
            "region": global.region,
            "targetSize": 1,
            "baseInstanceName": format!("{}-vsensor", env.name),
            "instanceTemplate": template_ref,
            "updatePolicy": {
                "type": "PROACTIVE",
                "minimalAction": "REPLACE",
                "minReadySec": MIN_READY_SEC,
            },
            "autoHealingPolicies": [
                {"healthCheck": health_check, "initialDelaySec": AUTO_HEAL_INITIAL_DELAY_SEC}
            ],
        }),
    )
    .depends_on_ref(&health_check)
    .depends_on_ref(&template_ref)
}

fn autoscaler(env: &Environment, global: &GlobalProperties, group: &str) -> ResourceNode {
    let target = Ref::self_link(group);
    ResourceNode::new(
        format!("{}-autoscale", env.name),
        ResourceKind::RegionAutoscaler,
        json!({
            "region": global.region,
            "description": "Managed Instance Group for Darktrace vSensor.",
            "target": target,
            "autoscalingPolicy": {
                "minNumReplicas": global.mig_min_size,
                "maxNumReplicas": global.mig_max_size,
                "scaleDownControl": {
                    "maxScaledDownReplicas": {"fixed": 1},
                    "timeWindowSec": 600,
                },
                "coolDownPeriodSec": 300,
                "cpuUtilization": {
                    "utilizationTarget": CPU_UTILIZATION_TARGET,
                    "predictiveMethod": "OPTIMIZE_AVAILABILITY",
                },
            },
        }),
    )
    .depends_on_ref(&target)
}

fn sensor_instance_template(
    inputs: &FleetInputs,
    features: &Features,
    name: &str,
) -> QuickstartResult<ResourceNode> {
    let global = &inputs.global;

    let ossensor = match global.ossensor_hmac() {
        Some(hmac) => Some(OsSensorIngest {
            hmac: hmac.to_string(),
            frontend_ip: select_ingest_frontend_ip(&global.mig_subnet_cidr)?,
        }),
        None => None,
    };
    let pcap_bucket = inputs
        .pcap_bucket_name
        .as_ref()
        .filter(|_| features.pcap_storage);
    let bootstrap = SensorBootstrap {
        update_key: global.vsensor_update_key.clone(),
        push_token: global.appliance_push_token.clone(),
        appliance_hostname: global.appliance_hostname.clone(),
        appliance_port: global.appliance_port,
        ossensor,
        pcap_upload: pcap_bucket.map(|bucket| PcapUpload {
            bucket_name: bucket.clone(),
            service_account_email: inputs.service_account_email.clone(),
        }),
    };

    let mut node = ResourceNode::new(
        name,
        ResourceKind::InstanceTemplate,
        json!({
            "properties": {
                "machineType": global.mig_instance_type,
                "tags": {"items": [MIRRORING_TAG, SSH_IAP_TAG]},
                "disks": [boot_disk(20, "pd-balanced", Some(json!({"darktrace-vsensor": "true"})))],
                "networkInterfaces": [{
                    "network": inputs.vpc_ref,
                    "subnetwork": inputs.subnet_ref,
                    "stackType": stack_type(global.ipv6_enable),
                }],
                "canIpForward": true,
                "serviceAccounts": [{
                    "email": inputs.service_account_email,
                    "scopes": [CLOUD_PLATFORM_SCOPE],
                }],
                "metadata": instance_metadata(bootstrap.render(), global.mig_ssh_user_key()),
            }
        }),
    )
    .depends_on_ref(&inputs.vpc_ref)
    .depends_on_ref(&inputs.subnet_ref)
    .depends_on_ref(&inputs.service_account_email);

    // The bucket name only appears inside the startup script.
    if let Some(bucket) = pcap_bucket {
        node = node.depends_on(bucket.to_string());
    }
    Ok(node)
}
