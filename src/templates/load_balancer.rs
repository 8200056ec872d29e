// Copyright (c) 2025 - Cowboy AI, Inc.
//! Load Balancer and Mirroring Template
//!
//! An internal TCP backend over the fleet's instance group fronted by:
//!
//! - an all-ports forwarding rule acting as the packet mirroring collector
//! - an optional port 443 forwarding rule on a fixed address for direct
//!   osSensor registration (only when an HMAC secret is configured)
//!
//! plus one `mirror-<subnet>` policy per mirrored subnet. The bastion subnet
//! is mirrored whenever the bastion is deployed.

use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::Template;
use crate::domain::{
    region_compute_link, select_ingest_frontend_ip, Environment, Features, GlobalProperties, Ref,
    ResourceKind, ResourceLink, TemplateKind,
};
use crate::errors::QuickstartResult;
use crate::graph::{Fragment, OutputMap, ResourceNode};

/// Traffic selected by every mirroring policy: all addresses, all protocols
pub const MIRROR_CIDR_RANGES: [&str; 2] = ["0.0.0.0/0", "::/0"];

/// Port of the osSensor registration frontend
pub const OSSENSOR_PORT: &str = "443";

/// Inputs of the load balancer template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoadBalancerInputs {
    pub vpc_ref: Ref,
    pub mig_ig_ref: Ref,
    pub mig_subnet_ref: Ref,
    /// Name of the generated bastion subnet, when the bastion is deployed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bastion_subnet_name: Option<String>,
    pub mirrored_subnet_names: Vec<String>,
    /// Subnets created elsewhere in this graph, addressed by ref when mirrored
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub generated_subnet_names: Vec<String>,
    pub healthcheck_name: String,
    pub global: GlobalProperties,
}

/// Resources the load balancer template can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalancerResource {
    Backend,
    MirrorCollector,
    OsSensorFrontend,
    /// One policy per mirrored subnet, possibly none
    MirrorPolicies,
}

impl LoadBalancerResource {
    /// Resources emitted under `features`, in emission order
    pub fn planned(features: &Features) -> Vec<Self> {
        let mut plan = vec![Self::Backend, Self::MirrorCollector];
        if features.ossensor_ingest {
            plan.push(Self::OsSensorFrontend);
        }
        plan.push(Self::MirrorPolicies);
        plan
    }
}

/// A subnet whose traffic is mirrored to the collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSource {
    /// Subnet name, used to name the policy
    pub subnet_name: String,
    /// Address of the subnet
    pub link: ResourceLink,
    /// Node of this deployment that creates the subnet, if any
    pub created_by: Option<String>,
}

impl MirrorSource {
    /// Name of the mirroring policy for this subnet
    pub fn policy_name(&self) -> String {
        format!("mirror-{}", self.subnet_name)
    }
}

/// Mirrored subnets in policy order: the bastion subnet first, then the
/// user-listed ones, without repeats
///
/// A listed subnet that this graph generates resolves to its `selfLink` ref;
/// every other subnet resolves to its fully-qualified regional link.
pub fn mirror_sources(env: &Environment, inputs: &LoadBalancerInputs) -> Vec<MirrorSource> {
    let region = &inputs.global.region;
    let link = |name: &str| {
        ResourceLink::External(region_compute_link(&env.project, "subnetworks", name, region))
    };

    let mut sources: Vec<MirrorSource> = Vec::new();
    if let Some(bastion) = &inputs.bastion_subnet_name {
        sources.push(MirrorSource {
            subnet_name: bastion.clone(),
            link: link(bastion),
            created_by: Some(bastion.clone()),
        });
    }
    for name in &inputs.mirrored_subnet_names {
        if sources.iter().any(|s| &s.subnet_name == name) {
            warn!(subnet = %name, "subnet already mirrored, skipping repeat");
            continue;
        }
        let link = if inputs.generated_subnet_names.contains(name) {
            ResourceLink::Ref(Ref::self_link(name))
        } else {
            link(name)
        };
        sources.push(MirrorSource {
            subnet_name: name.clone(),
            link,
            created_by: None,
        });
    }
    sources
}

/// Load balancer template generator
pub struct LoadBalancer;

impl Template for LoadBalancer {
    type Inputs = LoadBalancerInputs;
    const KIND: TemplateKind = TemplateKind::LoadBalancer;

    fn generate(env: &Environment, inputs: &LoadBalancerInputs) -> QuickstartResult<Fragment> {
        let features = Features::from_properties(&inputs.global);
        let backend = Ref::self_link(format!("{}-lb-backend", env.name));
        let collector = Ref::self_link(format!("{}-packet-mirror-collector", env.name));
        let frontend = format!("{}-lb-ossensor", env.name);

        let mut resources = Vec::new();
        for resource in LoadBalancerResource::planned(&features) {
            match resource {
                LoadBalancerResource::Backend => {
                    resources.push(backend_service(inputs, backend.resource()))
                }
                LoadBalancerResource::MirrorCollector => {
                    resources.push(mirror_collector(inputs, collector.resource(), &backend))
                }
                LoadBalancerResource::OsSensorFrontend => {
                    resources.push(ossensor_frontend(inputs, &frontend, &backend)?)
                }
                LoadBalancerResource::MirrorPolicies => {
                    resources.extend(mirror_sources(env, inputs).iter().map(|source| {
                        mirror_policy(env, &inputs.global, &inputs.vpc_ref, &collector, source)
                    }))
                }
            }
        }

        debug!(
            template = %env.name,
            resources = resources.len(),
            ossensor_ingest = features.ossensor_ingest,
            "generated load balancer template"
        );

        let mut outputs = OutputMap::new();
        if features.ossensor_ingest {
            outputs.insert("ossensor-loadbalancer-ip", Ref::new(&frontend, "IPAddress"));
        }

        Ok(Fragment::new(resources, outputs))
    }
}

fn backend_service(inputs: &LoadBalancerInputs, name: &str) -> ResourceNode {
    let health_check = Ref::self_link(&inputs.healthcheck_name);
    ResourceNode::new(
        name,
        ResourceKind::RegionBackendService,
        json!({
            "description": "TCP Load Balancer for accepting Packet Mirroring",
            "backends": [{"description": "TCP Backend", "group": inputs.mig_ig_ref}],
            "healthChecks": [health_check],
            "region": inputs.global.region,
            "loadBalancingScheme": "INTERNAL",
            "network": inputs.vpc_ref,
            "connectionDraining": {"drainingTimeoutSec": 300},
        }),
    )
    .depends_on_ref(&health_check)
    .depends_on_ref(&inputs.mig_ig_ref)
    .depends_on_ref(&inputs.vpc_ref)
}

fn mirror_collector(inputs: &LoadBalancerInputs, name: &str, backend: &Ref) -> ResourceNode {
    ResourceNode::new(
        name,
        ResourceKind::ForwardingRule,
        json!({
            "description": "Front end forwarding config for vSensor Packet Mirroring",
            "IPProtocol": "TCP",
            "allPorts": true,
            "loadBalancingScheme": "INTERNAL",
            "subnetwork": inputs.mig_subnet_ref,
            "region": inputs.global.region,
            "backendService": backend,
            "ipVersion": "IPV4",
            "allowGlobalAccess": false,
            "isMirroringCollector": true,
        }),
    )
    .depends_on_ref(backend)
    .depends_on_ref(&inputs.mig_subnet_ref)
}

fn ossensor_frontend(
    inputs: &LoadBalancerInputs,
    name: &str,
    backend: &Ref,
) -> QuickstartResult<ResourceNode> {
    let address = select_ingest_frontend_ip(&inputs.global.mig_subnet_cidr)?;
    Ok(ResourceNode::new(
        name,
        ResourceKind::ForwardingRule,
        json!({
            "description": "Front end forwarding config for vSensor to allow osSensor registrations.",
            "IPProtocol": "TCP",
            "IPAddress": address.to_string(),
            "ports": [OSSENSOR_PORT],
            "loadBalancingScheme": "INTERNAL",
            "subnetwork": inputs.mig_subnet_ref,
            "region": inputs.global.region,
            "backendService": backend,
            "ipVersion": "IPV4",
            "allowGlobalAccess": false,
            "isMirroringCollector": false,
        }),
    )
    .depends_on_ref(backend)
    .depends_on_ref(&inputs.mig_subnet_ref))
}

fn mirror_policy(
    env: &Environment,
    global: &GlobalProperties,
    network: &Ref,
    collector: &Ref,
    source: &MirrorSource,
) -> ResourceNode {
    let name = source.policy_name();
    let description = format!("Packet mirroring policy for subnetwork: {}", source.subnet_name);
    let mut node = ResourceNode::new(
        &name,
        ResourceKind::PacketMirroring,
        json!({
            "description": description,
            "network": {"url": network},
            "name": name,
            "region": global.region,
            "projectId": env.project,
            "collectorIlb": {"url": collector},
            "mirroredResources": {"subnetworks": [{"url": source.link}]},
            "filter": {
                "cidrRanges": MIRROR_CIDR_RANGES,
                "IPProtocols": [],
                "direction": "BOTH",
            },
        }),
    )
    .depends_on_ref(network)
    .depends_on_ref(collector)
    .depends_on_link(&source.link);

    if let Some(creator) = &source.created_by {
        node = node.depends_on(creator.clone());
    }
    node
}
