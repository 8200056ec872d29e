// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Template
//!
//! VPC (or reuse of an existing one), the private sensor subnet, SSH/IAP and
//! mirroring ingress firewalls, and a NAT router with a static external
//! address so sensors can reach the master appliance and package updates.
//!
//! An existing network is addressed by link and never emitted as a node: the
//! host runtime deletes every node it manages when the deployment is removed.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{stack_type, Template, MIRRORING_TAG, SSH_IAP_TAG};
use crate::domain::{
    global_compute_link, Environment, Features, GlobalProperties, Ref, ResourceKind, ResourceLink,
    TemplateKind,
};
use crate::errors::QuickstartResult;
use crate::graph::{Fragment, OutputMap, ResourceNode};

/// Source range of Identity-Aware Proxy TCP forwarding
pub const IAP_SOURCE_RANGE: &str = "35.235.240.0/20";

/// Inputs of the network template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInputs {
    pub global: GlobalProperties,
}

/// Resources the network template can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkResource {
    Vpc,
    SensorSubnet,
    SshIapFirewall,
    MirrorFirewallV4,
    NatAddress,
    NatRouter,
    Ipv6DefaultRoute,
    MirrorFirewallV6,
}

impl NetworkResource {
    /// Resources emitted under `features`, in emission order
    pub fn planned(features: &Features) -> Vec<Self> {
        let mut plan = Vec::new();
        if !features.existing_vpc {
            plan.push(Self::Vpc);
        }
        plan.extend([
            Self::SensorSubnet,
            Self::SshIapFirewall,
            Self::MirrorFirewallV4,
            Self::NatAddress,
            Self::NatRouter,
        ]);
        if features.ipv6 && !features.existing_vpc {
            plan.push(Self::Ipv6DefaultRoute);
        }
        if features.ipv6 {
            plan.push(Self::MirrorFirewallV6);
        }
        plan
    }
}

/// Network template generator
pub struct Network;

struct NetworkNames {
    vpc: String,
    subnet: String,
    nat_ip: String,
}

impl NetworkNames {
    fn new(template: &str, existing_vpc: Option<&str>) -> Self {
        Self {
            vpc: existing_vpc
                .map(str::to_string)
                .unwrap_or_else(|| format!("{template}-vpc")),
            subnet: format!("{template}-vsensor-subnet"),
            nat_ip: format!("{template}-nat-external-ip"),
        }
    }
}

impl Template for Network {
    type Inputs = NetworkInputs;
    const KIND: TemplateKind = TemplateKind::Network;

    fn generate(env: &Environment, inputs: &NetworkInputs) -> QuickstartResult<Fragment> {
        let global = &inputs.global;
        let features = Features::from_properties(global);
        let names = NetworkNames::new(&env.name, global.existing_vpc_name());

        let network_link: ResourceLink = match global.existing_vpc_name() {
            Some(existing) => {
                ResourceLink::External(global_compute_link(&env.project, "networks", existing))
            }
            None => Ref::self_link(&names.vpc).into(),
        };

        let resources: Vec<ResourceNode> = NetworkResource::planned(&features)
            .into_iter()
            .map(|resource| build(resource, env, global, &names, &network_link))
            .collect();

        debug!(
            template = %env.name,
            resources = resources.len(),
            existing_vpc = features.existing_vpc,
            ipv6 = features.ipv6,
            "generated network template"
        );

        let outputs = OutputMap::new()
            .with("vpc-name", names.vpc.clone())
            .with("vpc-ref", network_link)
            .with("subnet-name", names.subnet.clone())
            .with("subnet-ref", Ref::self_link(&names.subnet))
            .with("nat-ip", Ref::new(&names.nat_ip, "address"));

        Ok(Fragment::new(resources, outputs))
    }
}

fn build(
    resource: NetworkResource,
    env: &Environment,
    global: &GlobalProperties,
    names: &NetworkNames,
    network: &ResourceLink,
) -> ResourceNode {
    let name = &env.name;
    match resource {
        NetworkResource::Vpc => ResourceNode::new(
            &names.vpc,
            ResourceKind::Network,
            json!({
                "routingConfig": {"routingMode": "REGIONAL"},
                "autoCreateSubnetworks": false,
                "enableUlaInternalIpv6": global.ipv6_enable,
            }),
        ),
        NetworkResource::SensorSubnet => {
            let mut properties = json!({
                "description": "Subnet containing Darktrace vSensors. DO NOT apply Packet Mirroring to this subnet.",
                "network": network,
                "ipCidrRange": global.mig_subnet_cidr,
                "region": global.region,
                "privateIpGoogleAccess": true,
                "stackType": stack_type(global.ipv6_enable),
            });
            if global.ipv6_enable {
                properties["ipv6AccessType"] = json!("INTERNAL");
            }
            ResourceNode::new(&names.subnet, ResourceKind::Subnetwork, properties)
                .depends_on_link(network)
        }
        NetworkResource::SshIapFirewall => ResourceNode::new(
            format!("{name}-firewall-ssh-iap"),
            ResourceKind::Firewall,
            json!({
                "description": "vSensor Quickstart Firewall Policy for SSH-in-browser and IAP",
                "name": "Allow All Mirror Traffic",
                "priority": 1000,
                "network": network,
                "sourceRanges": [IAP_SOURCE_RANGE],
                "targetTags": [SSH_IAP_TAG],
                "logConfig": {"enable": false},
                "direction": "INGRESS",
                "allowed": [{"IPProtocol": "TCP", "ports": ["22"]}],
            }),
        )
        .depends_on_link(network),
        NetworkResource::MirrorFirewallV4 => mirror_firewall(
            format!("{name}-firewall-packet-mirror-ipv4"),
            "IPv4",
            "0.0.0.0/0",
            network,
        ),
        NetworkResource::MirrorFirewallV6 => mirror_firewall(
            format!("{name}-firewall-packet-mirror-ipv6"),
            "IPv6",
            "::/0",
            network,
        ),
        NetworkResource::NatAddress => ResourceNode::new(
            &names.nat_ip,
            ResourceKind::Address,
            json!({
                "description": "IP address used for NAT router to allow vSensors access to Appliance / software updates.",
                "addressType": "EXTERNAL",
                "networkTier": "PREMIUM",
                "region": global.region,
            }),
        ),
        NetworkResource::NatRouter => {
            let nat_ip = Ref::self_link(&names.nat_ip);
            ResourceNode::new(
                format!("{}-router", names.subnet),
                ResourceKind::Router,
                json!({
                    "description": "NAT Router for Darktrace vSensors to access internet.",
                    "network": network,
                    "ipCidrRange": global.mig_subnet_cidr,
                    "region": global.region,
                    "privateIpGoogleAccess": true,
                    "nats": [{
                        "name": format!("{}-nat", names.subnet),
                        "sourceSubnetworkIpRangesToNat": "ALL_SUBNETWORKS_ALL_IP_RANGES",
                        "natIpAllocateOption": "MANUAL_ONLY",
                        "natIps": [nat_ip],
                    }],
                }),
            )
            .depends_on_link(network)
            .depends_on_ref(&nat_ip)
        }
        NetworkResource::Ipv6DefaultRoute => ResourceNode::new(
            format!("{name}-ipv6-default-route"),
            ResourceKind::Route,
            json!({
                "description": "Default route for IPv6 enabled vSensor subnet.",
                "network": network,
                "nextHopGateway": global_compute_link(
                    &env.project,
                    "gateways",
                    "default-internet-gateway"
                ),
                "destRange": "::/0",
            }),
        )
        .depends_on_link(network),
    }
}

fn mirror_firewall(
    name: String,
    family: &str,
    source_range: &str,
    network: &ResourceLink,
) -> ResourceNode {
    ResourceNode::new(
        name,
        ResourceKind::Firewall,
        json!({
            "name": format!("vSensor Quickstart Packet Mirroring Firewall Policy ({family})"),
            "description": "Allow all packet mirror traffic to be ingested into the vSensors.",
            "priority": 1,
            "network": network,
            "sourceRanges": [source_range],
            "targetTags": [MIRRORING_TAG],
            "logConfig": {"enable": false},
            "direction": "INGRESS",
            "allowed": [{"IPProtocol": "all"}],
        }),
    )
    .depends_on_link(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DeploymentGraph;
    use pretty_assertions::assert_eq;

    fn global() -> GlobalProperties {
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

    fn generate(global: GlobalProperties) -> Fragment {
        let env = Environment::new("demo", "proj").for_template("demo-net");
        Network::generate(&env, &NetworkInputs { global }).unwrap()
    }

    fn names(fragment: &Fragment) -> Vec<&str> {
        fragment.resources.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_plan_by_features() {
        assert_eq!(NetworkResource::planned(&Features::default()).len(), 6);

        let dual_stack = Features {
            ipv6: true,
            ..Features::default()
        };
        let plan = NetworkResource::planned(&dual_stack);
        assert!(plan.contains(&NetworkResource::Ipv6DefaultRoute));
        assert!(plan.contains(&NetworkResource::MirrorFirewallV6));

        let existing_dual_stack = Features {
            ipv6: true,
            existing_vpc: true,
            ..Features::default()
        };
        let plan = NetworkResource::planned(&existing_dual_stack);
        assert!(!plan.contains(&NetworkResource::Vpc));
        assert!(!plan.contains(&NetworkResource::Ipv6DefaultRoute));
        assert!(plan.contains(&NetworkResource::MirrorFirewallV6));
    }

    #[test]
    fn test_generated_network() {
        let fragment = generate(global());
        assert_eq!(
            names(&fragment),
            vec![
                "demo-net-vpc",
                "demo-net-vsensor-subnet",
                "demo-net-firewall-ssh-iap",
                "demo-net-firewall-packet-mirror-ipv4",
                "demo-net-nat-external-ip",
                "demo-net-vsensor-subnet-router",
            ]
        );

        let subnet = fragment.resource("demo-net-vsensor-subnet").unwrap();
        assert_eq!(subnet.properties["network"], "$(ref.demo-net-vpc.selfLink)");
        assert_eq!(subnet.properties["stackType"], "IPV4_ONLY");
        assert!(subnet.properties.get("ipv6AccessType").is_none());

        let router = fragment.resource("demo-net-vsensor-subnet-router").unwrap();
        assert_eq!(
            router.properties["nats"][0]["natIps"][0],
            "$(ref.demo-net-nat-external-ip.selfLink)"
        );
        assert!(router.declares_dependency_on("demo-net-nat-external-ip"));

        assert_eq!(
            fragment.outputs.names(),
            vec!["vpc-name", "vpc-ref", "subnet-name", "subnet-ref", "nat-ip"]
        );
        assert_eq!(
            fragment.outputs.get("nat-ip").and_then(|v| v.as_ref_token()),
            Some(&Ref::new("demo-net-nat-external-ip", "address"))
        );
    }

    #[test]
    fn test_existing_network_is_linked_not_emitted() {
        let mut global = global();
        global.existing_vpc_name = Some("corp-vpc".to_string());
        global.ipv6_enable = true;
        let fragment = generate(global);

        assert!(fragment.resource("corp-vpc").is_none());
        assert!(fragment.resource("demo-net-ipv6-default-route").is_none());
        assert!(fragment.resource("demo-net-firewall-packet-mirror-ipv6").is_some());

        let link = "https://www.googleapis.com/compute/v1/projects/proj/global/networks/corp-vpc";
        let subnet = fragment.resource("demo-net-vsensor-subnet").unwrap();
        assert_eq!(subnet.properties["network"], link);
        assert!(subnet.depends_on.is_empty());
        assert_eq!(fragment.outputs.get("vpc-ref").and_then(|v| v.as_literal_str()), Some(link));
        assert_eq!(
            fragment.outputs.get("vpc-name").and_then(|v| v.as_literal_str()),
            Some("corp-vpc")
        );
    }

    #[test]
    fn test_dual_stack_network() {
        let mut global = global();
        global.ipv6_enable = true;
        let fragment = generate(global);

        let subnet = fragment.resource("demo-net-vsensor-subnet").unwrap();
        assert_eq!(subnet.properties["stackType"], "IPV4_IPV6");
        assert_eq!(subnet.properties["ipv6AccessType"], "INTERNAL");

        let route = fragment.resource("demo-net-ipv6-default-route").unwrap();
        assert_eq!(route.kind, ResourceKind::Route);
        assert_eq!(
            route.properties["nextHopGateway"],
            "https://www.googleapis.com/compute/v1/projects/proj/global/gateways/default-internet-gateway"
        );

        let vpc = fragment.resource("demo-net-vpc").unwrap();
        assert_eq!(vpc.properties["enableUlaInternalIpv6"], true);
    }

    #[test]
    fn test_every_embedded_ref_is_declared() {
        let mut global = global();
        global.ipv6_enable = true;
        let graph = DeploymentGraph {
            resources: generate(global).resources,
            outputs: OutputMap::new(),
        };
        assert!(graph.audit().is_clean(), "{}", graph.audit());
    }
}
