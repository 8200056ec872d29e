// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Type Tags
//!
//! The `type` of every node in the graph is part of the host runtime's fixed
//! contract. Primitive kinds name a platform resource type; template kinds
//! name a composite template whose expansion is carried inside the node.

use serde::{Serialize, Serializer};
use std::fmt;

/// Composite templates produced by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Network, subnet, firewall rules, NAT
    Network,
    /// Capture storage bucket and role
    Storage,
    /// Sensor instance template, instance group, autoscaler
    AutoscaledGroup,
    /// Optional bastion host
    Bastion,
    /// Backend, forwarding rules and mirroring policies
    LoadBalancer,
}

impl TemplateKind {
    /// Template file name understood by the host runtime
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network.py",
            Self::Storage => "storage.py",
            Self::AutoscaledGroup => "autoscaledgroup.py",
            Self::Bastion => "bastion.py",
            Self::LoadBalancer => "loadbalancer.py",
        }
    }
}

/// Resource type taxonomy of the generated graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    // Network
    /// VPC network
    Network,
    /// Regional subnetwork
    Subnetwork,
    /// Firewall rule
    Firewall,
    /// Static address
    Address,
    /// Cloud router with NAT
    Router,
    /// Static route
    Route,

    // Compute
    /// Instance template
    InstanceTemplate,
    /// Regional managed instance group (beta API, supports `minReadySec`)
    RegionInstanceGroupManagerBeta,
    /// Regional managed instance group
    RegionInstanceGroupManager,
    /// Regional autoscaler
    RegionAutoscaler,
    /// Health check
    HealthCheck,

    // Load balancing
    /// Internal regional backend service
    RegionBackendService,
    /// Forwarding rule
    ForwardingRule,
    /// Packet mirroring policy
    PacketMirroring,

    // Identity
    /// Service account
    ServiceAccount,
    /// Project-level IAM member binding
    IamMemberBinding,
    /// Custom project role
    ProjectRole,

    // Storage
    /// Storage bucket
    Bucket,

    /// Composite template instance
    Template(TemplateKind),
}

impl ResourceKind {
    /// Get the type tag understood by the host runtime
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "compute.v1.network",
            Self::Subnetwork => "compute.v1.subnetwork",
            Self::Firewall => "compute.v1.firewall",
            Self::Address => "compute.v1.address",
            Self::Router => "compute.v1.router",
            Self::Route => "compute.v1.routes",
            Self::InstanceTemplate => "compute.v1.instanceTemplate",
            Self::RegionInstanceGroupManagerBeta => "compute.beta.regionInstanceGroupManager",
            Self::RegionInstanceGroupManager => "compute.v1.regionInstanceGroupManager",
            Self::RegionAutoscaler => "compute.v1.regionAutoscaler",
            Self::HealthCheck => "compute.v1.healthCheck",
            Self::RegionBackendService => "compute.v1.regionBackendService",
            Self::ForwardingRule => "compute.v1.forwardingRule",
            Self::PacketMirroring => "gcp-types/compute-v1:packetMirrorings",
            Self::ServiceAccount => "iam.v1.serviceAccount",
            Self::IamMemberBinding => {
                "gcp-types/cloudresourcemanager-v1:virtual.projects.iamMemberBinding"
            }
            Self::ProjectRole => "gcp-types/iam-v1:projects.roles",
            Self::Bucket => "storage.v1.bucket",
            Self::Template(kind) => kind.as_str(),
        }
    }

    /// Whether this node is a composite template instance
    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template(_))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
