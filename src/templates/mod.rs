// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Template Generators
//!
//! Each template is a pure function from its inputs (the shared property set
//! plus refs to upstream outputs) to a [`Fragment`]. Every template first
//! plans which resources it emits from [`Features`](crate::domain::Features),
//! then builds one payload per planned resource.
//!
//! Inputs are serialized into the template instance node exactly as the host
//! runtime receives them, so a node records what its expansion was built from.

pub mod autoscaled_group;
pub mod bastion;
pub mod load_balancer;
pub mod network;
pub mod storage;

use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::{compute_url, Environment, Ref, ResourceKind, TemplateKind};
use crate::errors::QuickstartResult;
use crate::graph::{Fragment, ResourceNode};

pub use autoscaled_group::{AutoscaledGroup, FleetInputs, FleetResource};
pub use bastion::{Bastion, BastionInputs, BastionResource};
pub use load_balancer::{LoadBalancer, LoadBalancerInputs, LoadBalancerResource};
pub use network::{Network, NetworkInputs, NetworkResource};
pub use storage::{Storage, StorageInputs, StorageResource};

/// Boot image of every instance
pub const UBUNTU_IMAGE_PATH: &str = "projects/ubuntu-os-cloud/global/images/family/ubuntu-2004-lts";

/// OAuth scope granted to instance service accounts
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Network tag selecting instances that receive mirrored traffic
pub const MIRRORING_TAG: &str = "darktrace-vsensor-mirroring";

/// Network tag selecting instances reachable over IAP SSH
pub const SSH_IAP_TAG: &str = "darktrace-ssh-iap";

/// Composite template generator
pub trait Template {
    /// Properties of the template instance
    type Inputs: Serialize;

    /// Type tag of the template instance node
    const KIND: TemplateKind;

    /// Generate the expansion of one template instance
    fn generate(env: &Environment, inputs: &Self::Inputs) -> QuickstartResult<Fragment>;
}

/// Generate template `T` as a node named `name` carrying its inputs and expansion
pub fn instantiate<T: Template>(
    env: &Environment,
    name: &str,
    inputs: &T::Inputs,
) -> QuickstartResult<ResourceNode> {
    let expansion = T::generate(&env.for_template(name), inputs)?;
    let properties = serde_json::to_value(inputs)?;
    Ok(ResourceNode::new(name, ResourceKind::Template(T::KIND), properties)
        .with_expansion(expansion))
}

/// Service account node
pub(crate) fn service_account(
    account_id: &str,
    display_name: &str,
    description: &str,
) -> ResourceNode {
    ResourceNode::new(
        account_id,
        ResourceKind::ServiceAccount,
        json!({
            "accountId": account_id,
            "displayName": display_name,
            "description": description,
        }),
    )
}

/// One project-level IAM member binding per role for the account behind `email`
///
/// Nodes are named `<base>-iam-<n>`, counting from 1 in role order.
pub(crate) fn iam_member_bindings(
    base: &str,
    project: &str,
    email: &Ref,
    roles: &[&str],
) -> Vec<ResourceNode> {
    roles
        .iter()
        .enumerate()
        .map(|(i, role)| {
            ResourceNode::new(
                format!("{base}-iam-{}", i + 1),
                ResourceKind::IamMemberBinding,
                json!({
                    "resource": project,
                    "role": role,
                    "member": format!("serviceAccount:{email}"),
                }),
            )
            .depends_on_ref(email)
        })
        .collect()
}

/// Boot disk of an instance template
pub(crate) fn boot_disk(size_gb: u32, disk_type: &str, labels: Option<Value>) -> Value {
    let mut initialize = json!({
        "sourceImage": compute_url(None, UBUNTU_IMAGE_PATH),
        "diskSizeGb": size_gb,
        "diskType": disk_type,
    });
    if let Some(labels) = labels {
        initialize["labels"] = labels;
    }
    json!({
        "deviceName": "boot",
        "type": "PERSISTENT",
        "boot": true,
        "autoDelete": true,
        "initializeParams": initialize,
    })
}

/// Subnet and interface stack type
pub(crate) fn stack_type(ipv6: bool) -> &'static str {
    if ipv6 {
        "IPV4_IPV6"
    } else {
        "IPV4_ONLY"
    }
}

/// Zone distribution policy over the two configured zones
pub(crate) fn distribution_policy(project: &str, zone1: &str, zone2: &str) -> Value {
    json!({
        "zones": [
            {"zone": compute_url(Some(project), &format!("zones/{zone1}"))},
            {"zone": compute_url(Some(project), &format!("zones/{zone2}"))},
        ]
    })
}
