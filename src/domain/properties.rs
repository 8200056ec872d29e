// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Property Set
//!
//! The property set is the user-supplied configuration of a deployment. It
//! is read once, never mutated, and passed to every template as its `global`
//! property. Optional keys are modelled as `Option` so generators must probe
//! for presence rather than assume a value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Property set parsing error
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("Invalid YAML property set: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON property set: {0}")]
    Json(#[from] serde_json::Error),
}

/// Deployment-scoped configuration shared by every template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalProperties {
    /// Compute region for every regional resource
    pub region: String,

    /// First zone of the fleet distribution policy
    pub zone1: String,

    /// Second zone of the fleet distribution policy
    pub zone2: String,

    /// CIDR range of the sensor subnet
    pub mig_subnet_cidr: String,

    /// Reuse this network instead of creating one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_vpc_name: Option<String>,

    /// Dual-stack networking
    #[serde(default)]
    pub ipv6_enable: bool,

    /// Autoscaler lower bound
    pub mig_min_size: u32,

    /// Autoscaler upper bound
    pub mig_max_size: u32,

    /// Machine type of fleet instances
    pub mig_instance_type: String,

    /// Sensor package update key
    pub vsensor_update_key: String,

    /// Token used to register with the master appliance
    pub appliance_push_token: String,

    /// Master appliance hostname or address
    pub appliance_hostname: String,

    /// Master appliance port
    pub appliance_port: u16,

    /// HMAC secret enabling direct osSensor ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ossensor_hmac: Option<String>,

    /// Administrator `user:ssh-key` entry for fleet instances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mig_ssh_user_key: Option<String>,

    /// Capture retention in days; zero disables capture storage
    pub pcap_retention_time_days: u32,

    /// Deploy a bastion host
    #[serde(default)]
    pub bastion_enable: bool,

    /// CIDR range of the bastion subnet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bastion_subnet_cidr: Option<String>,

    /// External range allowed to reach the bastion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bastion_external_cidr: Option<String>,

    /// Administrator `user:ssh-key` entry for the bastion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bastion_ssh_user_key: Option<String>,

    /// Comma-separated names of existing subnets to mirror
    #[serde(default)]
    pub subnets_to_mirror: String,
}

impl GlobalProperties {
    /// Parse a YAML property set
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PropertyError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a JSON property set
    pub fn from_json_str(json: &str) -> Result<Self, PropertyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// HMAC secret, if one was supplied and is non-empty
    pub fn ossensor_hmac(&self) -> Option<&str> {
        non_empty(self.ossensor_hmac.as_deref())
    }

    /// Existing network name, if one was supplied and is non-empty
    pub fn existing_vpc_name(&self) -> Option<&str> {
        non_empty(self.existing_vpc_name.as_deref())
    }

    /// Fleet SSH key entry, if supplied
    pub fn mig_ssh_user_key(&self) -> Option<&str> {
        non_empty(self.mig_ssh_user_key.as_deref())
    }

    /// Bastion SSH key entry, if supplied
    pub fn bastion_ssh_user_key(&self) -> Option<&str> {
        non_empty(self.bastion_ssh_user_key.as_deref())
    }

    /// Existing subnets to mirror: trimmed, empties dropped, first occurrence kept
    pub fn mirrored_subnet_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.subnets_to_mirror.split(',').map(str::trim) {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Environment record supplied by the host runtime for one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Deployment name
    pub deployment: String,
    /// Enclosing project id
    pub project: String,
    /// Name of the resource (template instance) being generated
    pub name: String,
}

impl Environment {
    /// Environment of the top-level deployment
    pub fn new(deployment: impl Into<String>, project: impl Into<String>) -> Self {
        let deployment = deployment.into();
        Self {
            name: deployment.clone(),
            deployment,
            project: project.into(),
        }
    }

    /// Environment of a nested template named `name`
    pub fn for_template(&self, name: impl Into<String>) -> Self {
        Self {
            deployment: self.deployment.clone(),
            project: self.project.clone(),
            name: name.into(),
        }
    }
}
