// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for vsensor-quickstart
//!
//! Provides deterministic property sets for deployment generation tests.
//!
//! # Design Principles
//! - All test data is fixed constants; generation must be reproducible
//! - Fixtures are the only place that writes property sets
//! - Feature combinations come from [`feature_matrix`], never ad hoc toggles

#![allow(dead_code)]

use vsensor_quickstart::{Environment, GlobalProperties};

pub const DEPLOYMENT: &str = "demo";
pub const PROJECT: &str = "demo-project";

pub const SENSOR_SUBNET_CIDR: &str = "10.0.0.0/24";
pub const SENSOR_FRONTEND_IP: &str = "10.0.0.253";
pub const BASTION_SUBNET_CIDR: &str = "10.0.1.0/24";
pub const BASTION_EXTERNAL_CIDR: &str = "203.0.113.0/24";
pub const OSSENSOR_HMAC: &str = "hmac-secret";

/// Property set with only required keys: capture storage on, nothing optional
pub const BASE_PROPERTIES: &str = r#"
region: europe-west2
zone1: europe-west2-a
zone2: europe-west2-b
mig-subnet-cidr: 10.0.0.0/24
mig-min-size: 1
mig-max-size: 5
mig-instance-type: e2-standard-2
vsensor-update-key: update-key
appliance-push-token: push-token
appliance-hostname: appliance.example.com
appliance-port: 443
pcap-retention-time-days: 7
"#;

/// Property set with every optional feature on
pub const FULL_PROPERTIES: &str = r#"
region: europe-west2
zone1: europe-west2-a
zone2: europe-west2-b
mig-subnet-cidr: 10.0.0.0/24
ipv6-enable: true
mig-min-size: 2
mig-max-size: 8
mig-instance-type: e2-standard-4
vsensor-update-key: update-key
appliance-push-token: push-token
appliance-hostname: appliance.example.com
appliance-port: 8443
ossensor-hmac: hmac-secret
mig-ssh-user-key: "admin:ssh-ed25519 AAAAfleet"
pcap-retention-time-days: 30
bastion-enable: true
bastion-subnet-cidr: 10.0.1.0/24
bastion-external-cidr: 203.0.113.0/24
bastion-ssh-user-key: "admin:ssh-ed25519 AAAAbastion"
subnets-to-mirror: "web, db,,web"
"#;

/// Top-level environment of the fixture deployment
pub fn environment() -> Environment {
    Environment::new(DEPLOYMENT, PROJECT)
}

/// Parse the base property set
pub fn base_properties() -> GlobalProperties {
    GlobalProperties::from_yaml_str(BASE_PROPERTIES).expect("Invalid base property fixture")
}

/// Parse the full property set
pub fn full_properties() -> GlobalProperties {
    GlobalProperties::from_yaml_str(FULL_PROPERTIES).expect("Invalid full property fixture")
}

/// Optional features toggled by the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    pub pcap: bool,
    pub bastion: bool,
    pub hmac: bool,
    pub ipv6: bool,
    pub existing_vpc: bool,
}

impl Toggles {
    /// Apply the toggles to the base property set
    pub fn properties(&self) -> GlobalProperties {
        let mut props = base_properties();
        props.pcap_retention_time_days = if self.pcap { 7 } else { 0 };
        props.ipv6_enable = self.ipv6;
        if self.bastion {
            props.bastion_enable = true;
            props.bastion_subnet_cidr = Some(BASTION_SUBNET_CIDR.to_string());
            props.bastion_external_cidr = Some(BASTION_EXTERNAL_CIDR.to_string());
            props.subnets_to_mirror = "web".to_string();
        }
        if self.hmac {
            props.ossensor_hmac = Some(OSSENSOR_HMAC.to_string());
        }
        if self.existing_vpc {
            props.existing_vpc_name = Some("corp-vpc".to_string());
        }
        props
    }
}

/// Every combination of optional features
pub fn feature_matrix() -> Vec<Toggles> {
    let mut matrix = Vec::new();
    for bits in 0u8..32 {
        matrix.push(Toggles {
            pcap: bits & 1 != 0,
            bastion: bits & 2 != 0,
            hmac: bits & 4 != 0,
            ipv6: bits & 8 != 0,
            existing_vpc: bits & 16 != 0,
        });
    }
    matrix
}
