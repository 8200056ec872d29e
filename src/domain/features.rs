// Copyright (c) 2025 - Cowboy AI, Inc.
//! Feature Flags
//!
//! Every optional part of a deployment is decided once, here, from the
//! property set. Templates consume [`Features`] to plan which resources they
//! emit, so "which resources exist under which flags" can be tested without
//! generating any payloads.

use serde::Serialize;

use super::GlobalProperties;

/// Optional features of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Features {
    /// Dual-stack networking
    pub ipv6: bool,
    /// Network is supplied by the user and must not be emitted
    pub existing_vpc: bool,
    /// Bastion host and its public subnet
    pub bastion: bool,
    /// HMAC-authenticated direct osSensor ingestion frontend
    pub ossensor_ingest: bool,
    /// Capture upload to the storage bucket (retention > 0)
    pub pcap_storage: bool,
}

impl Features {
    /// Derive the feature set from a property set
    pub fn from_properties(props: &GlobalProperties) -> Self {
        Self {
            ipv6: props.ipv6_enable,
            existing_vpc: props.existing_vpc_name().is_some(),
            bastion: props.bastion_enable,
            ossensor_ingest: props.ossensor_hmac().is_some(),
            pcap_storage: props.pcap_retention_time_days > 0,
        }
    }
}
