// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Domain Models
//!
//! Value objects and pure functions the templates are built from.
//!
//! # Value Objects with Invariants
//!
//! - [`Ref`] / [`ResourceLink`] - Symbolic and external resource addresses
//! - [`SubnetCidr`] - IPv4 subnet without host bits
//! - [`DeploymentIdentity`] - Deployment name and its short hash
//! - [`GlobalProperties`] - User-supplied property set
//! - [`Features`] - Optional features decided once per deployment
//! - [`ResourceKind`] - Host runtime type tags
//!
//! # Pure Derivations
//!
//! - [`nearest_storage_location`] - Compute region to storage location
//! - [`select_ingest_frontend_ip`] - Frontend address inside the sensor subnet
//! - [`validate_deployment`] - All deployment rules, violations collected

pub mod features;
pub mod identity;
pub mod invariants;
pub mod network;
pub mod properties;
pub mod reference;
pub mod region;
pub mod resource_type;

pub use features::Features;
pub use identity::{service_account_id, DeploymentHash, DeploymentIdentity};
pub use invariants::{validate_deployment, ValidationError, ValidationReport, ValidationResult};
pub use network::{select_ingest_frontend_ip, NetworkError, SubnetCidr};
pub use properties::{Environment, GlobalProperties, PropertyError};
pub use reference::{
    compute_url, external_link, global_compute_link, region_compute_link, LinkScope, Ref,
    ResourceLink,
};
pub use region::nearest_storage_location;
pub use resource_type::{ResourceKind, TemplateKind};
