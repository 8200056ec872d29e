// Copyright (c) 2025 - Cowboy AI, Inc.
//! Darktrace vSensor quickstart deployment generator
//!
//! Turns a deployment property set into the declarative resource graph a
//! cloud deployment runtime applies: network, autoscaled sensor fleet,
//! capture storage, optional bastion, and the load balancer with its packet
//! mirroring policies.
//!
//! Generation is pure. Cross-resource values are symbolic refs the runtime
//! resolves after generation, and every dependency a node needs is declared
//! on the node.
//!
//! ```no_run
//! use vsensor_quickstart::{deployment, Environment, GlobalProperties};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let props = GlobalProperties::from_yaml_str(&std::fs::read_to_string("quickstart.yaml")?)?;
//! let graph = deployment::generate(&Environment::new("prod-sensors", "my-project"), &props)?;
//! println!("{}", graph.to_yaml()?);
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod deployment;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod templates;

// Re-export commonly used types
pub use deployment::{generate, DeploymentNames, DeploymentResource};
pub use domain::{Environment, Features, GlobalProperties, Ref, ResourceKind, TemplateKind};
pub use errors::{QuickstartError, QuickstartResult};
pub use graph::{DependencyAudit, DeploymentGraph, Fragment, OutputMap, OutputValue, ResourceNode};
