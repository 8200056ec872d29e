// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Deployment Invariants
//!
//! Every rule is a small pure function returning a [`ValidationResult`].
//! [`validate_deployment`] runs all of them and collects every violation
//! into one [`ValidationReport`], so an operator sees the complete list of
//! problems instead of fixing them one run at a time.
//!
//! # Rules
//!
//! 1. Deployment name is at most 40 characters
//! 2. Fleet minimum size does not exceed the maximum
//! 3. A bastion needs both its subnet and its external-access CIDR
//! 4. The sensor subnet is a valid IPv4 network of at least 8 addresses,
//!    so the ingest frontend address can always be allocated

use std::fmt;

use super::identity::MAX_DEPLOYMENT_NAME_LENGTH;
use super::{GlobalProperties, SubnetCidr};

/// Fewest addresses accepted for the sensor subnet (a /29)
pub const MIN_SENSOR_SUBNET_ADDRESSES: u64 = 8;

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// One violated deployment rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Deployment name is too long. Choose a name 40 characters or less.")]
    DeploymentNameTooLong { length: usize },

    #[error("vSensor Managed Instance Group size minimum is larger than the maximum.")]
    FleetSizeInverted { min: u32, max: u32 },

    #[error("Bastion subnet and external IP CIDRs are required if bastion-enable is True.")]
    BastionCidrsMissing,

    #[error("vSensor subnet CIDR {cidr} is invalid: {reason}")]
    InvalidSensorSubnet { cidr: String, reason: String },
}

/// Every violation found in one validation pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Record the outcome of one rule
    pub fn record(&mut self, result: ValidationResult) {
        if let Err(err) = result {
            self.errors.push(err);
        }
    }

    /// Violations in rule order
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Whether no rule was violated
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn the report into a result
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The deployment configuration has not passed validation:")?;
        for err in &self.errors {
            write!(f, "\n    - {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

impl From<ValidationError> for ValidationReport {
    fn from(err: ValidationError) -> Self {
        Self { errors: vec![err] }
    }
}

/// Validate the deployment name length
pub fn validate_deployment_name(name: &str) -> ValidationResult {
    let length = name.chars().count();
    if length > MAX_DEPLOYMENT_NAME_LENGTH {
        return Err(ValidationError::DeploymentNameTooLong { length });
    }
    Ok(())
}

/// Validate the autoscaler bounds
pub fn validate_fleet_size(min: u32, max: u32) -> ValidationResult {
    if min > max {
        return Err(ValidationError::FleetSizeInverted { min, max });
    }
    Ok(())
}

/// Validate that an enabled bastion has both of its CIDRs
pub fn validate_bastion(
    enabled: bool,
    subnet_cidr: Option<&str>,
    external_cidr: Option<&str>,
) -> ValidationResult {
    if enabled && (subnet_cidr.is_none() || external_cidr.is_none()) {
        return Err(ValidationError::BastionCidrsMissing);
    }
    Ok(())
}

/// Validate the sensor subnet is large enough for frontend allocation
pub fn validate_sensor_subnet(cidr: &str) -> ValidationResult {
    let subnet = SubnetCidr::new(cidr).map_err(|e| ValidationError::InvalidSensorSubnet {
        cidr: cidr.to_string(),
        reason: e.to_string(),
    })?;

    if subnet.address_count() < MIN_SENSOR_SUBNET_ADDRESSES {
        return Err(ValidationError::InvalidSensorSubnet {
            cidr: cidr.to_string(),
            reason: format!(
                "subnet has {} addresses, at least {} are required",
                subnet.address_count(),
                MIN_SENSOR_SUBNET_ADDRESSES
            ),
        });
    }
    Ok(())
}

/// Run every deployment rule and collect all violations
pub fn validate_deployment(
    deployment_name: &str,
    props: &GlobalProperties,
) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();

    report.record(validate_deployment_name(deployment_name));
    report.record(validate_fleet_size(props.mig_min_size, props.mig_max_size));
    report.record(validate_bastion(
        props.bastion_enable,
        props.bastion_subnet_cidr.as_deref(),
        props.bastion_external_cidr.as_deref(),
    ));
    report.record(validate_sensor_subnet(&props.mig_subnet_cidr));

    report.into_result()
}
