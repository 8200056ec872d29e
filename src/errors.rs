// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for deployment generation

use thiserror::Error;

use crate::domain::{NetworkError, PropertyError, ValidationError, ValidationReport};

/// Errors that can occur while generating a deployment
#[derive(Debug, Error)]
pub enum QuickstartError {
    /// Configuration rejected before generation
    #[error("{0}")]
    Validation(#[from] ValidationReport),

    /// Property set could not be read
    #[error(transparent)]
    Properties(#[from] PropertyError),

    /// Address derivation precondition violated
    #[error("Network derivation error: {0}")]
    Network(#[from] NetworkError),

    /// Template inputs or manifest could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for deployment generation
pub type QuickstartResult<T> = Result<T, QuickstartError>;

impl From<ValidationError> for QuickstartError {
    fn from(err: ValidationError) -> Self {
        QuickstartError::Validation(err.into())
    }
}

impl From<serde_json::Error> for QuickstartError {
    fn from(err: serde_json::Error) -> Self {
        QuickstartError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for QuickstartError {
    fn from(err: serde_yaml::Error) -> Self {
        QuickstartError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_renders_report() {
        let mut report = ValidationReport::default();
        report.record(Err(ValidationError::FleetSizeInverted { min: 3, max: 1 }));

        let err = QuickstartError::from(report);
        assert!(err
            .to_string()
            .starts_with("The deployment configuration has not passed validation:"));
    }

    #[test]
    fn test_network_error_is_wrapped() {
        let err = QuickstartError::from(NetworkError::InvalidCidr("nope".to_string()));
        assert!(matches!(err, QuickstartError::Network(_)));
    }
}
