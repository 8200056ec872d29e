// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Identity
//!
//! Some platform resources (service accounts, custom roles) have short name
//! limits, so their names cannot be derived from the full deployment name.
//! Instead a short hash of the deployment name is threaded through every
//! generator that needs a compact, collision-resistant identifier. The hash
//! is a pure function of the name, so regenerating the same deployment
//! always yields the same resource identities.

use md5::{Digest, Md5};
use serde::{Serialize, Serializer};
use std::fmt;

/// Maximum length of a deployment name
pub const MAX_DEPLOYMENT_NAME_LENGTH: usize = 40;

/// Maximum length of a service account id
pub const MAX_SERVICE_ACCOUNT_ID_LENGTH: usize = 30;

/// Eight hex characters derived from the deployment name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentHash(String);

impl DeploymentHash {
    /// Length of the hash in characters
    pub const LENGTH: usize = 8;

    /// Hash a deployment name
    pub fn of(deployment_name: &str) -> Self {
        let digest = Md5::digest(deployment_name.as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(Self::LENGTH);
        Self(hex)
    }

    /// Get the hash as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DeploymentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for DeploymentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Name and hash of the deployment being generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentIdentity {
    name: String,
    hash: DeploymentHash,
}

impl DeploymentIdentity {
    /// Compute the identity of `name`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = DeploymentHash::of(&name);
        Self { name, hash }
    }

    /// Deployment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short deployment hash
    pub fn hash(&self) -> &DeploymentHash {
        &self.hash
    }

    /// Service account id for the sensor fleet: `<name[..18]>-<hash>-sa`
    pub fn fleet_service_account_id(&self) -> String {
        service_account_id(&self.name, 18, &self.hash, "sa")
    }
}

/// Service account id bounded to [`MAX_SERVICE_ACCOUNT_ID_LENGTH`]
///
/// `base` is cut to `keep` characters, then the deployment hash and `suffix`
/// are appended.
pub fn service_account_id(base: &str, keep: usize, hash: &DeploymentHash, suffix: &str) -> String {
    let prefix: String = base.chars().take(keep).collect();
    format!("{prefix}-{hash}-{suffix}")
}
