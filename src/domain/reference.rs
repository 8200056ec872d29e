// Copyright (c) 2025 - Cowboy AI, Inc.
//! Symbolic References and External Resource Links
//!
//! Cross-resource values are never shared in-process. A generator that needs
//! another resource's output embeds a [`Ref`] token, which the host runtime
//! resolves after the whole graph has been submitted. Resources that live
//! outside the generated graph are addressed by a fully-qualified
//! [`ResourceLink::External`] URL instead, so the host runtime never takes
//! ownership of their lifecycle.
//!
//! # Examples
//!
//! ```rust
//! use vsensor_quickstart::domain::{global_compute_link, Ref};
//!
//! let subnet = Ref::self_link("demo-net-vsensor-subnet");
//! assert_eq!(subnet.to_string(), "$(ref.demo-net-vsensor-subnet.selfLink)");
//!
//! let vpc = global_compute_link("my-project", "networks", "shared-vpc");
//! assert_eq!(
//!     vpc,
//!     "https://www.googleapis.com/compute/v1/projects/my-project/global/networks/shared-vpc"
//! );
//! ```

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Base URL of the compute API used for every fully-qualified link
pub const COMPUTE_URL_BASE: &str = "https://www.googleapis.com/compute/v1/";

/// Primary identifier attribute exposed by every platform resource
pub const SELF_LINK: &str = "selfLink";

static REF_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(ref\.([A-Za-z0-9_\-]+)\.([A-Za-z0-9_\-\.\[\]]+)\)")
        .expect("ref token pattern is a valid regex")
});

/// Symbolic pointer to an output attribute of a resource or template
///
/// Rendered as `$(ref.<resource>.<attribute>)`. A `Ref` is created at
/// generation time and consumed by other generators as an opaque value; it is
/// never dereferenced locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref {
    resource: String,
    attribute: String,
}

impl Ref {
    /// Reference `attribute` of `resource`
    pub fn new(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// Reference the `selfLink` of `resource`
    pub fn self_link(resource: impl Into<String>) -> Self {
        Self::new(resource, SELF_LINK)
    }

    /// Name of the referenced resource
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Referenced output attribute
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Parse a string that is exactly one ref token
    pub fn parse(token: &str) -> Option<Self> {
        let captures = REF_TOKEN.captures(token)?;
        let whole = captures.get(0)?;
        if whole.start() != 0 || whole.end() != token.len() {
            return None;
        }
        Some(Self::new(&captures[1], &captures[2]))
    }

    /// Find every ref token embedded anywhere in `text`
    pub fn find_all(text: &str) -> Vec<Self> {
        REF_TOKEN
            .captures_iter(text)
            .map(|c| Self::new(&c[1], &c[2]))
            .collect()
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$(ref.{}.{})", self.resource, self.attribute)
    }
}

impl Serialize for Ref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Address of a resource: either in the generated graph or outside it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceLink {
    /// Resource produced by this deployment, resolved by the host runtime
    Ref(Ref),
    /// Pre-existing resource addressed by its fully-qualified URL
    External(String),
}

impl ResourceLink {
    /// The ref, if this link points into the generated graph
    pub fn as_ref_token(&self) -> Option<&Ref> {
        match self {
            Self::Ref(r) => Some(r),
            Self::External(_) => None,
        }
    }

    /// Whether the host runtime must not manage the referenced resource
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

impl From<Ref> for ResourceLink {
    fn from(r: Ref) -> Self {
        Self::Ref(r)
    }
}

impl fmt::Display for ResourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ref(r) => write!(f, "{}", r),
            Self::External(url) => write!(f, "{}", url),
        }
    }
}

impl Serialize for ResourceLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Path shape of an external compute link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope<'a> {
    /// `projects/<p>/global/<collection>/<name>`
    Global,
    /// `projects/<p>/regions/<region>/<collection>/<name>`
    Region(&'a str),
}

/// Build the fully-qualified link of a compute resource outside the graph
pub fn external_link(scope: LinkScope<'_>, project: &str, collection: &str, name: &str) -> String {
    match scope {
        LinkScope::Global => {
            format!("{COMPUTE_URL_BASE}projects/{project}/global/{collection}/{name}")
        }
        LinkScope::Region(region) => {
            format!("{COMPUTE_URL_BASE}projects/{project}/regions/{region}/{collection}/{name}")
        }
    }
}

/// Global-scope compute link (networks, gateways, images)
pub fn global_compute_link(project: &str, collection: &str, name: &str) -> String {
    external_link(LinkScope::Global, project, collection, name)
}

/// Region-scope compute link (subnetworks, addresses)
pub fn region_compute_link(project: &str, collection: &str, name: &str, region: &str) -> String {
    external_link(LinkScope::Region(region), project, collection, name)
}

/// Prefix a compute path with the API base, optionally inside `project`
pub fn compute_url(project: Option<&str>, path: &str) -> String {
    match project {
        Some(project) => format!("{COMPUTE_URL_BASE}projects/{project}/{path}"),
        None => format!("{COMPUTE_URL_BASE}{path}"),
    }
}
