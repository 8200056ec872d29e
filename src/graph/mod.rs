// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Graph
//!
//! The output of generation: resource nodes with opaque payloads and explicit
//! dependency edges, plus named outputs. Template instances are nodes too;
//! they carry their own expansion (resources and outputs), which is the
//! layout shape the host runtime applies.
//!
//! ```text
//! DeploymentGraph
//! ├── resources
//! │   ├── <deployment>-net        (network.py)
//! │   │   ├── resources: vpc, subnet, firewalls, address, router …
//! │   │   └── outputs:   vpc-ref, subnet-ref, nat-ip …
//! │   ├── <deployment>-healthcheck (compute.v1.healthCheck)
//! │   └── …
//! └── outputs
//! ```

pub mod audit;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::domain::{Ref, ResourceKind, ResourceLink};

pub use audit::{AuditFinding, DependencyAudit};

/// One node of the resource graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceNode {
    /// Unique name within the deployment
    pub name: String,

    /// Host runtime type tag
    #[serde(rename = "type")]
    pub kind: ResourceKind,

    /// Opaque resource payload
    #[serde(skip_serializing_if = "Value::is_null")]
    pub properties: Value,

    /// Resource-level access policy (buckets)
    #[serde(rename = "accessControl", skip_serializing_if = "Option::is_none")]
    pub access_control: Option<Value>,

    /// Explicit dependency edges: resource names or ref tokens
    #[serde(
        rename = "metadata",
        serialize_with = "serialize_depends_on",
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub depends_on: BTreeSet<String>,

    /// Expansion of a template instance
    #[serde(flatten)]
    pub expansion: Option<Fragment>,
}

impl ResourceNode {
    /// Create a primitive resource node
    pub fn new(name: impl Into<String>, kind: ResourceKind, properties: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            properties,
            access_control: None,
            depends_on: BTreeSet::new(),
            expansion: None,
        }
    }

    /// Add an explicit dependency edge on a resource name
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.insert(name.into());
        self
    }

    /// Add an explicit dependency edge on the resource behind `r`
    ///
    /// The edge names the resource itself, not the token, so it is known at
    /// generation time.
    pub fn depends_on_ref(self, r: &Ref) -> Self {
        self.depends_on(r.resource().to_string())
    }

    /// Add an explicit dependency edge on the resource behind `link`, if any
    pub fn depends_on_link(self, link: &ResourceLink) -> Self {
        match link.as_ref_token() {
            Some(r) => self.depends_on_ref(r),
            None => self,
        }
    }

    /// Set the resource-level access policy
    pub fn with_access_control(mut self, access_control: Value) -> Self {
        self.access_control = Some(access_control);
        self
    }

    /// Attach a template expansion
    pub fn with_expansion(mut self, expansion: Fragment) -> Self {
        self.expansion = Some(expansion);
        self
    }

    /// Every ref token embedded in the payload and access policy
    pub fn embedded_refs(&self) -> Vec<Ref> {
        let mut refs = Vec::new();
        collect_refs(&self.properties, &mut refs);
        if let Some(access_control) = &self.access_control {
            collect_refs(access_control, &mut refs);
        }
        refs
    }

    /// Whether `target` is covered by an explicit dependency edge
    pub fn declares_dependency_on(&self, target: &str) -> bool {
        self.depends_on.iter().any(|dep| {
            dep == target || Ref::parse(dep).is_some_and(|r| r.resource() == target)
        })
    }
}

fn serialize_depends_on<S: Serializer>(
    depends_on: &BTreeSet<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry("dependsOn", depends_on)?;
    map.end()
}

fn collect_refs(value: &Value, out: &mut Vec<Ref>) {
    match value {
        Value::String(s) => out.extend(Ref::find_all(s)),
        Value::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}

/// Value of a named output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    /// Resolved by the host runtime after apply
    Ref(Ref),
    /// Known at generation time
    Literal(Value),
}

impl OutputValue {
    /// The ref, if this output is symbolic
    pub fn as_ref_token(&self) -> Option<&Ref> {
        match self {
            Self::Ref(r) => Some(r),
            Self::Literal(_) => None,
        }
    }

    /// The literal string, if this output is a literal string
    pub fn as_literal_str(&self) -> Option<&str> {
        match self {
            Self::Literal(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<Ref> for OutputValue {
    fn from(r: Ref) -> Self {
        Self::Ref(r)
    }
}

impl From<ResourceLink> for OutputValue {
    fn from(link: ResourceLink) -> Self {
        match link {
            ResourceLink::Ref(r) => Self::Ref(r),
            ResourceLink::External(url) => Self::Literal(Value::String(url)),
        }
    }
}

impl From<String> for OutputValue {
    fn from(s: String) -> Self {
        Self::Literal(Value::String(s))
    }
}

impl From<&str> for OutputValue {
    fn from(s: &str) -> Self {
        Self::Literal(Value::String(s.to_string()))
    }
}

/// Named output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub name: String,
    pub value: OutputValue,
}

/// Ordered map from output name to value
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct OutputMap(Vec<Output>);

impl OutputMap {
    /// Create an empty output map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an output, keeping first-insertion order
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OutputValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|o| o.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(Output { name, value }),
        }
    }

    /// Builder form of [`OutputMap::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OutputValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up an output by name
    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.0.iter().find(|o| o.name == name).map(|o| &o.value)
    }

    /// Output names in order
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|o| o.name.as_str()).collect()
    }

    /// Iterate outputs in order
    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resources and outputs produced by one generator invocation
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Fragment {
    pub resources: Vec<ResourceNode>,
    #[serde(skip_serializing_if = "OutputMap::is_empty")]
    pub outputs: OutputMap,
}

impl Fragment {
    /// Create a fragment
    pub fn new(resources: Vec<ResourceNode>, outputs: OutputMap) -> Self {
        Self { resources, outputs }
    }

    /// Find a resource of this fragment by name
    pub fn resource(&self, name: &str) -> Option<&ResourceNode> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Complete deployment: top-level nodes and the combined output map
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DeploymentGraph {
    pub resources: Vec<ResourceNode>,
    pub outputs: OutputMap,
}

impl DeploymentGraph {
    /// Every node, depth first, template instances before their expansion
    pub fn nodes(&self) -> Vec<&ResourceNode> {
        fn walk<'a>(nodes: &'a [ResourceNode], out: &mut Vec<&'a ResourceNode>) {
            for node in nodes {
                out.push(node);
                if let Some(expansion) = &node.expansion {
                    walk(&expansion.resources, out);
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.resources, &mut out);
        out
    }

    /// Find any node by name
    pub fn find(&self, name: &str) -> Option<&ResourceNode> {
        self.nodes().into_iter().find(|n| n.name == name)
    }

    /// Names of every node
    pub fn names(&self) -> Vec<&str> {
        self.nodes().into_iter().map(|n| n.name.as_str()).collect()
    }

    /// Nodes of one kind
    pub fn nodes_of_kind(&self, kind: ResourceKind) -> Vec<&ResourceNode> {
        self.nodes().into_iter().filter(|n| n.kind == kind).collect()
    }

    /// Check dependency edges and name uniqueness
    pub fn audit(&self) -> DependencyAudit {
        DependencyAudit::of(self)
    }

    /// Render the host runtime layout as YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Render the host runtime layout as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
