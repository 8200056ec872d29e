// Copyright (c) 2025 - Cowboy AI, Inc.
//! Dependency Audit
//!
//! The host runtime infers ordering from refs it finds in scalar fields, but
//! misses refs inside list elements and behind conditional fields. Generators
//! therefore declare every dependency of a primitive resource explicitly, and
//! this audit checks that they did:
//!
//! - every ref embedded in a primitive resource is covered by an explicit
//!   edge (self-references excluded)
//! - every explicit edge names a node that exists in the graph
//! - every node name is unique
//!
//! Template instances are not checked for embedded refs: their inputs are
//! consumed by their expansion, whose primitives carry the edges.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::DeploymentGraph;
use crate::domain::Ref;

/// One problem found by the audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditFinding {
    /// Two nodes share a name
    DuplicateName { name: String, count: usize },
    /// A ref is embedded without a matching explicit edge
    UndeclaredRef { node: String, target: Ref },
    /// An explicit edge names no node of the graph
    UnknownDependency { node: String, dependency: String },
}

impl fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name, count } => {
                write!(f, "resource name {name} is used {count} times")
            }
            Self::UndeclaredRef { node, target } => {
                write!(f, "{node} embeds {target} without a dependency on {}", target.resource())
            }
            Self::UnknownDependency { node, dependency } => {
                write!(f, "{node} depends on unknown resource {dependency}")
            }
        }
    }
}

/// Result of auditing a graph
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyAudit {
    findings: Vec<AuditFinding>,
}

impl DependencyAudit {
    /// Audit `graph`
    pub fn of(graph: &DeploymentGraph) -> Self {
        let nodes = graph.nodes();
        let mut findings = Vec::new();

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for node in &nodes {
            *counts.entry(node.name.as_str()).or_default() += 1;
        }
        for (name, count) in &counts {
            if *count > 1 {
                findings.push(AuditFinding::DuplicateName {
                    name: name.to_string(),
                    count: *count,
                });
            }
        }
        let known: BTreeSet<&str> = counts.keys().copied().collect();

        for node in &nodes {
            if !node.kind.is_template() {
                let mut seen = BTreeSet::new();
                for target in node.embedded_refs() {
                    if target.resource() == node.name || !seen.insert(target.clone()) {
                        continue;
                    }
                    if !node.declares_dependency_on(target.resource()) {
                        findings.push(AuditFinding::UndeclaredRef {
                            node: node.name.clone(),
                            target,
                        });
                    }
                }
            }

            for dependency in &node.depends_on {
                let target = Ref::parse(dependency)
                    .map(|r| r.resource().to_string())
                    .unwrap_or_else(|| dependency.clone());
                if !known.contains(target.as_str()) {
                    findings.push(AuditFinding::UnknownDependency {
                        node: node.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        Self { findings }
    }

    /// Problems found
    pub fn findings(&self) -> &[AuditFinding] {
        &self.findings
    }

    /// Whether the graph passed the audit
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

impl fmt::Display for DependencyAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "dependency audit clean");
        }
        write!(f, "dependency audit found {} problem(s):", self.findings.len())?;
        for finding in &self.findings {
            write!(f, "\n    - {finding}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceKind;
    use crate::graph::{OutputMap, ResourceNode};
    use serde_json::json;

    fn graph(resources: Vec<ResourceNode>) -> DeploymentGraph {
        DeploymentGraph {
            resources,
            outputs: OutputMap::new(),
        }
    }

    #[test]
    fn test_list_embedded_ref_without_edge_is_reported() {
        let g = graph(vec![
            ResourceNode::new("ip", ResourceKind::Address, json!({})),
            ResourceNode::new(
                "router",
                ResourceKind::Router,
                json!({"nats": [{"natIps": ["$(ref.ip.selfLink)"]}]}),
            ),
        ]);

        let audit = g.audit();
        assert_eq!(
            audit.findings(),
            &[AuditFinding::UndeclaredRef {
                node: "router".to_string(),
                target: Ref::self_link("ip"),
            }]
        );
    }

    #[test]
    fn test_declared_edge_passes() {
        let g = graph(vec![
            ResourceNode::new("ip", ResourceKind::Address, json!({})),
            ResourceNode::new(
                "router",
                ResourceKind::Router,
                json!({"nats": [{"natIps": ["$(ref.ip.selfLink)"]}]}),
            )
            .depends_on("ip"),
        ]);

        assert!(g.audit().is_clean(), "{}", g.audit());
    }

    #[test]
    fn test_unknown_dependency_and_duplicates() {
        let g = graph(vec![
            ResourceNode::new("a", ResourceKind::Firewall, json!({})).depends_on("missing"),
            ResourceNode::new("a", ResourceKind::Firewall, json!({})),
        ]);

        let audit = g.audit();
        assert!(audit.findings().contains(&AuditFinding::DuplicateName {
            name: "a".to_string(),
            count: 2
        }));
        assert!(audit.findings().contains(&AuditFinding::UnknownDependency {
            node: "a".to_string(),
            dependency: "missing".to_string()
        }));
    }

    #[test]
    fn test_self_reference_is_ignored() {
        let g = graph(vec![ResourceNode::new(
            "fr",
            ResourceKind::ForwardingRule,
            json!({"selfRef": "$(ref.fr.IPAddress)"}),
        )]);
        assert!(g.audit().is_clean());
    }
}
