pub mod checklist;
mod error;
pub mod storage;
pub mod view;
pub mod wizard;

pub use error::{MapError, Result};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

// --- Types (matching the ManagementMap JSON document) ---

/// Kind of compliance document. Declaration order is the canonical type
/// precedence used to order checklists.
///
/// Unknown or missing type strings load as `Other`, which sorts after every
/// known type.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DocType {
    Policy,
    Procedure,
    WorkInstruction,
    Sop,
    RiskAssessment,
    Form,
    Record,
    Training,
    ExternalStandard,
    #[default]
    #[serde(other)]
    Other,
}

impl DocType {
    pub const ALL: [DocType; 9] = [
        DocType::Policy,
        DocType::Procedure,
        DocType::WorkInstruction,
        DocType::Sop,
        DocType::RiskAssessment,
        DocType::Form,
        DocType::Record,
        DocType::Training,
        DocType::ExternalStandard,
    ];

    /// Position in the canonical type precedence (policy = 0). `Other` comes last.
    pub fn precedence(self) -> usize {
        DocType::ALL
            .iter()
            .position(|t| *t == self)
            .unwrap_or(DocType::ALL.len())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Policy => "policy",
            DocType::Procedure => "procedure",
            DocType::WorkInstruction => "workInstruction",
            DocType::Sop => "sop",
            DocType::RiskAssessment => "riskAssessment",
            DocType::Form => "form",
            DocType::Record => "record",
            DocType::Training => "training",
            DocType::ExternalStandard => "externalStandard",
            DocType::Other => "other",
        }
    }

    /// Human-readable label, e.g. "work instruction".
    pub fn label(self) -> &'static str {
        match self {
            DocType::Policy => "policy",
            DocType::Procedure => "procedure",
            DocType::WorkInstruction => "work instruction",
            DocType::Sop => "sop",
            DocType::RiskAssessment => "risk assessment",
            DocType::Form => "form",
            DocType::Record => "record",
            DocType::Training => "training",
            DocType::ExternalStandard => "external standard",
            DocType::Other => "document",
        }
    }
}

/// RAG status of a document. Informational only; never affects traversal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Green,
    Amber,
    Red,
    Draft,
    Archived,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Relationship {
    Prerequisite,
    Control,
    Evidence,
    OutputToInput,
    Escalation,
    Reference,
}

/// Where to open the underlying document.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A compliance artifact in the map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapNode {
    pub id: String,
    /// Document code, e.g. "POL-001"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub title: String,
    #[serde(rename = "type", default)]
    pub doc_type: DocType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning role or person
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    /// ISO date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<String>,
    /// e.g. "ISO9001: 7.5"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub iso_clauses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_records: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<DocLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl MapNode {
    /// A node without roles, tags or location applies to everyone.
    pub fn is_universal(&self) -> bool {
        self.roles.is_empty() && self.tags.is_empty() && self.location.is_empty()
    }
}

/// A directed relationship between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relationship: Relationship,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Critical edges form the mandatory completion path. `None` when the
    /// document leaves the flag out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
}

impl MapEdge {
    /// Only an explicit `true` puts an edge on the completion path.
    pub fn is_critical(&self) -> bool {
        self.critical == Some(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapMetadata {
    pub name: String,
    pub version: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagementMap {
    pub metadata: MapMetadata,
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles_catalog: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations_catalog: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities_catalog: Option<Vec<String>>,
}

/// One user-facing task derived from a path node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub node_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<DocLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WizardResult {
    pub path: Vec<MapNode>,
    pub checklist: Vec<ChecklistItem>,
    pub estimated_time: String,
}

impl WizardResult {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

// --- Loading ---

impl ManagementMap {
    /// Parse and validate a map document.
    pub fn from_json(raw: &str) -> Result<ManagementMap> {
        let map: ManagementMap = serde_json::from_str(raw)?;
        map.validate()?;
        Ok(map)
    }

    /// Read the static map file once. Any failure here is terminal for the session.
    pub fn load(path: &Path) -> Result<ManagementMap> {
        let raw = fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = ManagementMap::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            nodes = map.nodes.len(),
            edges = map.edges.len(),
            "loaded management map"
        );
        Ok(map)
    }

    /// Node ids must be unique and every edge must connect existing nodes.
    pub fn validate(&self) -> Result<()> {
        let mut ids: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(MapError::DuplicateNode(node.id.clone()));
            }
        }
        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(MapError::DanglingEdge {
                        edge: edge.id.clone(),
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&MapNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a MapEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a MapEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Declared roles catalog, or the unique node roles in first-seen order.
    pub fn roles_catalog(&self) -> Vec<String> {
        self.roles_catalog
            .clone()
            .unwrap_or_else(|| collect_unique(self.nodes.iter().flat_map(|n| &n.roles)))
    }

    pub fn activities_catalog(&self) -> Vec<String> {
        self.activities_catalog
            .clone()
            .unwrap_or_else(|| collect_unique(self.nodes.iter().flat_map(|n| &n.tags)))
    }

    pub fn locations_catalog(&self) -> Vec<String> {
        self.locations_catalog
            .clone()
            .unwrap_or_else(|| collect_unique(self.nodes.iter().flat_map(|n| &n.location)))
    }
}

fn collect_unique<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}
