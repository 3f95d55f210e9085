use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{DocType, ManagementMap, MapEdge, MapNode, NodeStatus, Relationship};

const BREADCRUMB_DEPTH: usize = 10;

/// Attribute filters for the full map view. Empty lists don't constrain.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapFilters {
    #[serde(default)]
    pub types: Vec<DocType>,
    #[serde(default)]
    pub statuses: Vec<NodeStatus>,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub iso_clauses: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewSettings {
    /// When off, only output-to-input edges are shown
    #[serde(default = "default_true")]
    pub show_dependencies: bool,
    #[serde(default = "default_true")]
    pub show_non_critical: bool,
    #[serde(default = "default_true")]
    pub show_external: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            show_dependencies: true,
            show_non_critical: true,
            show_external: true,
        }
    }
}

fn matches_query(node: &MapNode, query: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(query);
    hit(&node.title)
        || node.code.as_deref().is_some_and(hit)
        || node.description.as_deref().is_some_and(hit)
        || node.tags.iter().any(|t| hit(t))
        || node.iso_clauses.iter().any(|c| hit(c))
}

/// Nodes shown in the map view for the given search text, filters and settings.
pub fn visible_nodes<'a>(
    map: &'a ManagementMap,
    query: &str,
    filters: &MapFilters,
    settings: &ViewSettings,
) -> Vec<&'a MapNode> {
    let query = query.trim().to_lowercase();
    let clauses: Vec<String> = filters.iso_clauses.iter().map(|c| c.to_lowercase()).collect();

    map.nodes
        .iter()
        .filter(|n| query.is_empty() || matches_query(n, &query))
        .filter(|n| filters.types.is_empty() || filters.types.contains(&n.doc_type))
        .filter(|n| {
            // Nodes without a status count as drafts.
            filters.statuses.is_empty()
                || filters.statuses.contains(&n.status.unwrap_or(NodeStatus::Draft))
        })
        .filter(|n| {
            filters.owners.is_empty()
                || n.owner.as_ref().is_some_and(|o| filters.owners.contains(o))
        })
        .filter(|n| {
            filters.locations.is_empty() || n.location.iter().any(|l| filters.locations.contains(l))
        })
        .filter(|n| {
            clauses.is_empty()
                || n.iso_clauses
                    .iter()
                    .any(|c| clauses.iter().any(|f| c.to_lowercase().contains(f.as_str())))
        })
        .filter(|n| filters.tags.is_empty() || n.tags.iter().any(|t| filters.tags.contains(t)))
        .filter(|n| settings.show_external || n.doc_type != DocType::ExternalStandard)
        .collect()
}

/// Edges between visible nodes, narrowed by the view settings.
///
/// Hiding non-critical edges only drops edges explicitly flagged `false`.
pub fn visible_edges<'a>(
    map: &'a ManagementMap,
    visible: &[&MapNode],
    settings: &ViewSettings,
) -> Vec<&'a MapEdge> {
    let ids: HashSet<&str> = visible.iter().map(|n| n.id.as_str()).collect();
    map.edges
        .iter()
        .filter(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()))
        .filter(|e| settings.show_dependencies || e.relationship == Relationship::OutputToInput)
        .filter(|e| settings.show_non_critical || e.critical != Some(false))
        .collect()
}

/// Upstream critical chain leading to `node_id`, root first and ending with the node.
///
/// Returns an empty vec for unknown ids.
pub fn breadcrumbs<'a>(node_id: &str, map: &'a ManagementMap) -> Vec<&'a MapNode> {
    let Some(node) = map.node(node_id) else {
        return Vec::new();
    };
    let mut trail = Vec::new();
    let mut visited = HashSet::new();
    collect_upstream(node, map, 0, &mut visited, &mut trail);
    trail.reverse();
    trail
}

// Pushes the node, then its critical predecessors depth-first; the caller reverses.
fn collect_upstream<'a>(
    node: &'a MapNode,
    map: &'a ManagementMap,
    depth: usize,
    visited: &mut HashSet<&'a str>,
    trail: &mut Vec<&'a MapNode>,
) {
    if depth > BREADCRUMB_DEPTH || !visited.insert(node.id.as_str()) {
        return;
    }
    trail.push(node);
    for edge in map.incoming(&node.id).filter(|e| e.is_critical()) {
        if let Some(upstream) = map.node(&edge.source) {
            collect_upstream(upstream, map, depth + 1, visited, trail);
        }
    }
}
