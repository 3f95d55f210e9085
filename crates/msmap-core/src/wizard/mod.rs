//! "What do I need?" wizard: turns a set of facets into the minimal ordered
//! list of documents a person has to work through.
//!
//! The pipeline is filter → entry-node walks → merge → time estimate. Every
//! stage is a pure function over the loaded map.

pub mod estimate;
pub mod filter;
pub mod merge;
pub mod path;

pub use estimate::{estimate_time, format_duration, minutes_for, total_minutes};
pub use filter::{relevant_nodes, Facets};
pub use merge::merge_paths;
pub use path::{compute_paths, entry_nodes, CriticalGraph};

use crate::{ChecklistItem, ManagementMap, MapEdge, MapNode, WizardResult};

/// Compute the personalized compliance path for the given facets.
pub fn compute_minimal_path(nodes: &[MapNode], edges: &[MapEdge], facets: &Facets) -> WizardResult {
    let relevant = relevant_nodes(nodes, facets);
    let paths = compute_paths(&relevant, nodes, edges);
    let path_count = paths.len();
    let merged = merge_paths(paths);
    let estimated_time = estimate_time(&merged);

    tracing::debug!(
        unfiltered = facets.is_empty(),
        relevant = relevant.len(),
        entry_paths = path_count,
        steps = merged.len(),
        %estimated_time,
        "computed compliance path"
    );

    let checklist = checklist_for(&merged);
    WizardResult {
        path: merged.into_iter().cloned().collect(),
        checklist,
        estimated_time,
    }
}

/// Checklist items derived 1:1 from a path, numbered from 1.
pub fn checklist_for(path: &[&MapNode]) -> Vec<ChecklistItem> {
    path.iter()
        .enumerate()
        .map(|(i, node)| ChecklistItem {
            id: node.id.clone(),
            node_id: node.id.clone(),
            title: node.title.clone(),
            description: Some(format!("Complete {}: {}", node.doc_type.label(), node.title)),
            completed: false,
            order: i + 1,
            link: node.link.clone(),
        })
        .collect()
}

/// Wizard bound to a loaded map.
pub struct Wizard<'m> {
    map: &'m ManagementMap,
}

impl<'m> Wizard<'m> {
    pub fn new(map: &'m ManagementMap) -> Self {
        Self { map }
    }

    pub fn run(&self, facets: &Facets) -> WizardResult {
        compute_minimal_path(&self.map.nodes, &self.map.edges, facets)
    }
}
