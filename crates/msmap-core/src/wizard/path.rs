use std::collections::{HashMap, HashSet};

use crate::{MapEdge, MapNode};

/// Critical-edge adjacency, in edge-list order.
#[derive(Debug, Default)]
pub struct CriticalGraph<'a> {
    outgoing: HashMap<&'a str, Vec<&'a str>>,
    has_incoming: HashSet<&'a str>,
}

impl<'a> CriticalGraph<'a> {
    pub fn new(edges: &'a [MapEdge]) -> Self {
        let mut graph = CriticalGraph::default();
        for edge in edges.iter().filter(|e| e.is_critical()) {
            graph
                .outgoing
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
            graph.has_incoming.insert(edge.target.as_str());
        }
        graph
    }

    pub fn successors(&self, id: &str) -> &[&'a str] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_incoming(&self, id: &str) -> bool {
        self.has_incoming.contains(id)
    }
}

/// Relevant nodes with no incoming critical edge from anywhere in the map.
pub fn entry_nodes<'n>(relevant: &[&'n MapNode], graph: &CriticalGraph<'_>) -> Vec<&'n MapNode> {
    relevant
        .iter()
        .filter(|n| !graph.has_incoming(&n.id))
        .copied()
        .collect()
}

/// Walk forward from `entry`, always taking the first unvisited critical successor.
pub fn walk<'n>(
    entry: &'n MapNode,
    graph: &CriticalGraph<'_>,
    index: &HashMap<&str, &'n MapNode>,
) -> Vec<&'n MapNode> {
    let mut path = vec![entry];
    let mut visited: HashSet<&str> = HashSet::from([entry.id.as_str()]);
    let mut current = entry;

    loop {
        let next = graph
            .successors(&current.id)
            .iter()
            .filter(|id| !visited.contains(**id))
            .find_map(|id| index.get(*id).copied());
        let Some(next) = next else { break };
        visited.insert(next.id.as_str());
        path.push(next);
        current = next;
    }

    path
}

/// One path per entry node. No entry nodes is an empty result, not an error.
pub fn compute_paths<'n>(
    relevant: &[&'n MapNode],
    all_nodes: &'n [MapNode],
    edges: &[MapEdge],
) -> Vec<Vec<&'n MapNode>> {
    let graph = CriticalGraph::new(edges);
    let index: HashMap<&str, &MapNode> = all_nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    entry_nodes(relevant, &graph)
        .into_iter()
        .map(|entry| walk(entry, &graph, &index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Relationship;

    fn node(id: &str) -> MapNode {
        serde_json::from_value(serde_json::json!({
            "id": id, "title": id, "type": "procedure"
        }))
        .unwrap()
    }

    fn edge(source: &str, target: &str, critical: bool) -> MapEdge {
        MapEdge {
            id: format!("{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
            relationship: Relationship::Prerequisite,
            label: None,
            critical: Some(critical),
        }
    }

    fn ids(path: &[&MapNode]) -> Vec<String> {
        path.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn follows_critical_chain() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b", true), edge("b", "c", true)];
        let relevant: Vec<&MapNode> = nodes.iter().collect();
        let paths = compute_paths(&relevant, &nodes, &edges);
        assert_eq!(paths.len(), 1);
        assert_eq!(ids(&paths[0]), vec!["a", "b", "c"]);
    }

    #[test]
    fn non_critical_edges_are_ignored() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b", false)];
        let relevant: Vec<&MapNode> = nodes.iter().collect();
        let paths = compute_paths(&relevant, &nodes, &edges);
        assert_eq!(paths.iter().map(|p| ids(p)).collect::<Vec<_>>(), vec![
            vec!["a".to_string()],
            vec!["b".to_string()],
        ]);
    }

    #[test]
    fn first_critical_edge_wins() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "c", true), edge("a", "b", true)];
        let relevant = vec![&nodes[0]];
        let paths = compute_paths(&relevant, &nodes, &edges);
        assert_eq!(ids(&paths[0]), vec!["a", "c"]);
    }

    #[test]
    fn walk_reaches_nodes_outside_the_relevant_set() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b", true)];
        let relevant = vec![&nodes[0]];
        let paths = compute_paths(&relevant, &nodes, &edges);
        assert_eq!(ids(&paths[0]), vec!["a", "b"]);
    }

    #[test]
    fn cycles_terminate() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![
            edge("a", "b", true),
            edge("b", "c", true),
            edge("c", "b", true),
            edge("c", "a", true),
        ];
        let graph = CriticalGraph::new(&edges);
        let index: HashMap<&str, &MapNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        assert_eq!(ids(&walk(&nodes[0], &graph, &index)), vec!["a", "b", "c"]);
    }

    #[test]
    fn upstream_filtered_out_means_no_entry() {
        // b has an incoming critical edge from a, which the filter dropped.
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b", true)];
        let relevant = vec![&nodes[1]];
        assert!(compute_paths(&relevant, &nodes, &edges).is_empty());
    }

    #[test]
    fn skips_visited_successor_for_next_candidate() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b", true), edge("b", "a", true), edge("b", "c", true)];
        let graph = CriticalGraph::new(&edges);
        let index: HashMap<&str, &MapNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        assert_eq!(ids(&walk(&nodes[0], &graph, &index)), vec!["a", "b", "c"]);
    }
}
