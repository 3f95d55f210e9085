use std::collections::HashSet;

use crate::MapNode;

fn first_precedence(path: &[&MapNode]) -> usize {
    path.first()
        .map(|n| n.doc_type.precedence())
        .unwrap_or(usize::MAX)
}

/// Union of all entry paths, deduplicated by id and grouped by type precedence.
///
/// Longer paths contribute first (ties broken by the precedence of their first
/// node), so within a type group nodes keep the order of the dominant path.
pub fn merge_paths<'n>(mut paths: Vec<Vec<&'n MapNode>>) -> Vec<&'n MapNode> {
    paths.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| first_precedence(a).cmp(&first_precedence(b)))
    });

    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged: Vec<&MapNode> = Vec::new();
    for node in paths.into_iter().flatten() {
        if seen.insert(node.id.as_str()) {
            merged.push(node);
        }
    }

    // sort_by_key is stable: equal types keep insertion order
    merged.sort_by_key(|n| n.doc_type.precedence());
    merged
}
