use serde::{Deserialize, Serialize};

use crate::MapNode;

/// User-supplied filter dimensions for a wizard run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    /// Organizational roles, e.g. "Quality Manager"
    #[serde(default)]
    pub roles: Vec<String>,
    /// Activity keywords matched against node tags and titles
    #[serde(default)]
    pub activities: Vec<String>,
    /// Sites or areas
    #[serde(default)]
    pub locations: Vec<String>,
}

impl Facets {
    pub fn new(
        roles: impl IntoIterator<Item = impl Into<String>>,
        activities: impl IntoIterator<Item = impl Into<String>>,
        locations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            activities: activities.into_iter().map(Into::into).collect(),
            locations: locations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        normalize(&self.roles).is_empty()
            && normalize(&self.activities).is_empty()
            && normalize(&self.locations).is_empty()
    }
}

/// Select the nodes matching every non-empty facet dimension.
pub fn relevant_nodes<'a>(nodes: &'a [MapNode], facets: &Facets) -> Vec<&'a MapNode> {
    let roles = normalize(&facets.roles);
    let activities = normalize(&facets.activities);
    let locations = normalize(&facets.locations);

    nodes
        .iter()
        .filter(|node| {
            if node.is_universal() {
                return true;
            }
            let title = node.title.to_lowercase();
            matches_any(&roles, &node.roles, None)
                && matches_any(&activities, &node.tags, Some(&title))
                && matches_any(&locations, &node.location, None)
        })
        .collect()
}

// Lowercased, trimmed, blanks dropped.
fn normalize(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn matches_any(wanted: &[String], attrs: &[String], extra: Option<&str>) -> bool {
    if wanted.is_empty() {
        return true;
    }
    wanted.iter().any(|w| {
        attrs.iter().any(|a| a.to_lowercase().contains(w.as_str()))
            || extra.is_some_and(|e| e.contains(w.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocType;

    fn node(id: &str, roles: &[&str], tags: &[&str], location: &[&str]) -> MapNode {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("{id} title"),
            "type": "procedure",
            "roles": roles,
            "tags": tags,
            "location": location,
        }))
        .unwrap()
    }

    fn ids(nodes: Vec<&MapNode>) -> Vec<&str> {
        nodes.into_iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn empty_facets_keep_everything() {
        let nodes = vec![
            node("a", &["Manager"], &[], &[]),
            node("b", &[], &["audit"], &["Plant"]),
        ];
        assert_eq!(ids(relevant_nodes(&nodes, &Facets::default())), vec!["a", "b"]);
    }

    #[test]
    fn role_match_is_case_insensitive_substring() {
        let nodes = vec![
            node("a", &["Quality Manager"], &[], &[]),
            node("b", &["Operator"], &[], &[]),
        ];
        let facets = Facets::new(["manager"], Vec::<String>::new(), Vec::<String>::new());
        assert_eq!(ids(relevant_nodes(&nodes, &facets)), vec!["a"]);
    }

    #[test]
    fn activity_matches_tags_or_title() {
        let mut by_title = node("a", &["Clerk"], &[], &[]);
        by_title.title = "Internal Audit Programme".to_string();
        let by_tag = node("b", &["Clerk"], &["waste", "AUDIT"], &[]);
        let neither = node("c", &["Clerk"], &["training"], &[]);
        let nodes = vec![by_title, by_tag, neither];

        let facets = Facets::new(Vec::<String>::new(), ["audit"], Vec::<String>::new());
        assert_eq!(ids(relevant_nodes(&nodes, &facets)), vec!["a", "b"]);
    }

    #[test]
    fn dimensions_are_anded_values_are_ored() {
        let nodes = vec![
            node("a", &["Manager"], &[], &["Head Office"]),
            node("b", &["Manager"], &[], &["Warehouse"]),
            node("c", &["Operator"], &[], &["Warehouse"]),
        ];
        let facets = Facets::new(["manager", "supervisor"], Vec::<String>::new(), ["warehouse"]);
        assert_eq!(ids(relevant_nodes(&nodes, &facets)), vec!["b"]);
    }

    #[test]
    fn universal_nodes_match_any_facets() {
        let mut bare = node("bare", &[], &[], &[]);
        bare.doc_type = DocType::ExternalStandard;
        let nodes = vec![bare, node("x", &["Operator"], &[], &[])];
        let facets = Facets::new(["Director"], ["nothing"], ["Mars"]);
        assert_eq!(ids(relevant_nodes(&nodes, &facets)), vec!["bare"]);
    }

    #[test]
    fn blank_values_are_no_constraint() {
        let nodes = vec![node("a", &["Manager"], &[], &[])];
        let facets = Facets::new(["  "], [""], Vec::<String>::new());
        assert!(facets.is_empty());
        assert_eq!(relevant_nodes(&nodes, &facets).len(), 1);
    }
}
