mod session;

use std::path::PathBuf;
use std::sync::Arc;

use msmap_core::view::{self, MapFilters, ViewSettings};
use msmap_core::wizard::{Facets, Wizard};
use msmap_core::{ManagementMap, MapNode, WizardResult};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;

use session::{MapSlot, Session};

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SearchNodesRequest {
    /// Free-text search over title, code, description, tags and ISO clauses
    query: Option<String>,
    /// Attribute filters: types, statuses, owners, locations, isoClauses, tags
    filters: Option<MapFilters>,
    /// Edge/node visibility: showDependencies, showNonCritical, showExternal. Defaults to the stored view settings.
    settings: Option<ViewSettings>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ViewSettingsRequest {
    /// Show prerequisite/control/evidence/escalation/reference edges, not just output-to-input flow
    show_dependencies: Option<bool>,
    /// Show edges explicitly marked non-critical
    show_non_critical: Option<bool>,
    /// Show external standards
    show_external: Option<bool>,
}

impl ViewSettingsRequest {
    fn apply(self, current: ViewSettings) -> ViewSettings {
        ViewSettings {
            show_dependencies: self.show_dependencies.unwrap_or(current.show_dependencies),
            show_non_critical: self.show_non_critical.unwrap_or(current.show_non_critical),
            show_external: self.show_external.unwrap_or(current.show_external),
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct NodeRequest {
    /// ID of the document node, e.g. "msp"
    node_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct WizardRequest {
    /// Roles to match (case-insensitive substring). Empty or omitted means any role.
    #[serde(default)]
    roles: Vec<String>,
    /// Activity keywords matched against node tags and titles. Empty or omitted means any activity.
    #[serde(default)]
    activities: Vec<String>,
    /// Sites or areas. Empty or omitted means any location.
    #[serde(default)]
    locations: Vec<String>,
}

impl WizardRequest {
    fn facets(self) -> Facets {
        Facets {
            roles: self.roles,
            activities: self.activities,
            locations: self.locations,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct UpdateChecklistItemRequest {
    /// Checklist item ID (same as the document node ID)
    item_id: String,
    /// New completion flag
    completed: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ExportChecklistRequest {
    /// Directory to write compliance-checklist-YYYY-MM-DD.json into. Defaults to the current directory.
    directory: Option<String>,
}

// --- Server ---

#[derive(Clone)]
pub struct MsmapServer {
    session: Arc<Session>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MsmapServer {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            tool_router: Self::tool_router(),
        }
    }

    /// The loaded map, or the tool error to return when the load failed.
    fn loaded_map(&self) -> Result<Arc<ManagementMap>, CallToolResult> {
        match self.session.map() {
            MapSlot::Loaded(map) => Ok(map),
            MapSlot::Failed(e) => Err(CallToolResult::error(vec![Content::text(format!(
                "No management map loaded from {}: {}\nFix the file and call `reload_map` to retry.",
                self.session.map_path().display(),
                e
            ))])),
        }
    }

    #[tool(
        description = "Describe the loaded management system map: name, version, node and edge counts, and the role/activity/location catalogs used by the wizard. Reports the load error if the map could not be read."
    )]
    fn map_info(&self) -> Result<CallToolResult, McpError> {
        let map = match self.loaded_map() {
            Ok(m) => m,
            Err(result) => return Ok(result),
        };
        let critical = map.edges.iter().filter(|e| e.is_critical()).count();
        let info = serde_json::json!({
            "name": map.metadata.name,
            "version": map.metadata.version,
            "generatedAt": map.metadata.generated_at,
            "nodes": map.nodes.len(),
            "edges": map.edges.len(),
            "criticalEdges": critical,
            "rolesCatalog": map.roles_catalog(),
            "activitiesCatalog": map.activities_catalog(),
            "locationsCatalog": map.locations_catalog(),
        });
        Ok(CallToolResult::success(vec![Content::text(pretty(&info))]))
    }

    #[tool(
        description = "Reload the management system map from disk. Use after a load failure or after the map file has been edited."
    )]
    fn reload_map(&self) -> Result<CallToolResult, McpError> {
        match self.session.reload() {
            MapSlot::Loaded(map) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Loaded '{}' ({} nodes, {} edges).",
                map.metadata.name,
                map.nodes.len(),
                map.edges.len()
            ))])),
            MapSlot::Failed(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to load {}: {}",
                self.session.map_path().display(),
                e
            ))])),
        }
    }

    #[tool(
        description = "Search the full map view. Returns {nodes, edges} for the nodes matching the query and filters, with only the edges between them that the view settings allow."
    )]
    fn search_nodes(
        &self,
        Parameters(req): Parameters<SearchNodesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let map = match self.loaded_map() {
            Ok(m) => m,
            Err(result) => return Ok(result),
        };
        let filters = req.filters.unwrap_or_default();
        let settings = req.settings.unwrap_or_else(|| self.session.view_settings());
        let nodes = view::visible_nodes(&map, req.query.as_deref().unwrap_or(""), &filters, &settings);
        let edges = view::visible_edges(&map, &nodes, &settings);
        let out = serde_json::json!({ "nodes": nodes, "edges": edges });
        Ok(CallToolResult::success(vec![Content::text(pretty(&out))]))
    }

    #[tool(
        description = "Change the stored map view settings used by search_nodes. Omitted fields keep their current value. Returns the settings now in effect."
    )]
    fn set_view_settings(
        &self,
        Parameters(req): Parameters<ViewSettingsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = req.apply(self.session.view_settings());
        if let Err(e) = self.session.set_view_settings(view) {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to save view settings: {}",
                e
            ))]));
        }
        let out = serde_json::to_value(view).unwrap_or_default();
        Ok(CallToolResult::success(vec![Content::text(pretty(&out))]))
    }

    #[tool(
        description = "Get one document node with its incoming and outgoing relationships. Each edge carries the other endpoint's title for context."
    )]
    fn get_node(
        &self,
        Parameters(req): Parameters<NodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let map = match self.loaded_map() {
            Ok(m) => m,
            Err(result) => return Ok(result),
        };
        let Some(node) = map.node(&req.node_id) else {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Node '{}' not found",
                req.node_id
            ))]));
        };
        let title_of = |id: &str| map.node(id).map(|n| n.title.clone()).unwrap_or_default();
        let incoming: Vec<serde_json::Value> = map
            .incoming(&node.id)
            .map(|e| {
                let mut v = serde_json::to_value(e).unwrap_or_default();
                v["sourceTitle"] = title_of(&e.source).into();
                v
            })
            .collect();
        let outgoing: Vec<serde_json::Value> = map
            .outgoing(&node.id)
            .map(|e| {
                let mut v = serde_json::to_value(e).unwrap_or_default();
                v["targetTitle"] = title_of(&e.target).into();
                v
            })
            .collect();
        let out = serde_json::json!({ "node": node, "incoming": incoming, "outgoing": outgoing });
        Ok(CallToolResult::success(vec![Content::text(pretty(&out))]))
    }

    #[tool(
        description = "Show the upstream chain of critical relationships leading to a node, root first."
    )]
    fn get_breadcrumbs(
        &self,
        Parameters(req): Parameters<NodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let map = match self.loaded_map() {
            Ok(m) => m,
            Err(result) => return Ok(result),
        };
        let trail = view::breadcrumbs(&req.node_id, &map);
        if trail.is_empty() {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Node '{}' not found",
                req.node_id
            ))]));
        }
        let text = trail
            .iter()
            .map(|n| format!("{} [{}]", n.title, n.doc_type.label()))
            .collect::<Vec<_>>()
            .join(" > ");
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        description = "\"What do I need?\" wizard. Returns the WizardResult JSON ({path, checklist, estimatedTime}) for the given roles, activities and locations. An empty path adds a second text block explaining why. Does not change the checklist; use generate_checklist for that."
    )]
    fn compute_path(
        &self,
        Parameters(req): Parameters<WizardRequest>,
    ) -> Result<CallToolResult, McpError> {
        let map = match self.loaded_map() {
            Ok(m) => m,
            Err(result) => return Ok(result),
        };
        let result = Wizard::new(&map).run(&req.facets());
        let json = match serde_json::to_value(&result) {
            Ok(v) => pretty(&v),
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Failed to serialize wizard result: {}",
                    e
                ))]))
            }
        };
        let mut content = vec![Content::text(json)];
        if result.is_empty() {
            content.push(Content::text(EMPTY_RESULT_NOTICE.to_string()));
        }
        Ok(CallToolResult::success(content))
    }

    #[tool(
        description = "Run the wizard and replace the current checklist with its result. All items start uncompleted; recorded progress is only cleared by reset_checklist."
    )]
    fn generate_checklist(
        &self,
        Parameters(req): Parameters<WizardRequest>,
    ) -> Result<CallToolResult, McpError> {
        let map = match self.loaded_map() {
            Ok(m) => m,
            Err(result) => return Ok(result),
        };
        let result = Wizard::new(&map).run(&req.facets());
        let mut store = self.session.checklist();
        if let Err(e) = store.generate(&result) {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to save checklist: {}",
                e
            ))]));
        }
        let mut text = format_result(&result);
        if !result.is_empty() {
            text.push_str("\n\nChecklist generated. Use update_checklist_item to tick items off.");
        }
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Show the current checklist with completion state and progress.")]
    fn get_checklist(&self) -> Result<CallToolResult, McpError> {
        let store = self.session.checklist();
        let state = store.state();
        if state.checklist.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "No checklist. Use generate_checklist to create one.".to_string(),
            )]));
        }
        let mut out = format!("Compliance Checklist ({})\n", state.progress_label());
        for item in &state.checklist {
            out.push_str(&format!(
                "\n{}. [{}] {} ({})",
                item.order,
                if item.completed { "x" } else { " " },
                item.title,
                item.id
            ));
            if let Some(desc) = &item.description {
                out.push_str(&format!("\n   {}", desc));
            }
            if let Some(link) = &item.link {
                if let Some(target) = link.url.as_deref().or(link.file_path.as_deref()) {
                    out.push_str(&format!("\n   open: {}", target));
                }
            }
        }
        out.push_str(&match state.remaining() {
            0 => "\n\nAll tasks completed.".to_string(),
            n => format!("\n\n{} tasks remaining", n),
        });
        Ok(CallToolResult::success(vec![Content::text(out)]))
    }

    #[tool(
        description = "Mark one checklist item completed or not. Unknown item IDs are ignored."
    )]
    fn update_checklist_item(
        &self,
        Parameters(req): Parameters<UpdateChecklistItemRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut store = self.session.checklist();
        match store.update_item(&req.item_id, req.completed) {
            Ok(true) => Ok(CallToolResult::success(vec![Content::text(format!(
                "{} '{}' ({}).",
                if req.completed { "Completed" } else { "Reopened" },
                req.item_id,
                store.state().progress_label()
            ))])),
            Ok(false) => Ok(CallToolResult::success(vec![Content::text(format!(
                "No checklist item '{}'; nothing changed.",
                req.item_id
            ))])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to save checklist: {}",
                e
            ))])),
        }
    }

    #[tool(description = "Clear the checklist and all completion progress.")]
    fn reset_checklist(&self) -> Result<CallToolResult, McpError> {
        match self.session.checklist().reset() {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(
                "Checklist cleared.".to_string(),
            )])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to save checklist: {}",
                e
            ))])),
        }
    }

    #[tool(
        description = "Export the current checklist (title, description, completed, order per item, plus progress) as a dated JSON file."
    )]
    fn export_checklist(
        &self,
        Parameters(req): Parameters<ExportChecklistRequest>,
    ) -> Result<CallToolResult, McpError> {
        let dir = req
            .directory
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let store = self.session.checklist();
        if store.state().checklist.is_empty() {
            return Ok(CallToolResult::error(vec![Content::text(
                "No checklist to export. Use generate_checklist first.".to_string(),
            )]));
        }
        match store.export_to(&dir, chrono::Utc::now()) {
            Ok(path) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Wrote {}",
                path.display()
            ))])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to export checklist: {}",
                e
            ))])),
        }
    }
}

#[tool_handler]
impl ServerHandler for MsmapServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Serialization error: {}", e))
}

fn format_step(i: usize, node: &MapNode) -> String {
    let code = node.code.as_deref().map(|c| format!("{} ", c)).unwrap_or_default();
    format!("{}. {}{} [{}] ({})", i + 1, code, node.title, node.doc_type.label(), node.id)
}

const EMPTY_RESULT_NOTICE: &str = "No documents required for these criteria: no matching document \
starts a critical path. Try fewer or broader roles, activities or locations.";

/// Render a wizard result. An empty result is valid and says so.
fn format_result(result: &WizardResult) -> String {
    if result.is_empty() {
        return EMPTY_RESULT_NOTICE.to_string();
    }
    let mut out = format!(
        "Compliance path: {} documents, estimated {}\n",
        result.path.len(),
        result.estimated_time
    );
    for (i, node) in result.path.iter().enumerate() {
        out.push('\n');
        out.push_str(&format_step(i, node));
    }
    out
}

const INSTRUCTIONS: &str = r#"Management system map for ISO 9001/14001/45001 documentation.

The map is a graph of documents (policies, procedures, work instructions, SOPs, risk assessments, forms, records, training, external standards) joined by typed relationships. Critical relationships form the mandatory completion path.

## Workflow
1. `map_info` to see the catalogs of roles, activities and locations.
2. `compute_path` with the person's roles, activities and locations to preview what they need to complete.
3. `generate_checklist` with the same criteria to start tracking progress.
4. `update_checklist_item` as documents are completed, `get_checklist` to review, `export_checklist` to hand over.
Use `search_nodes`, `get_node` and `get_breadcrumbs` to explore the full map, and `set_view_settings` to change which edges and standards it shows."#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the MCP protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let data_dir = msmap_core::storage::data_dir();
    let session = Arc::new(Session::from_data_dir(&data_dir)?);
    tracing::info!(map = %session.map_path().display(), "starting msmap MCP server");

    let service = MsmapServer::new(session)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}
