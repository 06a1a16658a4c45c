//! Dependency graph shaping.
//!
//! Turns loaded servers, services and dependency rows into the node/edge
//! structure rendered by the dashboard and returned by the API and MCP
//! bridge. Everything here is pure; callers load the collections.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::{Dependency, DependencyType, Id, Server, Service};

mod dashboard;

pub use dashboard::{DashboardSummary, RECENT_MAINTENANCE_LIMIT, load_dashboard, load_graph};

pub const DEFAULT_SERVER_COLOR: &str = "#64748b";
pub const DEFAULT_SERVICE_COLOR: &str = "#0ea5e9";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Server,
    Service,
}

/// A server or service in the rendered graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Node {
    /// `server-<id>` or `service-<id>`
    #[schema(example = "service-3")]
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    #[schema(example = "#0ea5e9")]
    pub color: String,
    /// Enclosing server node, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "server-1")]
    pub parent: Option<String>,
}

/// A dependency edge between two service nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Edge {
    #[schema(example = "dep-7")]
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
    #[schema(example = "#ef4444")]
    pub color: String,
    pub dashes: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Counts over the same inputs as [`build_graph`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GraphStats {
    pub servers: usize,
    pub services: usize,
    pub edges: usize,
    /// Edge count per dependency type; every type is present.
    pub by_type: BTreeMap<String, usize>,
}

pub fn server_node_id(id: Id) -> String {
    format!("server-{}", id)
}

pub fn service_node_id(id: Id) -> String {
    format!("service-{}", id)
}

/// Edge colour for a dependency type.
pub fn edge_color(dependency_type: DependencyType) -> &'static str {
    match dependency_type {
        DependencyType::Required => "#ef4444",
        DependencyType::Optional => "#3b82f6",
        DependencyType::Fallback => "#f59e0b",
    }
}

/// Build the graph. Output order follows input order; dependency rows whose
/// endpoints are not among `services` are skipped.
pub fn build_graph(servers: &[Server], services: &[Service], dependencies: &[Dependency]) -> Graph {
    let server_ids: HashSet<Id> = servers.iter().map(|s| s.id).collect();
    let service_ids: HashSet<Id> = services.iter().map(|s| s.id).collect();

    let mut nodes = Vec::with_capacity(servers.len() + services.len());

    for server in servers {
        nodes.push(Node {
            id: server_node_id(server.id),
            kind: NodeKind::Server,
            label: server.name.clone(),
            color: server
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVER_COLOR.to_string()),
            parent: server
                .parent_id
                .filter(|p| server_ids.contains(p))
                .map(server_node_id),
        });
    }

    for service in services {
        nodes.push(Node {
            id: service_node_id(service.id),
            kind: NodeKind::Service,
            label: service.name.clone(),
            color: service
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVICE_COLOR.to_string()),
            parent: Some(service.server_id)
                .filter(|p| server_ids.contains(p))
                .map(server_node_id),
        });
    }

    let edges = dependencies
        .iter()
        .filter(|d| service_ids.contains(&d.service_id) && service_ids.contains(&d.depends_on_id))
        .map(|d| Edge {
            id: format!("dep-{}", d.id),
            from: service_node_id(d.service_id),
            to: service_node_id(d.depends_on_id),
            label: d.label.clone(),
            dependency_type: d.dependency_type,
            color: edge_color(d.dependency_type).to_string(),
            dashes: d.dependency_type != DependencyType::Required,
        })
        .collect();

    Graph { nodes, edges }
}

/// Summarise a built graph.
pub fn graph_stats(graph: &Graph) -> GraphStats {
    let mut by_type: BTreeMap<String, usize> = DependencyType::ALL
        .iter()
        .map(|t| (t.to_string(), 0))
        .collect();
    for edge in &graph.edges {
        *by_type.entry(edge.dependency_type.to_string()).or_default() += 1;
    }

    GraphStats {
        servers: graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Server)
            .count(),
        services: graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Service)
            .count(),
        edges: graph.edges.len(),
        by_type,
    }
}

#[cfg(test)]
mod graph_test;
