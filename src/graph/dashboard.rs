//! Loading the graph and dashboard aggregates from a [`Database`].

use crate::db::{
    Database, DbResult, DependencyRepository, HosterRepository, ServerRepository, Service,
    ServiceRepository,
};

use super::{Graph, GraphStats, build_graph, graph_stats};

/// Number of services listed under recent maintenance.
pub const RECENT_MAINTENANCE_LIMIT: usize = 5;

/// Aggregates shown on the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub servers: usize,
    pub services: usize,
    pub dependencies: usize,
    pub hosters: usize,
    pub stats: GraphStats,
    pub recent_maintenance: Vec<Service>,
}

/// Load every server, service and dependency row and shape the graph.
pub async fn load_graph<D: Database>(db: &D) -> DbResult<Graph> {
    let servers = db.servers().list(None).await?;
    let services = db.services().list(None).await?;
    let dependencies = db.dependencies().list(None).await?;
    Ok(build_graph(
        &servers.items,
        &services.items,
        &dependencies.items,
    ))
}

pub async fn load_dashboard<D: Database>(db: &D) -> DbResult<(DashboardSummary, Graph)> {
    let graph = load_graph(db).await?;
    let stats = graph_stats(&graph);
    let hosters = db.hosters().list(true).await?;
    let recent_maintenance = db
        .services()
        .recently_maintained(RECENT_MAINTENANCE_LIMIT)
        .await?
        .into_iter()
        .filter(|s| s.last_maintenance_at.is_some())
        .collect();

    let summary = DashboardSummary {
        servers: stats.servers,
        services: stats.services,
        dependencies: stats.edges,
        hosters: hosters.len(),
        stats,
        recent_maintenance,
    };
    Ok((summary, graph))
}
