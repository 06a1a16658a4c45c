//! Tests for graph shaping.

use chrono::Utc;

use super::*;

fn server(id: Id, parent_id: Option<Id>, color: Option<&str>) -> Server {
    let now = Utc::now();
    Server {
        id,
        name: format!("srv{}", id),
        ip: None,
        hoster: None,
        location: None,
        parent_id,
        color: color.map(str::to_string),
        note: None,
        created_at: now,
        updated_at: now,
    }
}

fn service(id: Id, server_id: Id, color: Option<&str>) -> Service {
    let now = Utc::now();
    Service {
        id,
        server_id,
        name: format!("svc{}", id),
        icon: None,
        path: None,
        repo_url: None,
        doc_path: None,
        ports: vec![],
        last_maintenance_at: None,
        color: color.map(str::to_string),
        note: None,
        created_at: now,
        updated_at: now,
    }
}

fn dependency(id: Id, from: Id, to: Id, dependency_type: DependencyType) -> Dependency {
    Dependency {
        id,
        service_id: from,
        depends_on_id: to,
        label: Some(format!("edge{}", id)),
        dependency_type,
        created_at: Utc::now(),
    }
}

#[test]
fn one_node_per_server_and_service() {
    let servers = vec![server(1, None, None), server(2, Some(1), Some("#000000"))];
    let services = vec![service(10, 1, None), service(11, 2, Some("#ffffff"))];

    let graph = build_graph(&servers, &services, &[]);

    let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["server-1", "server-2", "service-10", "service-11"]);
    assert!(graph.edges.is_empty());

    assert_eq!(graph.nodes[0].color, DEFAULT_SERVER_COLOR);
    assert_eq!(graph.nodes[0].parent, None);
    assert_eq!(graph.nodes[1].color, "#000000");
    assert_eq!(graph.nodes[1].parent.as_deref(), Some("server-1"));
    assert_eq!(graph.nodes[2].color, DEFAULT_SERVICE_COLOR);
    assert_eq!(graph.nodes[2].parent.as_deref(), Some("server-1"));
    assert_eq!(graph.nodes[3].kind, NodeKind::Service);
    assert_eq!(graph.nodes[3].label, "svc11");
}

#[test]
fn edges_are_coloured_by_type() {
    let servers = vec![server(1, None, None)];
    let services = vec![service(1, 1, None), service(2, 1, None), service(3, 1, None)];
    let deps = vec![
        dependency(1, 1, 2, DependencyType::Required),
        dependency(2, 1, 3, DependencyType::Optional),
        dependency(3, 2, 3, DependencyType::Fallback),
    ];

    let graph = build_graph(&servers, &services, &deps);
    assert_eq!(graph.edges.len(), 3);

    let required = &graph.edges[0];
    assert_eq!(required.id, "dep-1");
    assert_eq!(required.from, "service-1");
    assert_eq!(required.to, "service-2");
    assert_eq!(required.color, "#ef4444");
    assert!(!required.dashes);
    assert_eq!(required.label.as_deref(), Some("edge1"));

    assert_eq!(graph.edges[1].color, "#3b82f6");
    assert!(graph.edges[1].dashes);
    assert_eq!(graph.edges[2].color, "#f59e0b");
    assert!(graph.edges[2].dashes);
}

#[test]
fn edges_with_missing_endpoints_are_skipped() {
    let servers = vec![server(1, None, None)];
    let services = vec![service(1, 1, None)];
    let deps = vec![
        dependency(1, 1, 99, DependencyType::Required),
        dependency(2, 98, 1, DependencyType::Required),
    ];

    let graph = build_graph(&servers, &services, &deps);
    assert!(graph.edges.is_empty());
}

#[test]
fn parent_outside_loaded_servers_is_dropped() {
    let graph = build_graph(&[server(2, Some(1), None)], &[service(5, 7, None)], &[]);
    assert_eq!(graph.nodes[0].parent, None);
    assert_eq!(graph.nodes[1].parent, None);
}

#[test]
fn edge_serializes_type_field() {
    let graph = build_graph(
        &[server(1, None, None)],
        &[service(1, 1, None), service(2, 1, None)],
        &[dependency(4, 1, 2, DependencyType::Optional)],
    );
    let json = serde_json::to_value(&graph.edges[0]).unwrap();
    assert_eq!(json["type"], "optional");
    assert_eq!(json["dashes"], true);
}

#[test]
fn stats_count_nodes_and_edge_types() {
    let servers = vec![server(1, None, None), server(2, None, None)];
    let services = vec![service(1, 1, None), service(2, 2, None), service(3, 2, None)];
    let deps = vec![
        dependency(1, 1, 2, DependencyType::Required),
        dependency(2, 1, 3, DependencyType::Required),
        dependency(3, 2, 3, DependencyType::Fallback),
    ];

    let stats = graph_stats(&build_graph(&servers, &services, &deps));
    assert_eq!(stats.servers, 2);
    assert_eq!(stats.services, 3);
    assert_eq!(stats.edges, 3);
    assert_eq!(stats.by_type["required"], 2);
    assert_eq!(stats.by_type["optional"], 0);
    assert_eq!(stats.by_type["fallback"], 1);
}
