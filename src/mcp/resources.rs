//! Read-only MCP resources under the `svcmap://` scheme.

use rmcp::ErrorData as McpError;
use rmcp::model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents};
use serde_json::Value;

use crate::api::v1::{
    DependencyResponse, ServerResponse, ServiceResponse, server_detail, service_detail,
};
use crate::db::{
    Database, DbError, DependencyRepository, Id, ServerRepository, ServiceRepository,
};
use crate::graph::load_graph;

const MIME_JSON: &str = "application/json";

const COLLECTIONS: [(&str, &str, &str); 4] = [
    ("svcmap://servers", "Servers", "Every server in the inventory"),
    ("svcmap://services", "Services", "Every service in the inventory"),
    ("svcmap://dependencies", "Dependencies", "Every service dependency edge"),
    (
        "svcmap://graph",
        "Dependency graph",
        "Nodes and edges of the server/service graph",
    ),
];

/// Resources for `resources/list`. Single records are reachable by URI
/// (`svcmap://servers/{id}`, `svcmap://services/{id}`) but not listed.
pub fn resource_list() -> Vec<Resource> {
    COLLECTIONS
        .iter()
        .map(|(uri, name, description)| {
            RawResource::new(*uri, *name)
                .with_description(*description)
                .with_mime_type(MIME_JSON)
                .no_annotation()
        })
        .collect()
}

/// A parsed `svcmap://` URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUri {
    Servers,
    Services,
    Dependencies,
    Graph,
    Server(Id),
    Service(Id),
}

impl ResourceUri {
    pub fn parse(uri: &str) -> Option<Self> {
        let path = uri.strip_prefix("svcmap://")?;
        match path.split_once('/') {
            None => match path {
                "servers" => Some(Self::Servers),
                "services" => Some(Self::Services),
                "dependencies" => Some(Self::Dependencies),
                "graph" => Some(Self::Graph),
                _ => None,
            },
            Some(("servers", id)) => id.parse().ok().map(Self::Server),
            Some(("services", id)) => id.parse().ok().map(Self::Service),
            Some(_) => None,
        }
    }
}

async fn load<D: Database>(db: &D, resource: ResourceUri) -> Result<Value, DbError> {
    let value = match resource {
        ResourceUri::Servers => {
            let items = db.servers().list(None).await?.items;
            serde_json::to_value(items.into_iter().map(ServerResponse::from).collect::<Vec<_>>())
        }
        ResourceUri::Services => {
            let items = db.services().list(None).await?.items;
            serde_json::to_value(items.into_iter().map(ServiceResponse::from).collect::<Vec<_>>())
        }
        ResourceUri::Dependencies => {
            let items = db.dependencies().list(None).await?.items;
            serde_json::to_value(
                items
                    .into_iter()
                    .map(DependencyResponse::from)
                    .collect::<Vec<_>>(),
            )
        }
        ResourceUri::Graph => serde_json::to_value(load_graph(db).await?),
        ResourceUri::Server(id) => serde_json::to_value(server_detail(db, id).await?),
        ResourceUri::Service(id) => serde_json::to_value(service_detail(db, id).await?),
    };
    value.map_err(|e| DbError::InvalidData {
        message: e.to_string(),
        help: "The record could not be encoded as JSON".to_string(),
    })
}

/// Handle `resources/read` for one URI.
pub async fn read_resource<D: Database>(db: &D, uri: &str) -> Result<ReadResourceResult, McpError> {
    let resource = ResourceUri::parse(uri).ok_or_else(|| {
        McpError::resource_not_found(format!("unknown resource '{}'", uri), None)
    })?;

    let value = load(db, resource).await.map_err(|e| match e {
        DbError::NotFound { .. } => McpError::resource_not_found(e.to_string(), None),
        other => McpError::internal_error(other.to_string(), None),
    })?;
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;

    Ok(ReadResourceResult::new(vec![
        ResourceContents::text(text, uri).with_mime_type(MIME_JSON),
    ]))
}
