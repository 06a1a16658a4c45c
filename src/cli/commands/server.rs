use serde::{Deserialize, Serialize};
use tabled::builder::Builder;
use tabled::{Table, Tabled};

use crate::cli::api_client::ApiClient;
use crate::cli::commands::PageParams;
use crate::cli::commands::service::Service;
use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, or_dash, truncate_with_ellipsis};

#[derive(Debug, Serialize, Deserialize)]
struct ListServersResponse {
    items: Vec<Server>,
    total: usize,
    limit: usize,
    offset: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub ip: Option<String>,
    pub hoster: Option<String>,
    pub location: Option<String>,
    pub parent_id: Option<i64>,
    pub color: Option<String>,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerDetail {
    #[serde(flatten)]
    pub server: Server,
    pub services: Vec<Service>,
    pub children: Vec<Server>,
}

#[derive(Tabled)]
struct ServerDisplay {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Hoster")]
    hoster: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Parent")]
    parent: String,
}

impl From<&Server> for ServerDisplay {
    fn from(server: &Server) -> Self {
        Self {
            id: server.id,
            name: truncate_with_ellipsis(&server.name, 40),
            ip: or_dash(server.ip.as_deref()),
            hoster: or_dash(server.hoster.as_deref()),
            location: or_dash(server.location.as_deref()),
            parent: server
                .parent_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// List servers with optional filtering
pub async fn list_servers(
    api_client: &ApiClient,
    query: Option<&str>,
    hoster: Option<&str>,
    page: PageParams,
    format: &str,
) -> CliResult<String> {
    let mut params = vec![];
    if let Some(q) = query {
        params.push(("q", q.to_string()));
    }
    if let Some(h) = hoster {
        params.push(("hoster", h.to_string()));
    }
    page.push_query(&mut params);

    let response: ListServersResponse = api_client.get_json("/api/v1/servers", &params).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&response.items)?),
        _ => Ok(format_table(&response.items, response.total)),
    }
}

fn format_table(servers: &[Server], total: usize) -> String {
    if servers.is_empty() {
        return "No servers found.".to_string();
    }

    let display: Vec<ServerDisplay> = servers.iter().map(ServerDisplay::from).collect();
    let mut table = Table::new(display);
    apply_table_style(&mut table);
    format!("{}\n{} of {} servers", table, servers.len(), total)
}

/// Get a single server with its services and child servers
pub async fn get_server(api_client: &ApiClient, id: i64, format: &str) -> CliResult<String> {
    let detail: ServerDetail = api_client
        .get_json(&format!("/api/v1/servers/{}", id), &[])
        .await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&detail)?),
        _ => Ok(format_server_detail(&detail)),
    }
}

fn format_server_detail(detail: &ServerDetail) -> String {
    let server = &detail.server;
    let mut builder = Builder::default();

    builder.push_record(["Server ID", &server.id.to_string()]);
    builder.push_record(["Name", &server.name]);
    builder.push_record(["IP", &or_dash(server.ip.as_deref())]);
    builder.push_record(["Hoster", &or_dash(server.hoster.as_deref())]);
    builder.push_record(["Location", &or_dash(server.location.as_deref())]);
    if let Some(parent_id) = server.parent_id {
        builder.push_record(["Parent", &parent_id.to_string()]);
    }
    if let Some(note) = &server.note {
        builder.push_record(["Note", note]);
    }

    let services = detail
        .services
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    builder.push_record(["Services", &or_dash(Some(services.as_str()))]);

    let children = detail
        .children
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    builder.push_record(["Children", &or_dash(Some(children.as_str()))]);
    builder.push_record(["Created", &server.created_at]);
    builder.push_record(["Updated", &server.updated_at]);

    let mut table = builder.build();
    apply_table_style(&mut table);
    table.to_string()
}
