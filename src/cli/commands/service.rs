use serde::{Deserialize, Serialize};
use tabled::builder::Builder;
use tabled::{Table, Tabled};

use crate::cli::api_client::ApiClient;
use crate::cli::commands::PageParams;
use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, format_date, or_dash, truncate_with_ellipsis};

#[derive(Debug, Serialize, Deserialize)]
struct ListServicesResponse {
    items: Vec<Service>,
    total: usize,
    limit: usize,
    offset: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Port {
    pub port: u16,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Service {
    pub id: i64,
    pub server_id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub path: Option<String>,
    pub repo_url: Option<String>,
    pub doc_path: Option<String>,
    #[serde(default)]
    pub ports: Vec<Port>,
    pub last_maintenance_at: Option<String>,
    pub color: Option<String>,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One end of a dependency edge as seen from a service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Linked {
    pub dependency_id: i64,
    pub service_id: i64,
    pub name: String,
    pub server_id: i64,
    pub label: Option<String>,
    pub dependency_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceDetail {
    #[serde(flatten)]
    pub service: Service,
    pub dependencies: Vec<Linked>,
    pub dependents: Vec<Linked>,
}

#[derive(Tabled)]
struct ServiceDisplay {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Server")]
    server_id: i64,
    #[tabled(rename = "Ports")]
    ports: String,
    #[tabled(rename = "Maintained")]
    maintained: String,
}

pub fn format_ports(ports: &[Port]) -> String {
    if ports.is_empty() {
        return "-".to_string();
    }
    ports
        .iter()
        .map(|p| {
            if p.label.is_empty() {
                p.port.to_string()
            } else {
                format!("{}/{}", p.port, p.label)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<&Service> for ServiceDisplay {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id,
            name: truncate_with_ellipsis(&service.name, 40),
            server_id: service.server_id,
            ports: format_ports(&service.ports),
            maintained: format_date(service.last_maintenance_at.as_deref()),
        }
    }
}

/// List services with optional filtering
pub async fn list_services(
    api_client: &ApiClient,
    server_id: Option<i64>,
    query: Option<&str>,
    page: PageParams,
    format: &str,
) -> CliResult<String> {
    let mut params = vec![];
    if let Some(id) = server_id {
        params.push(("server_id", id.to_string()));
    }
    if let Some(q) = query {
        params.push(("q", q.to_string()));
    }
    page.push_query(&mut params);

    let response: ListServicesResponse = api_client.get_json("/api/v1/services", &params).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&response.items)?),
        _ => Ok(format_table(&response.items, response.total)),
    }
}

fn format_table(services: &[Service], total: usize) -> String {
    if services.is_empty() {
        return "No services found.".to_string();
    }

    let display: Vec<ServiceDisplay> = services.iter().map(ServiceDisplay::from).collect();
    let mut table = Table::new(display);
    apply_table_style(&mut table);
    format!("{}\n{} of {} services", table, services.len(), total)
}

/// Get a single service with both directions of its dependencies
pub async fn get_service(api_client: &ApiClient, id: i64, format: &str) -> CliResult<String> {
    let detail: ServiceDetail = api_client
        .get_json(&format!("/api/v1/services/{}", id), &[])
        .await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&detail)?),
        _ => Ok(format_service_detail(&detail)),
    }
}

fn format_linked(linked: &[Linked]) -> String {
    let names = linked
        .iter()
        .map(|l| format!("{} ({})", l.name, l.dependency_type))
        .collect::<Vec<_>>()
        .join(", ");
    or_dash(Some(names.as_str()))
}

fn format_service_detail(detail: &ServiceDetail) -> String {
    let service = &detail.service;
    let mut builder = Builder::default();

    builder.push_record(["Service ID", &service.id.to_string()]);
    builder.push_record(["Name", &service.name]);
    builder.push_record(["Server", &service.server_id.to_string()]);
    builder.push_record(["Ports", &format_ports(&service.ports)]);
    builder.push_record(["Path", &or_dash(service.path.as_deref())]);
    builder.push_record(["Repository", &or_dash(service.repo_url.as_deref())]);
    builder.push_record(["Docs", &or_dash(service.doc_path.as_deref())]);
    builder.push_record([
        "Maintained",
        &format_date(service.last_maintenance_at.as_deref()),
    ]);
    builder.push_record(["Depends on", &format_linked(&detail.dependencies)]);
    builder.push_record(["Used by", &format_linked(&detail.dependents)]);
    if let Some(note) = &service.note {
        builder.push_record(["Note", note]);
    }

    let mut table = builder.build();
    apply_table_style(&mut table);
    table.to_string()
}
