use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled};

use crate::cli::api_client::ApiClient;
use crate::cli::commands::PageParams;
use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, or_dash};

#[derive(Debug, Serialize, Deserialize)]
struct ListDependenciesResponse {
    items: Vec<Dependency>,
    total: usize,
    limit: usize,
    offset: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Dependency {
    pub id: i64,
    pub service_id: i64,
    pub depends_on_id: i64,
    pub label: Option<String>,
    pub dependency_type: String,
    pub created_at: String,
}

#[derive(Tabled)]
struct DependencyDisplay {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Service")]
    service_id: i64,
    #[tabled(rename = "Depends on")]
    depends_on_id: i64,
    #[tabled(rename = "Type")]
    dependency_type: String,
    #[tabled(rename = "Label")]
    label: String,
}

impl From<&Dependency> for DependencyDisplay {
    fn from(d: &Dependency) -> Self {
        Self {
            id: d.id,
            service_id: d.service_id,
            depends_on_id: d.depends_on_id,
            dependency_type: d.dependency_type.clone(),
            label: or_dash(d.label.as_deref()),
        }
    }
}

/// List dependency edges, optionally only those touching one service
pub async fn list_dependencies(
    api_client: &ApiClient,
    service_id: Option<i64>,
    page: PageParams,
    format: &str,
) -> CliResult<String> {
    let mut params = vec![];
    if let Some(id) = service_id {
        params.push(("service_id", id.to_string()));
    }
    page.push_query(&mut params);

    let response: ListDependenciesResponse =
        api_client.get_json("/api/v1/dependencies", &params).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&response.items)?),
        _ => Ok(format_table(&response.items)),
    }
}

fn format_table(dependencies: &[Dependency]) -> String {
    if dependencies.is_empty() {
        return "No dependencies found.".to_string();
    }

    let display: Vec<DependencyDisplay> =
        dependencies.iter().map(DependencyDisplay::from).collect();
    let mut table = Table::new(display);
    apply_table_style(&mut table);
    table.to_string()
}
