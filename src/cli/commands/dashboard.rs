use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tabled::builder::Builder;

use crate::cli::api_client::ApiClient;
use crate::cli::commands::service::Service;
use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, format_date};

#[derive(Debug, Serialize, Deserialize)]
pub struct Stats {
    pub servers: usize,
    pub services: usize,
    pub edges: usize,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
    pub servers: usize,
    pub services: usize,
    pub dependencies: usize,
    pub hosters: usize,
    pub stats: Stats,
    pub recent_maintenance: Vec<Service>,
}

/// Inventory counts and recently maintained services
pub async fn show_dashboard(api_client: &ApiClient, format: &str) -> CliResult<String> {
    let dashboard: Dashboard = api_client.get_json("/api/v1/dashboard", &[]).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&dashboard)?),
        _ => Ok(format_dashboard(&dashboard)),
    }
}

fn format_dashboard(dashboard: &Dashboard) -> String {
    let mut builder = Builder::default();

    builder.push_record(["Servers", &dashboard.servers.to_string()]);
    builder.push_record(["Services", &dashboard.services.to_string()]);
    builder.push_record(["Dependencies", &dashboard.dependencies.to_string()]);
    builder.push_record(["Active hosters", &dashboard.hosters.to_string()]);
    for (kind, count) in &dashboard.stats.by_type {
        builder.push_record([format!("  {}", kind), count.to_string()]);
    }

    let mut table = builder.build();
    apply_table_style(&mut table);

    let mut out = table.to_string();
    if !dashboard.recent_maintenance.is_empty() {
        out.push_str("\n\nRecent maintenance:\n");
        for service in &dashboard.recent_maintenance {
            out.push_str(&format!(
                "  {}  {}\n",
                format_date(service.last_maintenance_at.as_deref()),
                service.name
            ));
        }
    }
    out
}
