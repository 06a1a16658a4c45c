use crate::cli::api_client::ApiClient;
use crate::cli::commands::PageParams;
use crate::cli::commands::service::*;
use crate::cli::commands::test_support::spawn_test_server;
use crate::cli::error::CliError;
use crate::db::testing::{dependency_input, server_input, service_input};
use crate::db::{
    Database, DependencyRepository, DependencyType, ServerRepository, ServiceInput, ServicePort,
    ServiceRepository,
};

#[test]
fn test_format_ports() {
    assert_eq!(format_ports(&[]), "-");
    let ports = vec![
        Port {
            port: 80,
            label: String::new(),
        },
        Port {
            port: 443,
            label: "https".to_string(),
        },
    ];
    assert_eq!(format_ports(&ports), "80, 443/https");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_services_filtered_by_server() {
    let server = spawn_test_server().await;
    let web = server.db().servers().create(&server_input("web")).await.unwrap();
    let db = server.db().servers().create(&server_input("db")).await.unwrap();
    server
        .db()
        .services()
        .create(&ServiceInput {
            ports: vec![ServicePort {
                port: 443,
                label: "https".to_string(),
            }],
            ..service_input(web.id, "nginx")
        })
        .await
        .unwrap();
    server
        .db()
        .services()
        .create(&service_input(db.id, "postgres"))
        .await
        .unwrap();

    let table = list_services(&server.client, None, None, PageParams::default(), "table")
        .await
        .unwrap();
    assert!(table.contains("nginx"));
    assert!(table.contains("443/https"));
    assert!(table.contains("2 of 2 services"));

    let json = list_services(
        &server.client,
        Some(db.id),
        None,
        PageParams::default(),
        "json",
    )
    .await
    .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let items = parsed.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "postgres");

    let none = list_services(
        &server.client,
        None,
        Some("redis"),
        PageParams::default(),
        "table",
    )
    .await
    .unwrap();
    assert_eq!(none, "No services found.");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_service_shows_both_directions() {
    let server = spawn_test_server().await;
    let host = server.db().servers().create(&server_input("host")).await.unwrap();
    let app = server
        .db()
        .services()
        .create(&service_input(host.id, "app"))
        .await
        .unwrap();
    let pg = server
        .db()
        .services()
        .create(&service_input(host.id, "postgres"))
        .await
        .unwrap();
    let proxy = server
        .db()
        .services()
        .create(&service_input(host.id, "proxy"))
        .await
        .unwrap();
    server
        .db()
        .dependencies()
        .create(&dependency_input(app.id, pg.id, DependencyType::Required))
        .await
        .unwrap();
    server
        .db()
        .dependencies()
        .create(&dependency_input(proxy.id, app.id, DependencyType::Optional))
        .await
        .unwrap();

    let table = get_service(&server.client, app.id, "table").await.unwrap();
    assert!(table.contains("postgres (required)"));
    assert!(table.contains("proxy (optional)"));

    let json = get_service(&server.client, app.id, "json").await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["name"], "app");
    assert_eq!(parsed["dependencies"][0]["service_id"], pg.id);
    assert_eq!(parsed["dependents"][0]["service_id"], proxy.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_missing_service() {
    let server = spawn_test_server().await;

    let err = get_service(&server.client, 7, "json").await.unwrap_err();
    assert!(matches!(err, CliError::ApiError { status: 404, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_key_fails_before_request() {
    let server = spawn_test_server().await;
    let client = ApiClient::new(Some(server.url.clone()), Some(String::new()));

    let err = list_services(&client, None, None, PageParams::default(), "json")
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::MissingApiKey));
}
