//! Tests for the MCP server, through `ServerHandler` and the `/mcp` route.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use rmcp::ServerHandler;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use super::McpServer;
use crate::api::v1::test_support::{TestApp, json_body, test_app};
use crate::db::testing::{server_input, setup_db};
use crate::db::{Database, ServerRepository};

const INVALID_PARAMS: i64 = -32602;
const METHOD_NOT_FOUND: i64 = -32601;

fn mcp_request(key: Option<&str>, message: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json, text/event-stream");
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    builder
        .body(Body::from(serde_json::to_vec(message).unwrap()))
        .unwrap()
}

/// Send one JSON-RPC request and return the decoded response.
async fn rpc(app: &TestApp, message: Value) -> Value {
    let response = app
        .router
        .clone()
        .oneshot(mcp_request(Some(&app.key), &message))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    json_body(response).await
}

#[tokio::test(flavor = "multi_thread")]
async fn server_info_advertises_tools_and_resources() {
    let server = McpServer::new(Arc::new(setup_db().await));

    let info = server.get_info();

    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.resources.is_some());
    assert_eq!(info.server_info.name, "svcmap");
    assert!(info.instructions.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn mcp_route_requires_api_key() {
    let app = test_app().await;

    let response = app
        .router
        .oneshot(mcp_request(
            None,
            &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread")]
async fn initialize_reports_protocol_and_capabilities() {
    let app = test_app().await;

    let response = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "tests", "version": "0.0.0"}
            }
        }),
    )
    .await;

    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "svcmap");
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert!(response["result"]["capabilities"]["resources"].is_object());
}

#[tokio::test(flavor = "multi_thread")]
async fn ping_returns_empty_object() {
    let app = test_app().await;

    let response = rpc(&app, json!({"jsonrpc": "2.0", "id": "a", "method": "ping"})).await;

    assert_eq!(response["id"], "a");
    assert_eq!(response["result"], json!({}));
}

#[tokio::test(flavor = "multi_thread")]
async fn notifications_are_accepted_without_body() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(mcp_request(
            Some(&app.key),
            &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn null_id_is_never_answered_as_a_request() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(mcp_request(
            Some(&app.key),
            &json!({"jsonrpc": "2.0", "id": null, "method": "ping"}),
        ))
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn tools_list_describes_every_tool() {
    let app = test_app().await;

    let response = rpc(&app, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;

    let tools = response["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "get_dashboard_stats",
            "get_dependency_graph",
            "get_server",
            "get_service",
            "list_dependencies",
            "list_servers",
            "list_services",
            "search_inventory",
        ]
    );
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object", "{}", tool["name"]);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn tools_call_returns_text_content() {
    let app = test_app().await;
    app.db().servers().create(&server_input("web-01")).await.unwrap();

    let response = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "list_servers"}
        }),
    )
    .await;

    assert_eq!(response["result"]["isError"], false);
    assert_eq!(response["result"]["content"][0]["type"], "text");
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["total"], 1);
    assert_eq!(payload["items"][0]["name"], "web-01");
}

#[tokio::test(flavor = "multi_thread")]
async fn tool_failure_is_reported_in_result() {
    let app = test_app().await;

    let response = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "get_server", "arguments": {"id": 99}}
        }),
    )
    .await;

    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("not found"), "{}", text);
}

#[tokio::test(flavor = "multi_thread")]
async fn protocol_errors_use_standard_codes() {
    let app = test_app().await;

    let unknown_method = rpc(
        &app,
        json!({"jsonrpc": "2.0", "id": 2, "method": "inventory/drop"}),
    )
    .await;
    assert_eq!(unknown_method["id"], 2);
    assert_eq!(unknown_method["error"]["code"], METHOD_NOT_FOUND);

    let unknown_tool = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "drop_everything", "arguments": {}}
        }),
    )
    .await;
    assert_eq!(unknown_tool["error"]["code"], INVALID_PARAMS);

    let bad_arguments = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "get_server", "arguments": {"id": "abc"}}
        }),
    )
    .await;
    assert_eq!(bad_arguments["error"]["code"], INVALID_PARAMS);

    let missing_query = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "search_inventory"}
        }),
    )
    .await;
    assert_eq!(missing_query["error"]["code"], INVALID_PARAMS);
}

#[tokio::test(flavor = "multi_thread")]
async fn resources_are_listed_and_readable() {
    let app = test_app().await;
    let server = app.db().servers().create(&server_input("web-01")).await.unwrap();

    let listed = rpc(
        &app,
        json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}),
    )
    .await;
    let uris: Vec<&str> = listed["result"]["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uri"].as_str().unwrap())
        .collect();
    assert!(uris.contains(&"svcmap://servers"));
    assert!(uris.contains(&"svcmap://graph"));

    let uri = format!("svcmap://servers/{}", server.id);
    let read = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "resources/read",
            "params": {"uri": uri}
        }),
    )
    .await;
    let contents = &read["result"]["contents"][0];
    assert_eq!(contents["uri"], uri);
    assert_eq!(contents["mimeType"], "application/json");
    let detail: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
    assert_eq!(detail["name"], "web-01");
}
