use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::test_support::{form_request, location, page_request, web_app};
use crate::api::v1::test_support::json_body;
use crate::auth::session::FlashKind;
use crate::db::testing::{dependency_input, server_input, service_input};
use crate::db::{
    Database, DependencyRepository, DependencyType, ServerInput, ServerRepository,
    ServiceRepository,
};

#[tokio::test(flavor = "multi_thread")]
async fn dashboard_page_carries_stats_and_graph() {
    let app = web_app().await;
    let (session_id, user) = app.login().await;
    let server = app.db().servers().create(&server_input("web-01")).await.unwrap();
    let api = app
        .db()
        .services()
        .create(&service_input(server.id, "api"))
        .await
        .unwrap();
    let db = app
        .db()
        .services()
        .create(&service_input(server.id, "postgres"))
        .await
        .unwrap();
    app.db()
        .dependencies()
        .create(&dependency_input(api.id, db.id, DependencyType::Required))
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(page_request("GET", "/", &session_id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    assert_eq!(page["component"], "dashboard");
    assert_eq!(page["url"], "/");
    assert_eq!(page["props"]["user"]["id"], user.id);
    assert_eq!(page["props"]["stats"]["servers"], 1);
    assert_eq!(page["props"]["stats"]["services"], 2);
    assert_eq!(page["props"]["stats"]["dependencies"], 1);
    assert_eq!(page["props"]["graph"]["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(page["props"]["graph"]["edges"].as_array().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn flash_is_shown_once() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    app.state
        .sessions()
        .flash(&session_id, FlashKind::Info, "hello");

    let first = app
        .router
        .clone()
        .oneshot(page_request("GET", "/servers", &session_id))
        .await
        .unwrap();
    let first = json_body(first).await;
    assert_eq!(first["flash"][0]["message"], "hello");
    assert_eq!(first["flash"][0]["kind"], "info");

    let second = app
        .router
        .oneshot(page_request("GET", "/servers", &session_id))
        .await
        .unwrap();
    let second = json_body(second).await;
    assert!(second["flash"].as_array().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn servers_index_applies_filters() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    app.db()
        .servers()
        .create(&ServerInput {
            hoster: Some("hetzner".to_string()),
            ..server_input("web-01")
        })
        .await
        .unwrap();
    app.db()
        .servers()
        .create(&ServerInput {
            hoster: Some("ovh".to_string()),
            ..server_input("db-01")
        })
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(page_request("GET", "/servers?hoster=ovh", &session_id))
        .await
        .unwrap();

    let page = json_body(response).await;
    assert_eq!(page["component"], "servers/index");
    assert_eq!(page["url"], "/servers?hoster=ovh");
    assert_eq!(page["props"]["filters"]["hoster"], "ovh");
    let servers = page["props"]["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["name"], "db-01");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_show_includes_parent_and_candidates() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    let host = app.db().servers().create(&server_input("host")).await.unwrap();
    let vm = app
        .db()
        .servers()
        .create(&ServerInput {
            parent_id: Some(host.id),
            ..server_input("vm")
        })
        .await
        .unwrap();
    app.db()
        .services()
        .create(&service_input(vm.id, "nginx"))
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(page_request(
            "GET",
            &format!("/servers/{}", vm.id),
            &session_id,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    assert_eq!(page["component"], "servers/show");
    assert_eq!(page["props"]["server"]["name"], "vm");
    assert_eq!(page["props"]["server"]["services"][0]["name"], "nginx");
    assert_eq!(page["props"]["parent"]["name"], "host");
    let candidates = page["props"]["servers"].as_array().unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["id"], host.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_server_flashes_and_redirects() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(page_request("GET", "/servers/999", &session_id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/servers");
    let flash = app.flashes(&session_id);
    assert_eq!(flash[0].kind, FlashKind::Error);
    assert!(flash[0].message.contains("not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn store_server_redirects_to_new_server() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "POST",
            "/servers",
            &session_id,
            Some("/servers"),
            &json!({"name": "web-01", "ip": "10.0.0.1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let servers = app.db().servers().list(None).await.unwrap();
    assert_eq!(servers.total, 1);
    let server = &servers.items[0];
    assert_eq!(location(&response), format!("/servers/{}", server.id));
    assert_eq!(server.ip.as_deref(), Some("10.0.0.1"));

    let flash = app.flashes(&session_id);
    assert_eq!(flash[0].kind, FlashKind::Success);
    assert_eq!(flash[0].message, "Server 'web-01' created");
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_server_flashes_error_and_goes_back() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "POST",
            "/servers",
            &session_id,
            Some("http://localhost:3000/servers?q=web"),
            &json!({"name": "", "ip": "999.1.1.1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/servers?q=web");
    assert_eq!(app.db().servers().count().await.unwrap(), 0);

    let flash = app.flashes(&session_id);
    assert_eq!(flash[0].kind, FlashKind::Error);
    assert!(flash[0].message.contains("name"));
    assert!(flash[0].message.contains("ip"));
}

#[tokio::test(flavor = "multi_thread")]
async fn update_server_goes_back_to_referer() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    let server = app.db().servers().create(&server_input("web-01")).await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "PUT",
            &format!("/servers/{}", server.id),
            &session_id,
            Some("/servers"),
            &json!({"location": "fsn1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/servers");
    let updated = app.db().servers().get(server.id).await.unwrap();
    assert_eq!(updated.location.as_deref(), Some("fsn1"));
    assert_eq!(updated.name, "web-01");
}

#[tokio::test(flavor = "multi_thread")]
async fn off_site_referer_is_ignored() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    let server = app.db().servers().create(&server_input("web-01")).await.unwrap();

    let response = app
        .router
        .oneshot(form_request(
            "PUT",
            &format!("/servers/{}", server.id),
            &session_id,
            Some("//evil.example.com/phish"),
            &json!({"note": "x"}),
        ))
        .await
        .unwrap();

    assert_eq!(location(&response), format!("/servers/{}", server.id));
}

#[tokio::test(flavor = "multi_thread")]
async fn destroy_server_cascades_and_redirects() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    let server = app.db().servers().create(&server_input("web-01")).await.unwrap();
    app.db()
        .services()
        .create(&service_input(server.id, "nginx"))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(page_request(
            "DELETE",
            &format!("/servers/{}", server.id),
            &session_id,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/servers");
    assert_eq!(app.db().servers().count().await.unwrap(), 0);
    assert_eq!(app.db().services().count().await.unwrap(), 0);
    assert_eq!(
        app.flashes(&session_id)[0].message,
        "Server 'web-01' deleted"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn services_index_filters_by_server() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    let a = app.db().servers().create(&server_input("a")).await.unwrap();
    let b = app.db().servers().create(&server_input("b")).await.unwrap();
    app.db()
        .services()
        .create(&service_input(a.id, "redis"))
        .await
        .unwrap();
    app.db()
        .services()
        .create(&service_input(b.id, "mysql"))
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(page_request(
            "GET",
            &format!("/services?server_id={}", b.id),
            &session_id,
        ))
        .await
        .unwrap();

    let page = json_body(response).await;
    assert_eq!(page["component"], "services/index");
    let services = page["props"]["services"].as_array().unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0]["name"], "mysql");
    assert_eq!(page["props"]["servers"].as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn store_service_on_unknown_server_flashes_error() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "POST",
            "/services",
            &session_id,
            None,
            &json!({"server_id": 42, "name": "ghost"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/services");
    let flash = app.flashes(&session_id);
    assert_eq!(flash[0].kind, FlashKind::Error);
    assert_eq!(flash[0].message, "Server 42 does not exist");
}

#[tokio::test(flavor = "multi_thread")]
async fn attach_and_detach_dependency_from_service_page() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    let server = app.db().servers().create(&server_input("web-01")).await.unwrap();
    let api = app
        .db()
        .services()
        .create(&service_input(server.id, "api"))
        .await
        .unwrap();
    let cache = app
        .db()
        .services()
        .create(&service_input(server.id, "redis"))
        .await
        .unwrap();
    let show = format!("/services/{}", api.id);

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "POST",
            &format!("/services/{}/dependencies", api.id),
            &session_id,
            Some(&show),
            &json!({"depends_on_id": cache.id, "dependency_type": "optional", "label": "cache"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), show);
    assert_eq!(app.flashes(&session_id)[0].message, "Dependency added");

    let page = app
        .router
        .clone()
        .oneshot(page_request("GET", &show, &session_id))
        .await
        .unwrap();
    let page = json_body(page).await;
    assert_eq!(page["component"], "services/show");
    assert_eq!(page["props"]["server"]["name"], "web-01");
    let deps = page["props"]["service"]["dependencies"].as_array().unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0]["name"], "redis");
    assert_eq!(deps[0]["dependency_type"], "optional");
    let dep_id = deps[0]["dependency_id"].as_i64().unwrap();

    // Same edge again is a conflict
    app.router
        .clone()
        .oneshot(form_request(
            "POST",
            &format!("/services/{}/dependencies", api.id),
            &session_id,
            Some(&show),
            &json!({"depends_on_id": cache.id}),
        ))
        .await
        .unwrap();
    assert_eq!(app.flashes(&session_id)[0].kind, FlashKind::Error);

    let response = app
        .router
        .clone()
        .oneshot(page_request(
            "DELETE",
            &format!("/services/{}/dependencies/{}", cache.id, dep_id),
            &session_id,
        ))
        .await
        .unwrap();
    assert_eq!(location(&response), format!("/services/{}", cache.id));
    assert_eq!(app.flashes(&session_id)[0].message, "Dependency removed");
    assert!(
        app.db()
            .dependencies()
            .dependencies_of(api.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn detach_rejects_edge_of_another_service() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    let server = app.db().servers().create(&server_input("web-01")).await.unwrap();
    let a = app
        .db()
        .services()
        .create(&service_input(server.id, "a"))
        .await
        .unwrap();
    let b = app
        .db()
        .services()
        .create(&service_input(server.id, "b"))
        .await
        .unwrap();
    let c = app
        .db()
        .services()
        .create(&service_input(server.id, "c"))
        .await
        .unwrap();
    let edge = app
        .db()
        .dependencies()
        .create(&dependency_input(a.id, b.id, DependencyType::Required))
        .await
        .unwrap();

    app.router
        .clone()
        .oneshot(page_request(
            "DELETE",
            &format!("/services/{}/dependencies/{}", c.id, edge.id),
            &session_id,
        ))
        .await
        .unwrap();

    assert_eq!(app.flashes(&session_id)[0].kind, FlashKind::Error);
    assert!(app.db().dependencies().get(edge.id).await.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn maintenance_date_is_updated_from_service_form() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    let server = app.db().servers().create(&server_input("web-01")).await.unwrap();
    let service = app
        .db()
        .services()
        .create(&service_input(server.id, "api"))
        .await
        .unwrap();

    app.router
        .clone()
        .oneshot(form_request(
            "PUT",
            &format!("/services/{}", service.id),
            &session_id,
            None,
            &json!({"last_maintenance_at": "2026-03-01T12:30:00Z", "ports": [{"port": 8080, "label": "http"}]}),
        ))
        .await
        .unwrap();

    let updated = app.db().services().get(service.id).await.unwrap();
    assert_eq!(
        updated.last_maintenance_at.unwrap().to_rfc3339(),
        "2026-03-01T12:30:00+00:00"
    );
    assert_eq!(updated.ports[0].port, 8080);
    assert_eq!(
        app.flashes(&session_id)[0].message,
        "Service 'api' updated"
    );
}
