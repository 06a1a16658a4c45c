//! API route configuration.

use axum::{Json, Router};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeader;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable};

use super::extract::require_api_key;
use super::state::AppState;
use super::v1::{
    self, CreateDependencyRequest, CreateServerRequest, CreateServiceRequest, DashboardResponse,
    DependencyResponse, HealthResponse, InventoryCounts, LinkedServiceResponse,
    PaginatedDependencies, PaginatedServers, PaginatedServices, ServerDetailResponse,
    ServerResponse, ServiceDetailResponse, ServiceResponse, SystemHealthResponse,
    UpdateDependencyRequest, UpdateServerRequest, UpdateServiceRequest,
};
use super::ErrorResponse;
use super::web::{self, images::IMAGE_URL_PREFIX, images::MAX_IMAGE_BYTES};
use crate::db::{Database, DependencyType, ServicePort};
use crate::graph::{Edge, Graph, GraphStats, Node, NodeKind};
use crate::mcp::create_mcp_service;

/// Build routes with generic database type.
///
/// This macro reduces boilerplate when registering handlers that are generic
/// over the Database trait. It applies the turbofish operator automatically.
macro_rules! routes {
    ($D:ty => {
        $($method:ident $path:literal => $($handler:ident)::+),* $(,)?
    }) => {{
        let router = Router::new();
        $(
            let router = router.route($path, $method($($handler)::+::<$D>));
        )*
        router
    }};
}

pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Registers the bearer API key scheme referenced by `security(("api_key" = []))`.
struct ApiKeyScheme;

impl Modify for ApiKeyScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("sk_<prefix>_<secret>")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "svcmap API",
        version = "0.1.0",
        description = "Inventory of servers and services with their dependency map",
        license(name = "MIT")
    ),
    modifiers(&ApiKeyScheme),
    paths(
        v1::health,
        v1::system_health,
        v1::list_servers,
        v1::get_server,
        v1::create_server,
        v1::update_server,
        v1::delete_server,
        v1::list_server_services,
        v1::list_services,
        v1::get_service,
        v1::create_service,
        v1::update_service,
        v1::delete_service,
        v1::mark_service_maintained,
        v1::list_dependencies,
        v1::get_dependency,
        v1::create_dependency,
        v1::update_dependency,
        v1::delete_dependency,
        v1::get_dashboard,
        v1::get_dependency_graph,
    ),
    components(
        schemas(
            HealthResponse,
            SystemHealthResponse,
            InventoryCounts,
            ServerResponse,
            ServerDetailResponse,
            CreateServerRequest,
            UpdateServerRequest,
            PaginatedServers,
            ServiceResponse,
            ServiceDetailResponse,
            LinkedServiceResponse,
            CreateServiceRequest,
            UpdateServiceRequest,
            PaginatedServices,
            ServicePort,
            DependencyResponse,
            CreateDependencyRequest,
            UpdateDependencyRequest,
            PaginatedDependencies,
            DependencyType,
            DashboardResponse,
            Graph,
            GraphStats,
            Node,
            NodeKind,
            Edge,
            ErrorResponse,
        )
    ),
    tags(
        (name = "system", description = "Health and status endpoints"),
        (name = "servers", description = "Server inventory"),
        (name = "services", description = "Services running on servers"),
        (name = "dependencies", description = "Service-to-service dependency edges"),
        (name = "dashboard", description = "Aggregates and the dependency graph")
    )
)]
pub struct ApiDoc;

/// Create the application router.
///
/// `/api/v1/*` and `/mcp` require an API key, the web pages a session.
/// The OpenAPI document is always served; the Scalar UI only when
/// `enable_docs` is set.
pub fn create_router<D: Database + 'static>(state: AppState<D>, enable_docs: bool) -> Router {
    let api = ApiDoc::openapi();

    let v1_routes = routes!(D => {
        get "/api/v1/system/health" => v1::system_health,
        get "/api/v1/servers" => v1::list_servers,
        post "/api/v1/servers" => v1::create_server,
        get "/api/v1/servers/{id}" => v1::get_server,
        put "/api/v1/servers/{id}" => v1::update_server,
        delete "/api/v1/servers/{id}" => v1::delete_server,
        get "/api/v1/servers/{id}/services" => v1::list_server_services,
        get "/api/v1/services" => v1::list_services,
        post "/api/v1/services" => v1::create_service,
        get "/api/v1/services/{id}" => v1::get_service,
        put "/api/v1/services/{id}" => v1::update_service,
        delete "/api/v1/services/{id}" => v1::delete_service,
        post "/api/v1/services/{id}/maintenance" => v1::mark_service_maintained,
        get "/api/v1/dependencies" => v1::list_dependencies,
        post "/api/v1/dependencies" => v1::create_dependency,
        get "/api/v1/dependencies/{id}" => v1::get_dependency,
        put "/api/v1/dependencies/{id}" => v1::update_dependency,
        delete "/api/v1/dependencies/{id}" => v1::delete_dependency,
        get "/api/v1/dashboard" => v1::get_dashboard,
        get "/api/v1/dashboard/graph" => v1::get_dependency_graph,
    })
    .route_layer(from_fn_with_state(state.clone(), require_api_key));

    let mcp_routes = Router::new()
        .nest_service("/mcp", create_mcp_service(state.shared_db()))
        .route_layer(from_fn_with_state(state.clone(), require_api_key));

    let page_routes = routes!(D => {
        get "/" => web::dashboard::dashboard,
        get "/servers" => web::servers::index,
        post "/servers" => web::servers::store,
        get "/servers/{id}" => web::servers::show,
        put "/servers/{id}" => web::servers::update,
        delete "/servers/{id}" => web::servers::destroy,
        get "/services" => web::services::index,
        post "/services" => web::services::store,
        get "/services/{id}" => web::services::show,
        put "/services/{id}" => web::services::update,
        delete "/services/{id}" => web::services::destroy,
        post "/services/{id}/dependencies" => web::services::attach_dependency,
        delete "/services/{id}/dependencies/{dep_id}" => web::services::detach_dependency,
        get "/settings" => web::settings::index,
        post "/settings/hosters" => web::settings::store_hoster,
        post "/settings/hosters/reorder" => web::settings::reorder_hosters,
        put "/settings/hosters/{id}" => web::settings::update_hoster,
        delete "/settings/hosters/{id}" => web::settings::destroy_hoster,
        post "/settings/api-keys" => web::settings::store_api_key,
        delete "/settings/api-keys/{id}" => web::settings::destroy_api_key,
        get "/auth/login" => web::auth::login,
        get "/auth/callback" => web::auth::callback,
        get "/logout" => web::auth::logout,
        post "/logout" => web::auth::logout,
    });

    let upload_routes = routes!(D => {
        post "/service-images" => web::images::upload,
    })
    // Multipart framing on top of the largest accepted image
    .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024));

    let mut router = Router::new()
        .route("/health", get(v1::health))
        .merge(v1_routes)
        .merge(mcp_routes)
        .merge(page_routes)
        .merge(upload_routes)
        .nest_service(
            IMAGE_URL_PREFIX,
            SetResponseHeader::overriding(
                ServeDir::new(state.upload_dir()),
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        );

    if enable_docs {
        router = router.merge(Scalar::with_url("/docs", api.clone()));
    }

    let document = Json(api);
    router
        .route(
            OPENAPI_PATH,
            get(move || {
                let document = document.clone();
                async move { document }
            }),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
