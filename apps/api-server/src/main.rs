//! api-server — HTTP API for the product catalog.
//!
//! Exposes the five product operations over JSON and supports local dev with:
//! - Storage: SQLite file (default, `sqlite` feature) or in-memory.
//! - CORS: Configurable via CORS_ALLOW_ORIGIN (origin string) for a frontend.
//! - Logs: pretty or JSON, filtered by RUST_LOG, with a request id per call.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # volatile storage, JSON logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use domain::adapters::memory_repo::InMemoryProductRepo;
use domain::service::ProductService;
use domain::{CoreError, Product, ProductDto, ProductId, ProductRepository};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Storage selected at startup; sqlite is feature-gated.
enum AnyRepo {
    Memory(InMemoryProductRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteProductRepo),
}

impl ProductRepository for AnyRepo {
    fn find_all(&self) -> Result<Vec<Product>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.find_all(),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.find_all(),
        }
    }

    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.find_by_id(id),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.find_by_id(id),
        }
    }

    fn save(&self, product: Product) -> Result<Product, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.save(product),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.save(product),
        }
    }

    fn delete_by_id(&self, id: ProductId) -> Result<(), CoreError> {
        match self {
            AnyRepo::Memory(r) => r.delete_by_id(id),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.delete_by_id(id),
        }
    }
}

#[derive(Clone)]
struct AppState {
    products: Arc<ProductService<AnyRepo>>,
}

impl AppState {
    fn new(repo: AnyRepo) -> Self {
        Self {
            products: Arc::new(ProductService::new(repo)),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_volatile();

    let repo = match build_repo(&cfg) {
        Ok(r) => r,
        Err(e) => {
            error!(err = %e, "failed to open product store");
            std::process::exit(1);
        }
    };

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = router(AppState::new(repo))
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    info!(%addr, "api-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a repository instance based on config and feature flags.
fn build_repo(cfg: &config::Config) -> Result<AnyRepo, CoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => {
            info!(path = %cfg.db_path.display(), "using sqlite storage");
            Ok(AnyRepo::Sqlite(sqlite_adapter::SqliteProductRepo::new(
                &cfg.db_path,
            )?))
        }
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => {
            warn!("built without the `sqlite` feature; falling back to memory storage");
            Ok(AnyRepo::Memory(InMemoryProductRepo::new()))
        }
        config::StorageProvider::Memory => Ok(AnyRepo::Memory(InMemoryProductRepo::new())),
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .with_state(state)
}

/// Map a service error to a JSON error response. Store failure details are
/// logged but not returned to the caller.
fn error_response(err: CoreError) -> Response {
    match err {
        CoreError::NotFound(msg) => {
            warn!(%msg, "product not found");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message("not_found", &msg)),
            )
                .into_response()
        }
        CoreError::Repository(detail) => {
            error!(err = %detail, "repository error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(http_common::json_err("internal")),
            )
                .into_response()
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn list_products(State(state): State<AppState>) -> Response {
    match state.products.list_all() {
        Ok(items) => {
            info!(count = items.len(), "list ok");
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn get_product(State(state): State<AppState>, Path(id): Path<ProductId>) -> Response {
    match state.products.get_by_id(id) {
        Ok(dto) => (StatusCode::OK, Json(dto)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn create_product(State(state): State<AppState>, Json(body): Json<ProductDto>) -> Response {
    match state.products.create(body) {
        Ok(dto) => {
            info!(id = ?dto.id, "create ok");
            (StatusCode::CREATED, Json(dto)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductDto>,
) -> Response {
    match state.products.update(id, body) {
        Ok(dto) => {
            info!(id, "update ok");
            (StatusCode::OK, Json(dto)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn delete_product(State(state): State<AppState>, Path(id): Path<ProductId>) -> Response {
    match state.products.delete(id) {
        Ok(()) => {
            info!(id, "delete ok");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn app() -> Router {
        router(AppState::new(AnyRepo::Memory(InMemoryProductRepo::new())))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_get_list_flow() {
        let router = app();

        // Incoming id is ignored on create
        let resp = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/products",
                serde_json::json!({"id": 77, "name": "A", "quantity": 2, "price": 9.5}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["id"], 1);
        assert_eq!(created["name"], "A");
        assert_eq!(created["notes"], Value::Null);

        let resp = router
            .clone()
            .oneshot(empty_request("GET", "/api/products/1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["quantity"], 2);

        let resp = router
            .clone()
            .oneshot(empty_request("GET", "/api/products"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let list = body_json(resp).await;
        assert_eq!(list.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn get_missing_returns_404_with_message() {
        let resp = app()
            .oneshot(empty_request("GET", "/api/products/99"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], "not_found");
        assert!(body["error"]["message"].as_str().unwrap().contains("99"));
    }

    #[tokio::test]
    async fn update_forces_path_id_and_upserts() {
        let router = app();
        let resp = router
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/products/5",
                serde_json::json!({"id": 1, "name": "B", "quantity": 1, "price": 3.0, "notes": "new"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = body_json(resp).await;
        assert_eq!(updated["id"], 5);
        assert_eq!(updated["notes"], "new");

        let resp = router
            .clone()
            .oneshot(empty_request("GET", "/api/products/5"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["name"], "B");
    }

    #[tokio::test]
    async fn delete_existing_then_missing() {
        let router = app();
        router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/products",
                serde_json::json!({"name": "C", "quantity": 1, "price": 1.0}),
            ))
            .await
            .unwrap();

        let resp = router
            .clone()
            .oneshot(empty_request("DELETE", "/api/products/1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = router
            .clone()
            .oneshot(empty_request("DELETE", "/api/products/1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = router
            .clone()
            .oneshot(empty_request("GET", "/api/products/1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_numeric_id_is_rejected() {
        let resp = app()
            .oneshot(empty_request("GET", "/api/products/abc"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let resp = app().oneshot(empty_request("GET", "/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }
}
