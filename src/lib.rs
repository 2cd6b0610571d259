pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::CdnConfig;
use crate::services::mime::MimeRegistry;
use crate::services::retrieval::RetrievalResolver;
use crate::services::storage::ObjectStore;
use crate::services::upload::UploadService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_file,
        api::handlers::upload::upload_files,
        api::handlers::files::download_file,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::UploadResult,
            api::handlers::upload::UploadForm,
            api::handlers::upload::BatchUploadForm,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "files", description = "Upload and retrieval endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CdnConfig>,
    pub uploads: Arc<UploadService>,
    pub resolver: Arc<RetrievalResolver>,
}

impl AppState {
    pub fn new(config: CdnConfig, storage: Arc<dyn ObjectStore>, mime: MimeRegistry) -> Self {
        let config = Arc::new(config);
        Self {
            uploads: Arc::new(UploadService::new(storage.clone(), config.clone())),
            resolver: Arc::new(RetrievalResolver::new(storage, mime)),
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let max_upload_size = state.config.max_upload_size;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/upload",
            post(api::handlers::upload::upload_file)
                .options(api::handlers::preflight)
                .layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/uploads",
            post(api::handlers::upload::upload_files)
                .options(api::handlers::preflight)
                .layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/files/",
            get(api::handlers::files::missing_file_id).options(api::handlers::preflight),
        )
        .route(
            "/files/:id",
            get(api::handlers::files::download_file).options(api::handlers::preflight),
        )
        .layer(cors)
        .layer(trace)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
